//! # Validation
//!
//! Client-side checks run before any calldata leaves the process.
//!
//! | Value   | Accepted                              |
//! |---------|---------------------------------------|
//! | score   | integer in `[0, 2^53 - 1]`            |
//! | address | `0x` followed by 40 hex digits        |
//! | limit   | integer in `[1, 1000]`                |

use alloy_primitives::{Address, U256};

use crate::error::{LeaderboardError, LeaderboardResult};

/// Lowest accepted score.
pub const MIN_SCORE: u64 = 0;

/// Highest accepted score (the largest integer a double represents exactly).
pub const MAX_SCORE: u64 = (1 << 53) - 1;

/// Plausibility bound used by validated submissions.
pub const MAX_PLAUSIBLE_SCORE: u64 = 1_000_000;

/// Smallest top-N limit.
pub const MIN_LIMIT: u32 = 1;

/// Largest top-N limit.
pub const MAX_LIMIT: u32 = 1000;

/// A score that passed base validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(u64);

impl Score {
    /// Validates a raw score.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidScore`] above [`MAX_SCORE`].
    pub const fn new(value: u64) -> LeaderboardResult<Self> {
        if value > MAX_SCORE {
            return Err(LeaderboardError::InvalidScore);
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the value as a contract integer.
    #[inline]
    #[must_use]
    pub fn to_u256(self) -> U256 {
        U256::from(self.0)
    }

    /// Applies the plausibility bound on top of base validation.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::ScoreTooHigh`] above [`MAX_PLAUSIBLE_SCORE`].
    pub const fn plausible(self) -> LeaderboardResult<Self> {
        if self.0 > MAX_PLAUSIBLE_SCORE {
            return Err(LeaderboardError::ScoreTooHigh(self.0));
        }
        Ok(self)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for Score {
    type Error = LeaderboardError;

    fn try_from(value: u64) -> LeaderboardResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<u32> for Score {
    type Error = LeaderboardError;

    fn try_from(value: u32) -> LeaderboardResult<Self> {
        Self::new(u64::from(value))
    }
}

impl TryFrom<i64> for Score {
    type Error = LeaderboardError;

    fn try_from(value: i64) -> LeaderboardResult<Self> {
        u64::try_from(value)
            .map_err(|_| LeaderboardError::InvalidScore)
            .and_then(Self::new)
    }
}

impl TryFrom<i32> for Score {
    type Error = LeaderboardError;

    fn try_from(value: i32) -> LeaderboardResult<Self> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<f64> for Score {
    type Error = LeaderboardError;

    // Game engines report scores as doubles.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn try_from(value: f64) -> LeaderboardResult<Self> {
        if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > MAX_SCORE as f64 {
            return Err(LeaderboardError::InvalidScore);
        }
        Self::new(value as u64)
    }
}

/// A top-N limit that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoreLimit(u32);

impl ScoreLimit {
    /// Validates a limit.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidLimit`] outside `[1, 1000]`.
    pub const fn new(value: u32) -> LeaderboardResult<Self> {
        if value < MIN_LIMIT || value > MAX_LIMIT {
            return Err(LeaderboardError::InvalidLimit(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for ScoreLimit {
    fn default() -> Self {
        Self(10)
    }
}

/// Checks a score value as it would arrive from a game engine.
#[must_use]
pub fn is_valid_score(value: f64) -> bool {
    Score::try_from(value).is_ok()
}

/// Checks a top-N limit.
#[must_use]
pub const fn is_valid_limit(value: u32) -> bool {
    value >= MIN_LIMIT && value <= MAX_LIMIT
}

/// Checks the `0x` + 40 hex digits address pattern.
#[must_use]
pub fn is_valid_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Parses an address string after checking its pattern.
///
/// # Errors
///
/// Returns [`LeaderboardError::InvalidAddress`] for anything but `0x` + 40 hex
/// digits. Mixed case is accepted without checksum verification.
pub fn parse_address(value: &str) -> LeaderboardResult<Address> {
    if !is_valid_address(value) {
        return Err(LeaderboardError::InvalidAddress(value.to_string()));
    }
    value
        .parse::<Address>()
        .map_err(|_| LeaderboardError::InvalidAddress(value.to_string()))
}
