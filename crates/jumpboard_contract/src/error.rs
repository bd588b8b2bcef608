//! # Leaderboard Error Types
//!
//! All errors that can occur between a game and the leaderboard contract.

use alloy_primitives::{B256, U256};
use thiserror::Error;

/// Errors that can occur in the leaderboard layer.
///
/// Validation and connectivity errors are raised before any network call.
/// Remote errors are scoped to the adapter that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardError {
    /// Score is negative, fractional or beyond the safe-integer range.
    #[error("Score must be a valid positive integer")]
    InvalidScore,

    /// Score passed base validation but exceeds the plausibility bound.
    #[error("Score seems too high, please verify")]
    ScoreTooHigh(u64),

    /// A game ended without producing a score.
    #[error("Invalid score! Play the game first.")]
    NothingToSubmit,

    /// Address does not match `0x` followed by 40 hex digits.
    #[error("Invalid Ethereum address format: {0}")]
    InvalidAddress(String),

    /// Top-N limit outside `[1, 1000]`.
    #[error("Limit must be a positive integer between 1 and 1000 (got {0})")]
    InvalidLimit(u32),

    /// Page numbers start at 1.
    #[error("page must be at least 1 (got {0})")]
    InvalidPage(u32),

    /// No account is connected to sign or scope the call.
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// No contract is deployed at the configured address.
    #[error("Contract not connected")]
    ContractNotConnected,

    /// A contract query failed remotely.
    #[error("Failed to read from contract: {function}: {reason}")]
    ReadFailed {
        /// Function signature that was queried.
        function: String,
        /// Transport or node reason.
        reason: String,
    },

    /// A transaction could not be submitted or confirmed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The transaction was included but reverted.
    #[error("Transaction failed: {0} reverted")]
    Reverted(B256),

    /// Returned bytes did not match the function's ABI.
    #[error("failed to decode {function} result: {reason}")]
    Decode {
        /// Function signature whose return data was malformed.
        function: String,
        /// Decoder message.
        reason: String,
    },

    /// A contract integer does not fit in 64 bits.
    #[error("contract value {0} does not fit in 64 bits")]
    ValueOutOfRange(U256),

    /// A batch stopped part way; earlier submissions stay applied.
    #[error("batch aborted at index {index} after {completed} submissions: {source}")]
    BatchAborted {
        /// Index of the score that failed.
        index: usize,
        /// Number of scores already applied.
        completed: usize,
        /// Failure of the aborted submission.
        source: Box<LeaderboardError>,
    },

    /// Invalid deployment configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LeaderboardError {
    /// Returns `true` for errors raised locally before any network call.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidScore
                | Self::ScoreTooHigh(_)
                | Self::NothingToSubmit
                | Self::InvalidAddress(_)
                | Self::InvalidLimit(_)
                | Self::InvalidPage(_)
                | Self::WalletNotConnected
        )
    }
}

/// Result type for leaderboard operations.
pub type LeaderboardResult<T> = Result<T, LeaderboardError>;
