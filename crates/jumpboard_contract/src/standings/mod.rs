//! # Standings
//!
//! Display-ready views derived from contract results.
//! Nothing here is persisted; every view is recomputed from the latest read.
//!
//! Order is always the order the contract returned. Ranks are assigned by
//! position and never re-sorted client side.

use alloy_primitives::{Address, U256};

use crate::contracts::ILeaderboard::UserScore;
use crate::error::{LeaderboardError, LeaderboardResult};
use crate::validation::ScoreLimit;

/// A leaderboard entry with a 64-bit score and optional rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormattedUserScore {
    /// Player address.
    pub user: Address,
    /// Player score.
    pub score: u64,
    /// 1-based position in the returned order.
    pub rank: Option<u32>,
}

/// Formatting switches for list reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaderboardOptions {
    /// Top-N size.
    pub limit: u32,
    /// Attach ranks to entries.
    pub include_rank: bool,
    /// Produce formatted entries; when off, entries carry no rank.
    pub format_scores: bool,
}

impl Default for LeaderboardOptions {
    fn default() -> Self {
        Self {
            limit: ScoreLimit::default().get(),
            include_rank: true,
            format_scores: true,
        }
    }
}

impl LeaderboardOptions {
    /// Whether ranks end up on formatted entries.
    #[inline]
    #[must_use]
    pub const fn ranks(&self) -> bool {
        self.format_scores && self.include_rank
    }
}

/// Converts a contract integer to `u64`.
///
/// # Errors
///
/// Returns [`LeaderboardError::ValueOutOfRange`] above `u64::MAX`.
pub fn to_u64(value: U256) -> LeaderboardResult<u64> {
    u64::try_from(value).map_err(|_| LeaderboardError::ValueOutOfRange(value))
}

/// Formats contract entries, assigning `rank = index + 1` when requested.
///
/// # Errors
///
/// Returns [`LeaderboardError::ValueOutOfRange`] if a score exceeds `u64`.
pub fn format_user_scores(
    scores: &[UserScore],
    include_rank: bool,
) -> LeaderboardResult<Vec<FormattedUserScore>> {
    scores
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            Ok(FormattedUserScore {
                user: entry.user,
                score: to_u64(entry.score)?,
                rank: include_rank.then(|| rank_at(index)),
            })
        })
        .collect()
}

#[inline]
fn rank_at(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Combined score/rank/presence for one player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    /// Recorded score.
    pub score: u64,
    /// 1-based rank, 0 if absent.
    pub rank: u64,
    /// Whether a score exists.
    pub has_score: bool,
}

/// One page of the full board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaderboardPage {
    /// Entries on this page.
    pub scores: Vec<FormattedUserScore>,
    /// 1-based page number.
    pub current_page: u32,
    /// `ceil(total_users / limit)`.
    pub total_pages: u64,
    /// Another page follows.
    pub has_next_page: bool,
    /// A page precedes.
    pub has_previous_page: bool,
}

impl LeaderboardPage {
    /// Slices `all_scores` into the requested page.
    ///
    /// # Arguments
    ///
    /// * `all_scores` - Full board in contract order
    /// * `total_users` - Contract's user count (drives `total_pages`)
    /// * `page` - 1-based page number
    /// * `limit` - Page size, validated like a top-N limit
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidPage`] for page 0 and
    /// [`LeaderboardError::InvalidLimit`] for a bad page size.
    pub fn paginate(
        all_scores: &[FormattedUserScore],
        total_users: u64,
        page: u32,
        limit: u32,
    ) -> LeaderboardResult<Self> {
        if page == 0 {
            return Err(LeaderboardError::InvalidPage(page));
        }
        let limit = ScoreLimit::new(limit)?.get();

        let start = (page as usize - 1).saturating_mul(limit as usize);
        let scores = all_scores
            .iter()
            .skip(start)
            .take(limit as usize)
            .copied()
            .collect();
        let total_pages = total_users.div_ceil(u64::from(limit));

        Ok(Self {
            scores,
            current_page: page,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_previous_page: page > 1,
        })
    }
}

/// Aggregate numbers over the cached board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContractStats {
    /// Contract's user count.
    pub total_users: u64,
    /// Entries in the full board.
    pub total_scores: u64,
    /// Mean score, rounded half up.
    pub average_score: u64,
    /// First entry of the top-N list.
    pub highest_score: u64,
    /// Last entry of the full board.
    pub lowest_score: u64,
}

impl ContractStats {
    /// Computes stats from the cached reads.
    #[must_use]
    pub fn compute(
        total_users: u64,
        top_scores: &[FormattedUserScore],
        all_scores: &[FormattedUserScore],
    ) -> Self {
        let count = all_scores.len() as u128;
        let average_score = if count == 0 {
            0
        } else {
            let sum: u128 = all_scores.iter().map(|s| u128::from(s.score)).sum();
            u64::try_from((sum + count / 2) / count).unwrap_or(u64::MAX)
        };

        Self {
            total_users,
            total_scores: all_scores.len() as u64,
            average_score,
            highest_score: top_scores.first().map_or(0, |s| s.score),
            lowest_score: all_scores.last().map_or(0, |s| s.score),
        }
    }
}

/// Where one player sits on the full board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserRanking {
    /// 1-based rank (0 when the entry carries none).
    pub rank: u32,
    /// Player score.
    pub score: u64,
    /// Entries on the board.
    pub total_players: u64,
    /// `(total - rank + 1) / total * 100`, rounded.
    pub percentile: u64,
    /// Rank 10 or better.
    pub is_top_player: bool,
    /// Exact (unrounded) percentile of 90 or more.
    pub is_top_percent: bool,
}

impl UserRanking {
    /// Finds `user` on the board; `None` if absent.
    #[must_use]
    pub fn compute(user: Address, all_scores: &[FormattedUserScore]) -> Option<Self> {
        let entry = all_scores.iter().find(|s| s.user == user)?;
        let rank = entry.rank.unwrap_or(0);
        let total = all_scores.len() as u64;
        let above = (total + 1).saturating_sub(u64::from(rank));
        let percentile = (above * 100 + total / 2) / total;

        Some(Self {
            rank,
            score: entry.score,
            total_players: total,
            percentile,
            is_top_player: rank <= 10,
            is_top_percent: above * 100 >= 90 * total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8, score: u64) -> UserScore {
        UserScore {
            user: Address::repeat_byte(byte),
            score: U256::from(score),
        }
    }

    fn board(scores: &[u64]) -> Vec<FormattedUserScore> {
        let raw: Vec<UserScore> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| entry(i as u8 + 1, *s))
            .collect();
        format_user_scores(&raw, true).unwrap()
    }

    #[test]
    fn test_rank_follows_contract_order() {
        // Deliberately not descending: ranks must follow position, not value.
        let raw = vec![entry(1, 10), entry(2, 50), entry(3, 30)];
        let formatted = format_user_scores(&raw, true).unwrap();

        let ranks: Vec<_> = formatted.iter().map(|s| s.rank).collect();
        let scores: Vec<_> = formatted.iter().map(|s| s.score).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(scores, vec![10, 50, 30]);
    }

    #[test]
    fn test_format_without_rank() {
        let formatted = format_user_scores(&[entry(1, 10)], false).unwrap();
        assert_eq!(formatted[0].rank, None);
    }

    #[test]
    fn test_format_rejects_huge_scores() {
        let raw = vec![UserScore { user: Address::ZERO, score: U256::MAX }];
        assert_eq!(
            format_user_scores(&raw, true),
            Err(LeaderboardError::ValueOutOfRange(U256::MAX))
        );
    }

    #[test]
    fn test_pagination() {
        let all = board(&[90, 80, 70, 60, 50]);

        let first = LeaderboardPage::paginate(&all, 5, 1, 2).unwrap();
        assert_eq!(first.scores.len(), 2);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next_page);
        assert!(!first.has_previous_page);

        let last = LeaderboardPage::paginate(&all, 5, 3, 2).unwrap();
        assert_eq!(last.scores.len(), 1);
        assert_eq!(last.scores[0].rank, Some(5));
        assert!(!last.has_next_page);
        assert!(last.has_previous_page);

        let beyond = LeaderboardPage::paginate(&all, 5, 9, 2).unwrap();
        assert!(beyond.scores.is_empty());

        assert_eq!(
            LeaderboardPage::paginate(&all, 5, 0, 2),
            Err(LeaderboardError::InvalidPage(0))
        );
        assert_eq!(
            LeaderboardPage::paginate(&all, 5, 1, 0),
            Err(LeaderboardError::InvalidLimit(0))
        );
    }

    #[test]
    fn test_contract_stats() {
        let all = board(&[100, 50, 25]);
        let stats = ContractStats::compute(3, &all[..2], &all);

        assert_eq!(stats.total_scores, 3);
        // (100 + 50 + 25) / 3 = 58.33
        assert_eq!(stats.average_score, 58);
        assert_eq!(stats.highest_score, 100);
        assert_eq!(stats.lowest_score, 25);

        assert_eq!(ContractStats::compute(0, &[], &[]), ContractStats::default());
    }

    #[test]
    fn test_user_ranking() {
        let all = board(&[100, 90, 80, 70]);

        let first = UserRanking::compute(Address::repeat_byte(1), &all).unwrap();
        assert_eq!(first.rank, 1);
        assert_eq!(first.percentile, 100);
        assert!(first.is_top_player);
        assert!(first.is_top_percent);

        let last = UserRanking::compute(Address::repeat_byte(4), &all).unwrap();
        // (4 - 4 + 1) / 4 * 100 = 25
        assert_eq!(last.percentile, 25);
        assert!(!last.is_top_percent);

        assert!(UserRanking::compute(Address::repeat_byte(9), &all).is_none());
    }

    #[test]
    fn test_top_percent_uses_exact_percentile() {
        let scores: Vec<u64> = (0..29).map(|i| 1000 - i * 10).collect();
        let all = board(&scores);

        // (29 - 4 + 1) / 29 * 100 = 89.66, shown as 90
        let fourth = UserRanking::compute(Address::repeat_byte(4), &all).unwrap();
        assert_eq!(fourth.rank, 4);
        assert_eq!(fourth.percentile, 90);
        assert!(!fourth.is_top_percent);

        // 27 / 29 * 100 = 93.1
        let third = UserRanking::compute(Address::repeat_byte(3), &all).unwrap();
        assert!(third.is_top_percent);
    }
}
