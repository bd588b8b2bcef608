//! Read hooks: one constructor per contract query, plus two composed reads.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use jumpboard_contract::contracts::ILeaderboard;
use jumpboard_contract::standings::to_u64;
use jumpboard_contract::{
    format_user_scores, FormattedUserScore, LeaderboardError, LeaderboardOptions, LeaderboardPage,
    LeaderboardResult, ScoreLimit, UserStats,
};

use crate::client::ContractClient;
use crate::read::{ContractRead, HookOptions, ReadSnapshot};

/// Factory for leaderboard reads against one deployment.
///
/// Every constructor returns an idle adapter; call `refetch` (or
/// `spawn_polling`) to load it.
#[derive(Clone)]
pub struct LeaderboardReads {
    client: Arc<dyn ContractClient>,
    contract: Address,
    options: HookOptions,
}

impl LeaderboardReads {
    /// Creates a factory with default hook options.
    #[must_use]
    pub fn new(client: Arc<dyn ContractClient>, contract: Address) -> Self {
        Self {
            client,
            contract,
            options: HookOptions::default(),
        }
    }

    /// Uses `options` for every adapter built afterwards.
    #[must_use]
    pub fn with_options(mut self, options: HookOptions) -> Self {
        self.options = options;
        self
    }

    /// Connected account according to the client.
    #[inline]
    #[must_use]
    pub fn account(&self) -> Option<Address> {
        self.client.account()
    }

    /// Deployment address.
    #[inline]
    #[must_use]
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Hook options narrowed by an extra precondition.
    fn gated(&self, precondition: bool) -> HookOptions {
        self.options.with_enabled(self.options.enabled && precondition)
    }

    fn build<C, T, F>(&self, call: &C, options: HookOptions, map: F) -> ContractRead<T>
    where
        C: SolCall + 'static,
        T: Clone + Send + Sync + 'static,
        F: Fn(C::Return) -> LeaderboardResult<T> + Send + Sync + 'static,
    {
        ContractRead::new(Arc::clone(&self.client), self.contract, call, options, map)
    }

    /// `getMyScore()`; disabled without a connected account.
    #[must_use]
    pub fn my_score(&self) -> ContractRead<u64> {
        self.build(
            &ILeaderboard::getMyScoreCall {},
            self.gated(self.account().is_some()),
            |r| to_u64(r.score),
        )
    }

    /// `getScore(user)`; disabled when `user` is `None`.
    #[must_use]
    pub fn user_score(&self, user: Option<Address>) -> ContractRead<u64> {
        self.build(
            &ILeaderboard::getScoreCall {
                user: user.unwrap_or_default(),
            },
            self.gated(user.is_some()),
            |r| to_u64(r.score),
        )
    }

    /// `getUserRank(account)`.
    #[must_use]
    pub fn my_rank(&self) -> ContractRead<u64> {
        self.user_rank(self.account())
    }

    /// `getUserRank(user)`; 0 means unranked.
    #[must_use]
    pub fn user_rank(&self, user: Option<Address>) -> ContractRead<u64> {
        self.build(
            &ILeaderboard::getUserRankCall {
                user: user.unwrap_or_default(),
            },
            self.gated(user.is_some()),
            |r| to_u64(r.rank),
        )
    }

    /// `hasScore(account)`.
    #[must_use]
    pub fn has_score(&self) -> ContractRead<bool> {
        self.user_has_score(self.account())
    }

    /// `hasScore(user)`.
    #[must_use]
    pub fn user_has_score(&self, user: Option<Address>) -> ContractRead<bool> {
        self.build(
            &ILeaderboard::hasScoreCall {
                user: user.unwrap_or_default(),
            },
            self.gated(user.is_some()),
            |r| Ok(r.exists),
        )
    }

    /// Best `limit` entries with ranks.
    #[must_use]
    pub fn top_scores(&self, limit: u32) -> ContractRead<Vec<FormattedUserScore>> {
        self.top_scores_with(limit, LeaderboardOptions::default())
    }

    /// `getTopScores(limit)` formatted per `options`.
    ///
    /// A `limit` outside `[1, 1000]` yields a disabled adapter. The explicit
    /// `limit` takes precedence over `options.limit`.
    #[must_use]
    pub fn top_scores_with(
        &self,
        limit: u32,
        options: LeaderboardOptions,
    ) -> ContractRead<Vec<FormattedUserScore>> {
        let ranks = options.ranks();
        self.build(
            &ILeaderboard::getTopScoresCall {
                limit: U256::from(limit),
            },
            self.gated(ScoreLimit::new(limit).is_ok()),
            move |r| format_user_scores(&r.scores, ranks),
        )
    }

    /// Every entry with ranks.
    #[must_use]
    pub fn all_scores(&self) -> ContractRead<Vec<FormattedUserScore>> {
        self.all_scores_with(LeaderboardOptions::default())
    }

    /// `getAllScoresDescending()` formatted per `options`.
    #[must_use]
    pub fn all_scores_with(&self, options: LeaderboardOptions) -> ContractRead<Vec<FormattedUserScore>> {
        let ranks = options.ranks();
        self.build(
            &ILeaderboard::getAllScoresDescendingCall {},
            self.options,
            move |r| format_user_scores(&r.scores, ranks),
        )
    }

    /// `getTotalUsers()`.
    #[must_use]
    pub fn total_users(&self) -> ContractRead<u64> {
        self.build(&ILeaderboard::getTotalUsersCall {}, self.options, |r| {
            to_u64(r.total)
        })
    }

    /// Score, rank and presence of `user` as one read.
    #[must_use]
    pub fn user_stats(&self, user: Option<Address>) -> UserStatsRead {
        UserStatsRead {
            score: self.user_score(user),
            rank: self.user_rank(user),
            has_score: self.user_has_score(user),
        }
    }

    /// Stats of the connected account.
    #[must_use]
    pub fn my_stats(&self) -> UserStatsRead {
        self.user_stats(self.account())
    }

    /// Page `page` (1-based) of `limit` entries from the full board.
    #[must_use]
    pub fn leaderboard_page(&self, page: u32, limit: u32) -> LeaderboardPageRead {
        LeaderboardPageRead {
            all_scores: self.all_scores(),
            total_users: self.total_users(),
            page,
            limit,
        }
    }
}

/// Merges loading and error flags of component reads.
fn merge<T>(parts: &[(bool, Option<&LeaderboardError>)], data: Option<T>) -> ReadSnapshot<T> {
    ReadSnapshot {
        data,
        is_loading: parts.iter().any(|(loading, _)| *loading),
        error: parts.iter().find_map(|(_, error)| (*error).cloned()),
    }
}

/// Combined score, rank and presence of one player.
#[derive(Clone)]
pub struct UserStatsRead {
    score: ContractRead<u64>,
    rank: ContractRead<u64>,
    has_score: ContractRead<bool>,
}

impl UserStatsRead {
    /// Data once all three reads resolved; loading and error are the OR of
    /// the three.
    #[must_use]
    pub fn snapshot(&self) -> ReadSnapshot<UserStats> {
        let score = self.score.snapshot();
        let rank = self.rank.snapshot();
        let has_score = self.has_score.snapshot();

        let data = match (score.data, rank.data, has_score.data) {
            (Some(score), Some(rank), Some(has_score)) => Some(UserStats {
                score,
                rank,
                has_score,
            }),
            _ => None,
        };

        merge(
            &[
                (score.is_loading, score.error.as_ref()),
                (rank.is_loading, rank.error.as_ref()),
                (has_score.is_loading, has_score.error.as_ref()),
            ],
            data,
        )
    }

    /// Refetches the three reads concurrently.
    pub async fn refetch(&self) -> ReadSnapshot<UserStats> {
        tokio::join!(self.score.refetch(), self.rank.refetch(), self.has_score.refetch());
        self.snapshot()
    }
}

/// One page of the full board, derived from `getAllScoresDescending` and
/// `getTotalUsers`.
#[derive(Clone)]
pub struct LeaderboardPageRead {
    all_scores: ContractRead<Vec<FormattedUserScore>>,
    total_users: ContractRead<u64>,
    page: u32,
    limit: u32,
}

impl LeaderboardPageRead {
    /// Requested page number.
    #[inline]
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Current page; an invalid page or limit surfaces as the error.
    #[must_use]
    pub fn snapshot(&self) -> ReadSnapshot<LeaderboardPage> {
        let all = self.all_scores.snapshot();
        let total = self.total_users.snapshot();

        let mut snapshot = merge(
            &[
                (all.is_loading, all.error.as_ref()),
                (total.is_loading, total.error.as_ref()),
            ],
            None,
        );

        if let (Some(all_scores), Some(total_users)) = (all.data, total.data) {
            match LeaderboardPage::paginate(&all_scores, total_users, self.page, self.limit) {
                Ok(page) => snapshot.data = Some(page),
                Err(error) => snapshot.error = Some(error),
            }
        }
        snapshot
    }

    /// Refetches both underlying reads concurrently.
    pub async fn refetch(&self) -> ReadSnapshot<LeaderboardPage> {
        tokio::join!(self.all_scores.refetch(), self.total_users.refetch());
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SimulatedClient, SimulatedLeaderboard};
    use crate::hooks::ScoreSubmitter;

    fn contract() -> Address {
        Address::repeat_byte(0xAA)
    }

    async fn seeded(scores: &[(u8, u64)]) -> (Arc<SimulatedLeaderboard>, Arc<SimulatedClient>) {
        let chain = Arc::new(SimulatedLeaderboard::new(contract()));
        for (byte, score) in scores {
            let player = Arc::new(SimulatedClient::new(
                Arc::clone(&chain),
                Some(Address::repeat_byte(*byte)),
            ));
            ScoreSubmitter::new(player, contract())
                .submit_score(*score)
                .await
                .unwrap();
        }
        let viewer = Arc::new(SimulatedClient::new(Arc::clone(&chain), None));
        (chain, viewer)
    }

    fn reads(client: &Arc<SimulatedClient>) -> LeaderboardReads {
        LeaderboardReads::new(Arc::clone(client) as Arc<dyn ContractClient>, contract())
    }

    #[tokio::test]
    async fn test_account_bound_reads_follow_connection() {
        let (_, viewer) = seeded(&[(1, 300)]).await;

        let my_score = reads(&viewer).my_score();
        assert!(!my_score.is_enabled());
        my_score.refetch().await;
        assert_eq!(viewer.read_count(), 0);

        viewer.set_account(Some(Address::repeat_byte(1)));
        let reads = reads(&viewer);
        assert_eq!(reads.my_score().refetch().await.data, Some(300));
        assert_eq!(reads.my_rank().refetch().await.data, Some(1));
        assert_eq!(reads.has_score().refetch().await.data, Some(true));
    }

    #[tokio::test]
    async fn test_user_reads() {
        let (_, viewer) = seeded(&[(1, 100), (2, 200)]).await;
        let reads = reads(&viewer);

        let second = Some(Address::repeat_byte(1));
        assert_eq!(reads.user_score(second).refetch().await.data, Some(100));
        assert_eq!(reads.user_rank(second).refetch().await.data, Some(2));

        let stranger = Some(Address::repeat_byte(9));
        assert_eq!(reads.user_has_score(stranger).refetch().await.data, Some(false));
        assert_eq!(reads.user_rank(stranger).refetch().await.data, Some(0));

        assert!(!reads.user_score(None).is_enabled());
    }

    #[tokio::test]
    async fn test_top_scores_limit_gates_network() {
        let (_, viewer) = seeded(&[(1, 10), (2, 30), (3, 20)]).await;
        let reads = reads(&viewer);

        for limit in [0, 1001] {
            let top = reads.top_scores(limit);
            assert!(!top.is_enabled());
            top.refetch().await;
        }
        assert_eq!(viewer.read_count(), 0);

        let top = reads.top_scores(2).refetch().await.data.unwrap();
        let scores: Vec<_> = top.iter().map(|s| (s.score, s.rank)).collect();
        assert_eq!(scores, vec![(30, Some(1)), (20, Some(2))]);

        let plain = reads
            .top_scores_with(2, LeaderboardOptions { format_scores: false, ..LeaderboardOptions::default() })
            .refetch()
            .await
            .data
            .unwrap();
        assert!(plain.iter().all(|s| s.rank.is_none()));
    }

    #[tokio::test]
    async fn test_user_stats_combines_three_reads() {
        let (_, viewer) = seeded(&[(1, 10), (2, 30)]).await;
        let stats = reads(&viewer).user_stats(Some(Address::repeat_byte(1)));

        assert_eq!(stats.snapshot().data, None);
        let snapshot = stats.refetch().await;
        assert_eq!(
            snapshot.data,
            Some(UserStats {
                score: 10,
                rank: 2,
                has_score: true
            })
        );

        viewer.fail_reads(true);
        let snapshot = stats.refetch().await;
        assert!(snapshot.is_error());
        // Last good values are kept.
        assert!(snapshot.data.is_some());
    }

    #[tokio::test]
    async fn test_leaderboard_page() {
        let (_, viewer) = seeded(&[(1, 50), (2, 40), (3, 30), (4, 20), (5, 10)]).await;
        let reads = reads(&viewer);

        let page = reads.leaderboard_page(2, 2).refetch().await.data.unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.scores[0].rank, Some(3));
        assert!(page.has_next_page && page.has_previous_page);

        let bad = reads.leaderboard_page(0, 2).refetch().await;
        assert_eq!(bad.error, Some(LeaderboardError::InvalidPage(0)));
    }
}
