//! # Leaderboard Context
//!
//! Session-scoped aggregate of every leaderboard read plus the write path.
//! Created explicitly, started with [`LeaderboardContext::start`] and torn
//! down with [`LeaderboardContext::dispose`] (or by dropping it).
//!
//! ```text
//!                 ┌────────────── LeaderboardContext ──────────────┐
//! account ──────▶ │ my score / my rank / hasScore   (account-bound)│
//!                 │ top-N / all scores / total users               │──▶ ContractState
//! set_score ────▶ │ ScoreSubmitter ──success──▶ refresh_all        │
//! timer (opt) ──▶ │ refresh_all every interval                     │
//!                 └────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use parking_lot::{Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use jumpboard_contract::{
    ContractStats, DeploymentConfig, FormattedUserScore, LeaderboardError, LeaderboardPage,
    LeaderboardResult, RefreshConfig, Score, ScoreLimit, UserRanking,
};

use crate::client::ContractClient;
use crate::hooks::{LeaderboardReads, ScoreSubmission, ScoreSubmitter};
use crate::read::{ContractRead, HookOptions, PollHandle};
use crate::write::WriteSnapshot;

/// Context behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextOptions {
    /// Refresh on a timer after `start`.
    pub auto_refresh: bool,
    /// Timer period.
    pub refresh_interval: Duration,
    /// Size of the cached top-N list.
    pub top_scores_limit: u32,
}

impl Default for ContextOptions {
    fn default() -> Self {
        RefreshConfig::default().into()
    }
}

impl From<RefreshConfig> for ContextOptions {
    fn from(config: RefreshConfig) -> Self {
        Self {
            auto_refresh: config.auto_refresh,
            refresh_interval: config.interval(),
            top_scores_limit: config.top_scores_limit,
        }
    }
}

impl ContextOptions {
    /// Enables the refresh timer with `interval`.
    #[must_use]
    pub const fn with_auto_refresh(mut self, interval: Duration) -> Self {
        self.auto_refresh = true;
        self.refresh_interval = interval;
        self
    }

    /// Sets the top-N size.
    #[must_use]
    pub const fn with_top_scores_limit(mut self, limit: u32) -> Self {
        self.top_scores_limit = limit;
        self
    }
}

/// Everything the UI renders, as of the latest reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractState {
    /// Account the own-data reads are bound to.
    pub account: Option<Address>,
    /// Own score.
    pub my_score: Option<u64>,
    /// Own rank, 0 if unranked.
    pub my_rank: Option<u64>,
    /// Own entry exists.
    pub has_score: bool,
    /// Cached top-N.
    pub top_scores: Vec<FormattedUserScore>,
    /// Cached full board.
    pub all_scores: Vec<FormattedUserScore>,
    /// Contract's user count.
    pub total_users: u64,
    /// Any own-data read in flight.
    pub is_loading_my_data: bool,
    /// Any board read in flight.
    pub is_loading_leaderboard: bool,
    /// First read error, own data first.
    pub error: Option<LeaderboardError>,
    /// Milliseconds since the epoch of the last full refresh; never decreases.
    pub last_update: u64,
    /// Write path state.
    pub transaction: WriteSnapshot,
}

/// Own-data selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MyData {
    /// Own score.
    pub score: Option<u64>,
    /// Own rank.
    pub rank: Option<u64>,
    /// Own entry exists.
    pub has_score: bool,
    /// Own reads in flight.
    pub is_loading: bool,
    /// First own-data error.
    pub error: Option<LeaderboardError>,
}

/// Board selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaderboardData {
    /// Cached top-N.
    pub top_scores: Vec<FormattedUserScore>,
    /// Cached full board.
    pub all_scores: Vec<FormattedUserScore>,
    /// Contract's user count.
    pub total_users: u64,
    /// Board reads in flight.
    pub is_loading: bool,
    /// First board error.
    pub error: Option<LeaderboardError>,
}

/// Reads bound to one account. Every read takes the address explicitly so
/// score, rank and presence always describe the same player.
#[derive(Clone)]
struct AccountReads {
    account: Option<Address>,
    score: ContractRead<u64>,
    rank: ContractRead<u64>,
    has_score: ContractRead<bool>,
}

impl AccountReads {
    fn bind(reads: &LeaderboardReads, account: Option<Address>) -> Self {
        let reads = reads
            .clone()
            .with_options(HookOptions::new().with_enabled(account.is_some()));
        Self {
            account,
            score: reads.user_score(account),
            rank: reads.user_rank(account),
            has_score: reads.user_has_score(account),
        }
    }
}

struct ContextInner {
    reads: LeaderboardReads,
    options: ContextOptions,
    mine: RwLock<AccountReads>,
    top_scores: ContractRead<Vec<FormattedUserScore>>,
    all_scores: ContractRead<Vec<FormattedUserScore>>,
    total_users: ContractRead<u64>,
    submitter: ScoreSubmitter,
    last_update: AtomicU64,
}

impl ContextInner {
    /// Clones the bound reads out so no lock is held across an await.
    fn mine(&self) -> AccountReads {
        self.mine.read().clone()
    }

    async fn refresh_my_data(&self) {
        let mine = self.mine();
        if mine.account.is_none() {
            return;
        }
        tokio::join!(mine.score.refetch(), mine.rank.refetch(), mine.has_score.refetch());
    }

    async fn refresh_all(&self) {
        tokio::join!(
            self.refresh_my_data(),
            self.top_scores.refetch(),
            self.all_scores.refetch(),
            self.total_users.refetch(),
        );
        let stamp = self.touch();
        debug!(last_update = stamp, "leaderboard refreshed");
    }

    /// Advances `last_update` to now, never backwards.
    fn touch(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self.last_update.fetch_max(now, Ordering::SeqCst).max(now)
    }
}

/// Per-session leaderboard aggregate.
pub struct LeaderboardContext {
    inner: Arc<ContextInner>,
    timer: Mutex<Option<PollHandle>>,
}

impl LeaderboardContext {
    /// Creates a context; nothing is fetched until [`Self::start`] or a
    /// refresh.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidLimit`] for a top-N size outside
    /// `[1, 1000]`.
    pub fn new(
        client: Arc<dyn ContractClient>,
        contract: Address,
        options: ContextOptions,
    ) -> LeaderboardResult<Self> {
        ScoreLimit::new(options.top_scores_limit)?;

        let reads = LeaderboardReads::new(Arc::clone(&client), contract);
        let mine = AccountReads::bind(&reads, client.account());

        Ok(Self {
            inner: Arc::new(ContextInner {
                top_scores: reads.top_scores(options.top_scores_limit),
                all_scores: reads.all_scores(),
                total_users: reads.total_users(),
                mine: RwLock::new(mine),
                submitter: ScoreSubmitter::new(client, contract),
                last_update: AtomicU64::new(0),
                reads,
                options,
            }),
            timer: Mutex::new(None),
        })
    }

    /// Creates a context for a configured deployment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_deployment(
        client: Arc<dyn ContractClient>,
        deployment: &DeploymentConfig,
    ) -> LeaderboardResult<Self> {
        Self::new(client, deployment.contract.address, deployment.refresh.into())
    }

    /// Active options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> ContextOptions {
        self.inner.options
    }

    /// Account the own-data reads are bound to.
    #[must_use]
    pub fn account(&self) -> Option<Address> {
        self.inner.mine.read().account
    }

    /// Write path.
    #[inline]
    #[must_use]
    pub fn submitter(&self) -> &ScoreSubmitter {
        &self.inner.submitter
    }

    /// Runs the initial refresh and, if enabled, starts the refresh timer.
    pub async fn start(&self) {
        info!(
            contract = %self.inner.reads.contract(),
            auto_refresh = self.inner.options.auto_refresh,
            "leaderboard context starting"
        );
        self.refresh_all().await;
        if self.inner.options.auto_refresh {
            self.start_auto_refresh();
        }
    }

    /// Starts the refresh timer if it is not running. The first timed
    /// refresh fires one interval from now.
    pub fn start_auto_refresh(&self) {
        let mut timer = self.timer.lock();
        if timer.is_some() || self.inner.options.refresh_interval.is_zero() {
            return;
        }

        let period = self.inner.options.refresh_interval;
        let weak: Weak<ContextInner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.refresh_all().await;
            }
        });
        *timer = Some(PollHandle::new(task));
    }

    /// Whether the refresh timer is running.
    #[must_use]
    pub fn is_auto_refreshing(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Stops every timer. In-flight reads finish but are ignored.
    pub fn dispose(&self) {
        if self.timer.lock().take().is_some() {
            info!("leaderboard context disposed");
        }
    }

    /// Refreshes every read concurrently, then stamps `last_update`.
    pub async fn refresh_all(&self) {
        self.inner.refresh_all().await;
    }

    /// Refreshes own score, rank and presence (no-op when disconnected).
    pub async fn refresh_my_data(&self) {
        self.inner.refresh_my_data().await;
    }

    /// Refreshes the top-N list.
    pub async fn refresh_top_scores(&self) {
        self.inner.top_scores.refetch().await;
    }

    /// Refreshes the full board.
    pub async fn refresh_all_scores(&self) {
        self.inner.all_scores.refetch().await;
    }

    /// Refreshes the user count.
    pub async fn refresh_total_users(&self) {
        self.inner.total_users.refetch().await;
    }

    /// Rebinds own-data reads to `account` and re-runs every read.
    ///
    /// Call whenever the wallet's account changes.
    pub async fn set_account(&self, account: Option<Address>) {
        let rebound = AccountReads::bind(&self.inner.reads, account);
        *self.inner.mine.write() = rebound;
        info!(?account, "leaderboard account changed");
        self.refresh_all().await;
    }

    /// Submits a score; on success refreshes everything.
    ///
    /// # Errors
    ///
    /// Any error of [`ScoreSubmitter::submit_score`]; no refresh happens then.
    pub async fn set_score<S>(&self, score: S) -> LeaderboardResult<ScoreSubmission>
    where
        S: TryInto<Score, Error = LeaderboardError>,
    {
        let submission = self.inner.submitter.submit_score(score).await?;
        self.refresh_all().await;
        Ok(submission)
    }

    /// Milliseconds since the epoch of the last full refresh (0 before any).
    #[must_use]
    pub fn last_update(&self) -> u64 {
        self.inner.last_update.load(Ordering::SeqCst)
    }

    /// Full snapshot.
    #[must_use]
    pub fn state(&self) -> ContractState {
        let my = self.my_data();
        let board = self.leaderboard_data();

        ContractState {
            account: self.account(),
            my_score: my.score,
            my_rank: my.rank,
            has_score: my.has_score,
            top_scores: board.top_scores,
            all_scores: board.all_scores,
            total_users: board.total_users,
            is_loading_my_data: my.is_loading,
            is_loading_leaderboard: board.is_loading,
            error: my.error.or(board.error),
            last_update: self.last_update(),
            transaction: self.inner.submitter.snapshot(),
        }
    }

    /// Own data only.
    #[must_use]
    pub fn my_data(&self) -> MyData {
        let mine = self.inner.mine();
        let score = mine.score.snapshot();
        let rank = mine.rank.snapshot();
        let has_score = mine.has_score.snapshot();

        MyData {
            is_loading: score.is_loading || rank.is_loading || has_score.is_loading,
            error: score.error.or(rank.error).or(has_score.error),
            score: score.data,
            rank: rank.data,
            has_score: has_score.data.unwrap_or(false),
        }
    }

    /// Board data only.
    #[must_use]
    pub fn leaderboard_data(&self) -> LeaderboardData {
        let top = self.inner.top_scores.snapshot();
        let all = self.inner.all_scores.snapshot();
        let total = self.inner.total_users.snapshot();

        LeaderboardData {
            is_loading: top.is_loading || all.is_loading || total.is_loading,
            error: top.error.or(all.error).or(total.error),
            top_scores: top.data.unwrap_or_default(),
            all_scores: all.data.unwrap_or_default(),
            total_users: total.data.unwrap_or(0),
        }
    }

    /// Aggregates over the cached board.
    #[must_use]
    pub fn stats(&self) -> ContractStats {
        let board = self.leaderboard_data();
        ContractStats::compute(board.total_users, &board.top_scores, &board.all_scores)
    }

    /// Where `user` sits on the cached board.
    #[must_use]
    pub fn user_ranking(&self, user: Address) -> Option<UserRanking> {
        let all = self.inner.all_scores.data()?;
        UserRanking::compute(user, &all)
    }

    /// One page of the cached board.
    ///
    /// # Errors
    ///
    /// Same as [`LeaderboardPage::paginate`].
    pub fn leaderboard_page(&self, page: u32, limit: u32) -> LeaderboardResult<LeaderboardPage> {
        let board = self.leaderboard_data();
        LeaderboardPage::paginate(&board.all_scores, board.total_users, page, limit)
    }
}

impl Drop for LeaderboardContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
