//! Write hooks: plain, retrying, validating and batch score submission.
//!
//! Every path checks the wallet and validates the score before any network
//! call; local failures never reach the client.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use jumpboard_contract::contracts::ILeaderboard;
use jumpboard_contract::{
    EventParser, LeaderboardError, LeaderboardResult, Score, ScoreEvent, TransactionReceipt,
};

use crate::client::ContractClient;
use crate::write::{ContractWrite, WriteSnapshot};

/// Pause between consecutive batch submissions.
pub const BATCH_PACING: Duration = Duration::from_secs(1);

/// A confirmed score submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreSubmission {
    /// Submitted score.
    pub score: Score,
    /// Inclusion receipt.
    pub receipt: TransactionReceipt,
    /// Score events the contract emitted.
    pub events: Vec<ScoreEvent>,
}

impl ScoreSubmission {
    /// Transaction hash.
    #[inline]
    #[must_use]
    pub fn tx_hash(&self) -> B256 {
        self.receipt.tx_hash
    }

    /// Whether this submission created the player's first entry.
    #[must_use]
    pub fn is_new_user(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, ScoreEvent::NewUserAdded(_)))
    }
}

/// Submits `setScore` for the connected account.
pub struct ScoreSubmitter {
    client: Arc<dyn ContractClient>,
    write: ContractWrite,
}

impl ScoreSubmitter {
    /// Creates a submitter for the contract at `contract`.
    #[must_use]
    pub fn new(client: Arc<dyn ContractClient>, contract: Address) -> Self {
        let write = ContractWrite::new(Arc::clone(&client), contract);
        Self { client, write }
    }

    /// Underlying write adapter.
    #[inline]
    #[must_use]
    pub fn write(&self) -> &ContractWrite {
        &self.write
    }

    /// Transaction state of the last submission.
    #[must_use]
    pub fn snapshot(&self) -> WriteSnapshot {
        self.write.snapshot()
    }

    /// Returns the transaction state to `Idle`.
    pub fn reset(&self) {
        self.write.reset();
    }

    /// Connected account.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::WalletNotConnected`] without one.
    pub fn check_ready(&self) -> LeaderboardResult<Address> {
        self.client.account().ok_or(LeaderboardError::WalletNotConnected)
    }

    /// Validates and submits a raw score.
    ///
    /// # Errors
    ///
    /// - [`LeaderboardError::WalletNotConnected`] without an account
    /// - [`LeaderboardError::InvalidScore`] for a negative, fractional or
    ///   oversized score
    /// - any error of [`ContractWrite::submit`]
    pub async fn submit_score<S>(&self, score: S) -> LeaderboardResult<ScoreSubmission>
    where
        S: TryInto<Score, Error = LeaderboardError>,
    {
        self.check_ready()?;
        let score = score.try_into()?;
        self.send(score).await
    }

    /// Submits an already validated score.
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_score`] minus validation.
    pub async fn submit(&self, score: Score) -> LeaderboardResult<ScoreSubmission> {
        self.check_ready()?;
        self.send(score).await
    }

    /// `setScore` through the write adapter; preconditions already checked.
    pub(crate) async fn send(&self, score: Score) -> LeaderboardResult<ScoreSubmission> {
        debug!(%score, "submitting score");
        let receipt = self
            .write
            .submit(&ILeaderboard::setScoreCall {
                score: score.to_u256(),
            })
            .await?;

        let events = EventParser::parse_receipt(&receipt, self.write.contract());
        info!(%score, tx_hash = %receipt.tx_hash, events = events.len(), "score submitted");
        Ok(ScoreSubmission {
            score,
            receipt,
            events,
        })
    }
}

/// Retry schedule: `max_retries` total attempts, linear backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `retry_delay * n` after failing.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Wait after failed attempt `attempt` (1-based).
    #[inline]
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

/// Returns a status cell to idle however the owning future ends.
struct ResetOnDrop<'a, A: StatusCell>(&'a A);

trait StatusCell {
    fn clear(&self);
}

impl StatusCell for AtomicU32 {
    fn clear(&self) {
        self.store(0, Ordering::SeqCst);
    }
}

impl StatusCell for AtomicBool {
    fn clear(&self) {
        self.store(false, Ordering::SeqCst);
    }
}

impl<A: StatusCell> Drop for ResetOnDrop<'_, A> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Resubmits on failure with linear backoff.
pub struct RetryingSubmitter {
    submitter: ScoreSubmitter,
    policy: RetryPolicy,
    retry_count: AtomicU32,
}

impl RetryingSubmitter {
    /// Wraps `submitter` with `policy`.
    #[must_use]
    pub fn new(submitter: ScoreSubmitter, policy: RetryPolicy) -> Self {
        Self {
            submitter,
            policy,
            retry_count: AtomicU32::new(0),
        }
    }

    /// Current attempt while running; 0 when idle.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    /// Active policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Wrapped submitter.
    #[inline]
    #[must_use]
    pub const fn submitter(&self) -> &ScoreSubmitter {
        &self.submitter
    }

    /// Validates once, then submits until success or `max_retries` attempts.
    ///
    /// # Errors
    ///
    /// Local errors immediately; otherwise the error of the last attempt.
    pub async fn submit<S>(&self, score: S) -> LeaderboardResult<ScoreSubmission>
    where
        S: TryInto<Score, Error = LeaderboardError>,
    {
        self.submitter.check_ready()?;
        let score = score.try_into()?;
        let attempts = self.policy.max_retries.max(1);
        let _idle = ResetOnDrop(&self.retry_count);

        let mut attempt = 1;
        loop {
            self.retry_count.store(attempt, Ordering::SeqCst);
            match self.submitter.send(score).await {
                Ok(submission) => return Ok(submission),
                Err(error) if attempt >= attempts => {
                    warn!(%error, attempts, "score submission failed, giving up");
                    return Err(error);
                }
                Err(error) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(%error, attempt, ?delay, "score submission failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Adds a plausibility bound on top of base validation.
pub struct ValidatingSubmitter {
    submitter: ScoreSubmitter,
    validation_error: Mutex<Option<String>>,
    validating: AtomicBool,
}

impl ValidatingSubmitter {
    /// Wraps `submitter`.
    #[must_use]
    pub fn new(submitter: ScoreSubmitter) -> Self {
        Self {
            submitter,
            validation_error: Mutex::new(None),
            validating: AtomicBool::new(false),
        }
    }

    /// Message of the last rejected score.
    #[must_use]
    pub fn validation_error(&self) -> Option<String> {
        self.validation_error.lock().clone()
    }

    /// A validated submission is running.
    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.validating.load(Ordering::SeqCst)
    }

    /// Wrapped submitter.
    #[inline]
    #[must_use]
    pub const fn submitter(&self) -> &ScoreSubmitter {
        &self.submitter
    }

    /// Clears the validation message and the transaction state.
    pub fn reset(&self) {
        *self.validation_error.lock() = None;
        self.submitter.reset();
    }

    /// Validates (including the plausibility bound) and submits.
    ///
    /// # Errors
    ///
    /// [`LeaderboardError::InvalidScore`] or [`LeaderboardError::ScoreTooHigh`]
    /// (also recorded in [`Self::validation_error`]), otherwise the errors of
    /// [`ScoreSubmitter::submit`].
    pub async fn submit<S>(&self, score: S) -> LeaderboardResult<ScoreSubmission>
    where
        S: TryInto<Score, Error = LeaderboardError>,
    {
        *self.validation_error.lock() = None;

        let score = match score.try_into().and_then(Score::plausible) {
            Ok(score) => score,
            Err(error) => {
                *self.validation_error.lock() = Some(error.to_string());
                return Err(error);
            }
        };

        self.validating.store(true, Ordering::SeqCst);
        let _idle = ResetOnDrop(&self.validating);
        self.submitter.submit(score).await
    }
}

/// Observable state of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSnapshot {
    /// A batch is running.
    pub is_loading: bool,
    /// The last batch completed every submission.
    pub is_success: bool,
    /// Failure of the last batch.
    pub error: Option<LeaderboardError>,
    /// Submissions confirmed in the current or last batch.
    pub completed: usize,
}

/// Sequential, paced, non-atomic multi-score submission.
pub struct BatchSubmitter {
    submitter: ScoreSubmitter,
    state: watch::Sender<BatchSnapshot>,
}

impl BatchSubmitter {
    /// Wraps `submitter`.
    #[must_use]
    pub fn new(submitter: ScoreSubmitter) -> Self {
        let (state, _) = watch::channel(BatchSnapshot::default());
        Self { submitter, state }
    }

    /// Current batch state.
    #[must_use]
    pub fn snapshot(&self) -> BatchSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every batch state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BatchSnapshot> {
        self.state.subscribe()
    }

    /// Clears batch and transaction state.
    pub fn reset(&self) {
        self.state.send_replace(BatchSnapshot::default());
        self.submitter.reset();
    }

    /// Submits every score in order, [`BATCH_PACING`] apart.
    ///
    /// Earlier submissions stay applied when a later one fails.
    ///
    /// # Errors
    ///
    /// [`LeaderboardError::BatchAborted`] wrapping the first failure.
    pub async fn submit_all<I, S>(&self, scores: I) -> LeaderboardResult<Vec<ScoreSubmission>>
    where
        I: IntoIterator<Item = S>,
        S: TryInto<Score, Error = LeaderboardError>,
    {
        self.state.send_replace(BatchSnapshot {
            is_loading: true,
            ..BatchSnapshot::default()
        });

        let mut submissions = Vec::new();
        for (index, score) in scores.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(BATCH_PACING).await;
            }

            match self.submitter.submit_score(score).await {
                Ok(submission) => {
                    submissions.push(submission);
                    self.state.send_modify(|s| s.completed = submissions.len());
                }
                Err(source) => {
                    let error = LeaderboardError::BatchAborted {
                        index,
                        completed: submissions.len(),
                        source: Box::new(source),
                    };
                    warn!(%error, "batch aborted");
                    self.state.send_modify(|s| {
                        s.is_loading = false;
                        s.error = Some(error.clone());
                    });
                    return Err(error);
                }
            }
        }

        info!(count = submissions.len(), "batch submitted");
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.is_success = true;
        });
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SimulatedClient, SimulatedLeaderboard};
    use alloy_primitives::U256;
    use tokio::time::Instant;

    fn contract() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn player() -> Address {
        Address::repeat_byte(1)
    }

    fn setup(account: Option<Address>) -> (Arc<SimulatedClient>, ScoreSubmitter) {
        let chain = Arc::new(SimulatedLeaderboard::new(contract()));
        let client = Arc::new(SimulatedClient::new(chain, account));
        let submitter = ScoreSubmitter::new(Arc::clone(&client) as Arc<dyn ContractClient>, contract());
        (client, submitter)
    }

    #[tokio::test]
    async fn test_submit_score_parses_events() {
        let (client, submitter) = setup(Some(player()));

        let first = submitter.submit_score(120u64).await.unwrap();
        assert!(first.is_new_user());
        assert_eq!(first.events[0].score(), U256::from(120));

        let second = submitter.submit_score(150u64).await.unwrap();
        assert!(!second.is_new_user());
        assert_eq!(client.chain().score_of(player()), Some(U256::from(150)));
        assert!(submitter.snapshot().is_success());
    }

    #[tokio::test]
    async fn test_local_failures_never_write() {
        let (client, submitter) = setup(None);
        assert_eq!(
            submitter.submit_score(10u64).await,
            Err(LeaderboardError::WalletNotConnected)
        );

        client.set_account(Some(player()));
        assert_eq!(submitter.submit_score(-5i64).await, Err(LeaderboardError::InvalidScore));
        assert_eq!(submitter.submit_score(12.5f64).await, Err(LeaderboardError::InvalidScore));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_timing() {
        let (client, submitter) = setup(Some(player()));
        client.fail_all_writes();
        let retrying = RetryingSubmitter::new(submitter, RetryPolicy::default());

        let result = retrying.submit(99u64).await;
        assert!(matches!(result, Err(LeaderboardError::TransactionFailed(_))));
        assert_eq!(client.write_count(), 3);
        assert_eq!(retrying.retry_count(), 0);

        let times = client.write_times();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![Duration::from_millis(1000), Duration::from_millis(2000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_second_attempt() {
        let (client, submitter) = setup(Some(player()));
        client.fail_next_writes(1);
        let retrying = RetryingSubmitter::new(submitter, RetryPolicy::default());

        let submission = retrying.submit(42u64).await.unwrap();
        assert_eq!(submission.score.get(), 42);
        assert_eq!(client.write_count(), 2);
        assert_eq!(retrying.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_reports_attempt_while_running() {
        let (client, submitter) = setup(Some(player()));
        client.fail_next_writes(2);
        let retrying = Arc::new(RetryingSubmitter::new(
            submitter,
            RetryPolicy::new(3, Duration::from_millis(100)),
        ));

        let task = {
            let retrying = Arc::clone(&retrying);
            tokio::spawn(async move { retrying.submit(5u64).await })
        };

        // Attempt 1 fails at t=0, attempt 2 at t=100ms, attempt 3 at t=300ms.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(retrying.retry_count(), 2);

        task.await.unwrap().unwrap();
        assert_eq!(retrying.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_retry_clears_attempt() {
        let (client, submitter) = setup(Some(player()));
        client.fail_all_writes();
        let retrying = RetryingSubmitter::new(submitter, RetryPolicy::default());

        let mut submit = Box::pin(retrying.submit(10u64));
        let timed_out = tokio::time::timeout(Duration::from_millis(500), &mut submit).await;
        assert!(timed_out.is_err());
        assert_eq!(retrying.retry_count(), 1);

        drop(submit);
        assert_eq!(retrying.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_validated_submit_clears_flag() {
        let chain = Arc::new(SimulatedLeaderboard::new(contract()));
        let client = SimulatedClient::new(chain, Some(player()))
            .with_submit_latency(Duration::from_secs(2));
        let validating = ValidatingSubmitter::new(ScoreSubmitter::new(Arc::new(client), contract()));

        let mut submit = Box::pin(validating.submit(10u64));
        let timed_out = tokio::time::timeout(Duration::from_millis(500), &mut submit).await;
        assert!(timed_out.is_err());
        assert!(validating.is_validating());

        drop(submit);
        assert!(!validating.is_validating());
    }

    #[tokio::test]
    async fn test_validation_is_never_retried() {
        let (client, submitter) = setup(Some(player()));
        let retrying = RetryingSubmitter::new(submitter, RetryPolicy::default());

        assert_eq!(retrying.submit(-1i64).await, Err(LeaderboardError::InvalidScore));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_validating_submitter() {
        let (client, submitter) = setup(Some(player()));
        client.fail_next_writes(1);
        let validating = ValidatingSubmitter::new(submitter);

        let result = validating.submit(1_000_001u64).await;
        assert_eq!(result, Err(LeaderboardError::ScoreTooHigh(1_000_001)));
        assert_eq!(
            validating.validation_error().as_deref(),
            Some("Score seems too high, please verify")
        );
        // Validation does not touch the transaction state.
        assert!(validating.submitter().snapshot().error.is_none());
        assert_eq!(client.write_count(), 0);

        // Transaction failures are not validation errors.
        assert!(validating.submit(1_000_000u64).await.is_err());
        assert!(validating.validation_error().is_none());
        assert!(validating.submitter().snapshot().is_error());
        assert!(!validating.is_validating());

        validating.submit(500u64).await.unwrap();
        validating.reset();
        assert_eq!(validating.submitter().snapshot(), WriteSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_paced_one_second_apart() {
        let (client, submitter) = setup(Some(player()));
        let batch = BatchSubmitter::new(submitter);
        let start = Instant::now();

        let submissions = batch.submit_all([10u64, 20, 30]).await.unwrap();
        assert_eq!(submissions.len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        let times = client.write_times();
        assert!(times.windows(2).all(|w| w[1] - w[0] == BATCH_PACING));

        let snapshot = batch.snapshot();
        assert!(snapshot.is_success && !snapshot.is_loading);
        assert_eq!(snapshot.completed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_abort_keeps_earlier_submissions() {
        let (client, submitter) = setup(Some(player()));
        let batch = BatchSubmitter::new(submitter);

        let result = batch.submit_all([10i64, 20, -3, 40]).await;
        let Err(LeaderboardError::BatchAborted { index, completed, source }) = result else {
            panic!("expected batch abort");
        };
        assert_eq!((index, completed), (2, 2));
        assert_eq!(*source, LeaderboardError::InvalidScore);

        assert_eq!(client.write_count(), 2);
        assert_eq!(client.chain().score_of(player()), Some(U256::from(20)));
        assert!(batch.snapshot().error.is_some());

        batch.reset();
        assert_eq!(batch.snapshot(), BatchSnapshot::default());
    }
}
