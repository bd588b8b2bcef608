//! # Contract Read Adapter
//!
//! Wraps one view call and publishes `{ data, is_loading, error }` snapshots
//! through a watch channel.
//!
//! - disabled adapters never touch the client
//! - a failed fetch keeps the data of the last success
//! - overlapping fetches publish in issue order; a response older than the
//!   last published one is dropped, and `is_loading` stays set until every
//!   fetch has settled
//! - polling reissues the call on a fixed cadence, no backoff

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use jumpboard_contract::{LeaderboardError, LeaderboardResult};

use crate::client::ContractClient;

/// Per-adapter switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookOptions {
    /// When off, no network call is ever issued.
    pub enabled: bool,
    /// Polling period; zero disables polling.
    pub refetch_interval: Duration,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            refetch_interval: Duration::ZERO,
        }
    }
}

impl HookOptions {
    /// Enabled, no polling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the adapter may fetch.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the polling period.
    #[must_use]
    pub const fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    /// Whether `spawn_polling` would start a task.
    #[inline]
    #[must_use]
    pub const fn polls(&self) -> bool {
        self.enabled && !self.refetch_interval.is_zero()
    }
}

/// Observable state of a read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadSnapshot<T> {
    /// Result of the last successful fetch.
    pub data: Option<T>,
    /// A fetch is in flight.
    pub is_loading: bool,
    /// Error of the last fetch, cleared on success.
    pub error: Option<LeaderboardError>,
}

impl<T> Default for ReadSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

impl<T> ReadSnapshot<T> {
    /// Whether the last fetch failed.
    #[inline]
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

type Decoder<T> = Box<dyn Fn(&[u8]) -> LeaderboardResult<T> + Send + Sync>;

struct ReadInner<T> {
    client: Arc<dyn ContractClient>,
    contract: Address,
    function: &'static str,
    calldata: Bytes,
    decode: Decoder<T>,
    options: HookOptions,
    state: watch::Sender<ReadSnapshot<T>>,
    /// Sequence number of the last fetch started.
    issued: AtomicU64,
    /// Sequence number of the last fetch whose outcome was published.
    published: AtomicU64,
    /// Fetches started but not yet settled.
    in_flight: AtomicU64,
}

/// One fetch in flight. Settles on drop, so a cancelled fetch still
/// clears its share of `is_loading`.
struct Fetch<'a, T> {
    inner: &'a ReadInner<T>,
    seq: u64,
    outcome: Option<LeaderboardResult<T>>,
}

impl<'a, T> Fetch<'a, T> {
    fn begin(inner: &'a ReadInner<T>) -> Self {
        let seq = inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        inner.state.send_modify(|s| {
            inner.in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
        });
        Self {
            inner,
            seq,
            outcome: None,
        }
    }
}

impl<T> Drop for Fetch<'_, T> {
    fn drop(&mut self) {
        let inner = self.inner;
        let seq = self.seq;
        let outcome = self.outcome.take();

        inner.state.send_modify(|s| {
            let remaining = inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.is_loading = remaining > 0;

            let Some(outcome) = outcome else { return };
            if inner.published.fetch_max(seq, Ordering::SeqCst) > seq {
                debug!(function = inner.function, seq, "stale read response dropped");
                return;
            }
            match outcome {
                Ok(value) => {
                    s.data = Some(value);
                    s.error = None;
                }
                Err(error) => s.error = Some(error),
            }
        });
    }
}

/// A typed view call bound to one contract.
///
/// Cloning shares the underlying state.
pub struct ContractRead<T> {
    inner: Arc<ReadInner<T>>,
}

impl<T> Clone for ContractRead<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ContractRead<T> {
    /// Creates an adapter for `call`.
    ///
    /// # Arguments
    ///
    /// * `client` - Capability that executes the call
    /// * `contract` - Deployment address
    /// * `call` - Typed call; encoded once here
    /// * `options` - Enable and polling switches
    /// * `map` - Converts the decoded return into the published value
    pub fn new<C, F>(
        client: Arc<dyn ContractClient>,
        contract: Address,
        call: &C,
        options: HookOptions,
        map: F,
    ) -> Self
    where
        C: SolCall + 'static,
        F: Fn(C::Return) -> LeaderboardResult<T> + Send + Sync + 'static,
    {
        let decode: Decoder<T> = Box::new(move |bytes: &[u8]| {
            let decoded = C::abi_decode_returns(bytes, true).map_err(|e| LeaderboardError::Decode {
                function: C::SIGNATURE.to_string(),
                reason: e.to_string(),
            })?;
            map(decoded)
        });
        let (state, _) = watch::channel(ReadSnapshot::default());

        Self {
            inner: Arc::new(ReadInner {
                client,
                contract,
                function: C::SIGNATURE,
                calldata: Bytes::from(call.abi_encode()),
                decode,
                options,
                state,
                issued: AtomicU64::new(0),
                published: AtomicU64::new(0),
                in_flight: AtomicU64::new(0),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> ReadSnapshot<T> {
        self.inner.state.borrow().clone()
    }

    /// Last successful value.
    #[must_use]
    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data.clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReadSnapshot<T>> {
        self.inner.state.subscribe()
    }

    /// Whether the adapter may fetch.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.options.enabled
    }

    /// Function signature this adapter calls.
    #[inline]
    #[must_use]
    pub fn function(&self) -> &'static str {
        self.inner.function
    }

    /// Issues the call once and returns the resulting state.
    ///
    /// Disabled adapters return the current state untouched.
    pub async fn refetch(&self) -> ReadSnapshot<T> {
        let inner = &self.inner;
        if !inner.options.enabled {
            return self.snapshot();
        }

        let mut fetch = Fetch::begin(inner);
        debug!(function = inner.function, seq = fetch.seq, "contract read");

        let result = match inner.client.read(inner.contract, inner.calldata.clone()).await {
            Ok(bytes) => (inner.decode)(&bytes[..]),
            Err(e) => Err(e.into_read_error(inner.function)),
        };
        if let Err(error) = &result {
            warn!(function = inner.function, %error, "contract read failed");
        }

        fetch.outcome = Some(result);
        drop(fetch);
        self.snapshot()
    }

    /// Starts polling at `refetch_interval`.
    ///
    /// Returns `None` when the adapter is disabled or has no interval. The
    /// first poll fires one period from now. Must be called inside a tokio
    /// runtime.
    #[must_use]
    pub fn spawn_polling(&self) -> Option<PollHandle> {
        if !self.inner.options.polls() {
            return None;
        }

        let period = self.inner.options.refetch_interval;
        let weak: Weak<ReadInner<T>> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Adapter dropped: stop quietly.
                let Some(inner) = weak.upgrade() else { break };
                ContractRead { inner }.refetch().await;
            }
        });

        Some(PollHandle::new(task))
    }
}

/// Owns a background polling task; aborts it on drop.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Stops polling now.
    pub fn stop(self) {
        drop(self);
    }

    /// Whether the task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
