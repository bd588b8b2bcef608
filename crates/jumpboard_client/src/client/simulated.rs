//! # Simulated Leaderboard
//!
//! In-process leaderboard contract plus a wallet-like client for it.
//! Used by tests and the demo binary; no network I/O.
//!
//! Contract behaviour:
//! - `setScore` overwrites the caller's entry (`NewUserAdded` first time,
//!   `ScoreUpdated` afterwards)
//! - lists are descending by score, ties in first-submission order
//! - ranks are 1-based, 0 for unknown players

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolInterface};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use jumpboard_contract::contracts::ILeaderboard::{self, ILeaderboardCalls, UserScore};
use jumpboard_contract::{Log, NewUserAdded, ScoreEvent, ScoreUpdated, TransactionReceipt};

use super::{ClientError, ContractClient};

/// Sentinel for "fail every write".
const ALWAYS: u32 = u32::MAX;

/// Contract storage.
#[derive(Default)]
struct Board {
    /// Score per player.
    scores: HashMap<Address, U256>,
    /// Players in first-submission order (tie-break).
    order: Vec<Address>,
    /// Receipts by transaction hash.
    receipts: HashMap<B256, TransactionReceipt>,
    /// Last mined block.
    block_number: u64,
    /// Transactions executed so far.
    nonce: u64,
}

impl Board {
    fn score(&self, user: Address) -> U256 {
        self.scores.get(&user).copied().unwrap_or(U256::ZERO)
    }

    fn ranked(&self) -> Vec<UserScore> {
        let mut ranked: Vec<UserScore> = self
            .order
            .iter()
            .map(|user| UserScore {
                user: *user,
                score: self.score(*user),
            })
            .collect();
        // Stable: equal scores keep first-submission order.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    fn rank(&self, user: Address) -> U256 {
        self.ranked()
            .iter()
            .position(|entry| entry.user == user)
            .map_or(U256::ZERO, |index| U256::from(index + 1))
    }

    fn mine(&mut self, sender: Address, success: bool, logs: Vec<Log>) -> B256 {
        self.nonce += 1;
        self.block_number += 1;

        let mut preimage = Vec::with_capacity(28);
        preimage.extend_from_slice(sender.as_slice());
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        let tx_hash = keccak256(&preimage);

        self.receipts.insert(
            tx_hash,
            TransactionReceipt {
                tx_hash,
                block_number: self.block_number,
                success,
                logs,
            },
        );
        tx_hash
    }
}

/// An in-memory leaderboard contract deployed at a fixed address.
pub struct SimulatedLeaderboard {
    /// Deployment address.
    address: Address,
    /// Contract storage.
    board: Mutex<Board>,
}

impl SimulatedLeaderboard {
    /// Deploys an empty leaderboard at `address`.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            board: Mutex::new(Board::default()),
        }
    }

    /// Deployment address.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Number of distinct players.
    #[must_use]
    pub fn total_users(&self) -> usize {
        self.board.lock().order.len()
    }

    /// Score of `user`, if recorded.
    #[must_use]
    pub fn score_of(&self, user: Address) -> Option<U256> {
        self.board.lock().scores.get(&user).copied()
    }

    /// Full board in contract order.
    #[must_use]
    pub fn ranked(&self) -> Vec<UserScore> {
        self.board.lock().ranked()
    }

    /// Executes a view call on behalf of `sender`.
    fn execute_view(&self, sender: Option<Address>, calldata: &[u8]) -> Result<Vec<u8>, ClientError> {
        let call = ILeaderboardCalls::abi_decode(calldata, true)
            .map_err(|e| ClientError::Reverted(e.to_string()))?;
        let board = self.board.lock();

        let encoded = match call {
            ILeaderboardCalls::getMyScore(_) => {
                // Without a connected account msg.sender is the zero address.
                let sender = sender.unwrap_or(Address::ZERO);
                ILeaderboard::getMyScoreCall::abi_encode_returns(&(board.score(sender),))
            }
            ILeaderboardCalls::getScore(call) => {
                ILeaderboard::getScoreCall::abi_encode_returns(&(board.score(call.user),))
            }
            ILeaderboardCalls::getTopScores(call) => {
                let limit = u64::try_from(call.limit).unwrap_or(u64::MAX);
                let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                let mut top = board.ranked();
                top.truncate(limit);
                ILeaderboard::getTopScoresCall::abi_encode_returns(&(top,))
            }
            ILeaderboardCalls::getAllScoresDescending(_) => {
                ILeaderboard::getAllScoresDescendingCall::abi_encode_returns(&(board.ranked(),))
            }
            ILeaderboardCalls::getTotalUsers(_) => {
                ILeaderboard::getTotalUsersCall::abi_encode_returns(&(U256::from(board.order.len()),))
            }
            ILeaderboardCalls::getUserRank(call) => {
                ILeaderboard::getUserRankCall::abi_encode_returns(&(board.rank(call.user),))
            }
            ILeaderboardCalls::hasScore(call) => {
                ILeaderboard::hasScoreCall::abi_encode_returns(&(board.scores.contains_key(&call.user),))
            }
            ILeaderboardCalls::setScore(_) => {
                return Err(ClientError::Reverted("setScore is not a view function".into()));
            }
        };
        Ok(encoded)
    }

    /// Executes and mines a transaction from `sender`.
    ///
    /// With `revert` set the transaction is mined as failed and leaves
    /// storage untouched.
    fn execute_transaction(&self, sender: Address, calldata: &[u8], revert: bool) -> Result<B256, ClientError> {
        let call = ILeaderboardCalls::abi_decode(calldata, true)
            .map_err(|e| ClientError::Reverted(e.to_string()))?;
        let ILeaderboardCalls::setScore(call) = call else {
            return Err(ClientError::Reverted("only setScore changes state".into()));
        };

        let mut board = self.board.lock();
        if revert {
            return Ok(board.mine(sender, false, Vec::new()));
        }

        let event = match board.scores.insert(sender, call.score) {
            None => {
                board.order.push(sender);
                ScoreEvent::NewUserAdded(NewUserAdded {
                    user: sender,
                    score: call.score,
                })
            }
            Some(old_score) => ScoreEvent::ScoreUpdated(ScoreUpdated {
                user: sender,
                new_score: call.score,
                old_score,
            }),
        };

        Ok(board.mine(sender, true, vec![event.to_log(self.address)]))
    }

    fn receipt(&self, tx_hash: B256) -> Option<TransactionReceipt> {
        self.board.lock().receipts.get(&tx_hash).cloned()
    }
}

/// A wallet-like client bound to a [`SimulatedLeaderboard`].
///
/// Failure injection and call counters make adapter behaviour observable.
pub struct SimulatedClient {
    /// Chain holding the contract.
    chain: Arc<SimulatedLeaderboard>,
    /// Connected account.
    account: RwLock<Option<Address>>,
    /// Delay before a receipt is returned.
    confirmation_delay: Duration,
    /// Delay between the node answering a read and the caller seeing it.
    read_latency: Mutex<Duration>,
    /// Delay before a write is accepted.
    submit_latency: Duration,
    /// Whether reads fail.
    failing_reads: AtomicBool,
    /// Writes left to fail (`ALWAYS` = every write).
    failing_writes: AtomicU32,
    /// Whether the next write is mined as reverted.
    revert_next: AtomicBool,
    /// Read invocations.
    reads: AtomicU64,
    /// Write invocations, failed ones included.
    writes: AtomicU64,
    /// Runtime instant of every write invocation.
    write_log: Mutex<Vec<Instant>>,
}

impl SimulatedClient {
    /// Creates a client on `chain`, optionally already connected.
    #[must_use]
    pub fn new(chain: Arc<SimulatedLeaderboard>, account: Option<Address>) -> Self {
        Self {
            chain,
            account: RwLock::new(account),
            confirmation_delay: Duration::ZERO,
            read_latency: Mutex::new(Duration::ZERO),
            submit_latency: Duration::ZERO,
            failing_reads: AtomicBool::new(false),
            failing_writes: AtomicU32::new(0),
            revert_next: AtomicBool::new(false),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            write_log: Mutex::new(Vec::new()),
        }
    }

    /// Sets the block confirmation delay.
    #[must_use]
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Sets the read round-trip latency.
    #[must_use]
    pub fn with_read_latency(self, latency: Duration) -> Self {
        self.set_read_latency(latency);
        self
    }

    /// Changes the read latency for reads issued from now on.
    pub fn set_read_latency(&self, latency: Duration) {
        *self.read_latency.lock() = latency;
    }

    /// Sets the time the wallet takes to sign and broadcast.
    #[must_use]
    pub fn with_submit_latency(mut self, latency: Duration) -> Self {
        self.submit_latency = latency;
        self
    }

    /// The chain this client talks to.
    #[must_use]
    pub fn chain(&self) -> &Arc<SimulatedLeaderboard> {
        &self.chain
    }

    /// Connects or disconnects an account.
    pub fn set_account(&self, account: Option<Address>) {
        *self.account.write() = account;
    }

    /// Makes every read fail (or succeed again).
    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    /// Fails the next `count` writes at submission.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Fails every write at submission.
    pub fn fail_all_writes(&self) {
        self.failing_writes.store(ALWAYS, Ordering::SeqCst);
    }

    /// Mines the next write as reverted.
    pub fn revert_next_write(&self) {
        self.revert_next.store(true, Ordering::SeqCst);
    }

    /// Number of read invocations.
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write invocations, failed ones included.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Runtime instants of every write invocation.
    #[must_use]
    pub fn write_times(&self) -> Vec<Instant> {
        self.write_log.lock().clone()
    }

    /// Consumes one injected write failure, if any.
    fn take_write_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                ALWAYS => Some(ALWAYS),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[async_trait]
impl ContractClient for SimulatedClient {
    fn account(&self) -> Option<Address> {
        *self.account.read()
    }

    async fn read(&self, contract: Address, calldata: Bytes) -> Result<Bytes, ClientError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let latency = *self.read_latency.lock();

        // The node answers from the state at request time.
        let answer = if self.failing_reads.load(Ordering::SeqCst) {
            Err(ClientError::Transport("simulated read failure".into()))
        } else if contract != self.chain.address() {
            Err(ClientError::NoContract(contract))
        } else {
            self.chain
                .execute_view(self.account(), &calldata)
                .map(Bytes::from)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        answer
    }

    async fn write(&self, contract: Address, calldata: Bytes) -> Result<B256, ClientError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.write_log.lock().push(Instant::now());
        if !self.submit_latency.is_zero() {
            tokio::time::sleep(self.submit_latency).await;
        }

        let sender = self.account().ok_or(ClientError::Rejected)?;
        if self.take_write_failure() {
            return Err(ClientError::Transport("simulated write failure".into()));
        }
        if contract != self.chain.address() {
            return Err(ClientError::NoContract(contract));
        }

        let revert = self.revert_next.swap(false, Ordering::SeqCst);
        self.chain.execute_transaction(sender, &calldata, revert)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<TransactionReceipt, ClientError> {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        self.chain
            .receipt(tx_hash)
            .ok_or(ClientError::UnknownTransaction(tx_hash))
    }
}
