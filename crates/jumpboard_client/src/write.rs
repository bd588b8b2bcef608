//! # Contract Write Adapter
//!
//! Two-phase transaction lifecycle:
//!
//! ```text
//! Idle ──submit──▶ Pending ──hash──▶ Confirming ──receipt──▶ Success
//!                     │                   │
//!                     └──────── Error ◀───┘   (rejected, failed, reverted)
//! ```
//!
//! No queuing: a second `submit` while one is running simply restarts the
//! published state.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use jumpboard_contract::{LeaderboardError, LeaderboardResult, TransactionReceipt};

use crate::client::ContractClient;

/// Phase of the current transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Nothing submitted since creation or reset.
    #[default]
    Idle,
    /// Waiting for the wallet and node to accept the transaction.
    Pending,
    /// Broadcast; waiting for inclusion.
    Confirming,
    /// Included and executed.
    Success,
    /// Rejected, failed or reverted.
    Error,
}

/// Observable state of a write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSnapshot {
    /// Current phase.
    pub state: TransactionState,
    /// Hash once broadcast.
    pub tx_hash: Option<B256>,
    /// Receipt once included.
    pub receipt: Option<TransactionReceipt>,
    /// Failure, if any.
    pub error: Option<LeaderboardError>,
}

impl WriteSnapshot {
    /// Waiting for submission.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == TransactionState::Pending
    }

    /// Waiting for confirmation.
    #[inline]
    #[must_use]
    pub fn is_confirming(&self) -> bool {
        self.state == TransactionState::Confirming
    }

    /// Confirmed successfully.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == TransactionState::Success
    }

    /// Ended in failure.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.state == TransactionState::Error
    }

    /// Pending or confirming.
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.is_pending() || self.is_confirming()
    }
}

/// State-changing calls against one contract.
pub struct ContractWrite {
    client: Arc<dyn ContractClient>,
    contract: Address,
    state: watch::Sender<WriteSnapshot>,
}

impl ContractWrite {
    /// Creates an idle adapter.
    #[must_use]
    pub fn new(client: Arc<dyn ContractClient>, contract: Address) -> Self {
        let (state, _) = watch::channel(WriteSnapshot::default());
        Self {
            client,
            contract,
            state,
        }
    }

    /// Deployment address.
    #[inline]
    #[must_use]
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> WriteSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every phase change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WriteSnapshot> {
        self.state.subscribe()
    }

    /// Returns to `Idle`, clearing hash, receipt and error.
    pub fn reset(&self) {
        self.state.send_replace(WriteSnapshot::default());
    }

    /// Submits `call` and waits for its receipt.
    ///
    /// # Errors
    ///
    /// - [`LeaderboardError::TransactionFailed`] if submission or confirmation fails
    /// - [`LeaderboardError::Reverted`] if the receipt reports failure
    /// - [`LeaderboardError::ContractNotConnected`] if nothing is deployed
    pub async fn submit<C: SolCall>(&self, call: &C) -> LeaderboardResult<TransactionReceipt> {
        self.state.send_replace(WriteSnapshot {
            state: TransactionState::Pending,
            ..WriteSnapshot::default()
        });
        debug!(function = C::SIGNATURE, "submitting transaction");

        let calldata = Bytes::from(call.abi_encode());
        let tx_hash = match self.client.write(self.contract, calldata).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(e.into_write_error())),
        };

        self.state.send_modify(|s| {
            s.state = TransactionState::Confirming;
            s.tx_hash = Some(tx_hash);
        });
        debug!(%tx_hash, "awaiting confirmation");

        let receipt = match self.client.await_confirmation(tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.fail(e.into_write_error())),
        };

        if !receipt.success {
            self.state.send_modify(|s| s.receipt = Some(receipt.clone()));
            return Err(self.fail(LeaderboardError::Reverted(tx_hash)));
        }

        info!(%tx_hash, block = receipt.block_number, "transaction confirmed");
        self.state.send_modify(|s| {
            s.state = TransactionState::Success;
            s.receipt = Some(receipt.clone());
        });
        Ok(receipt)
    }

    fn fail(&self, error: LeaderboardError) -> LeaderboardError {
        warn!(%error, "transaction failed");
        self.state.send_modify(|s| {
            s.state = TransactionState::Error;
            s.error = Some(error.clone());
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SimulatedClient, SimulatedLeaderboard};
    use alloy_primitives::U256;
    use jumpboard_contract::contracts::ILeaderboard;
    use std::time::Duration;

    fn setup(client: impl FnOnce(SimulatedClient) -> SimulatedClient) -> (Arc<SimulatedClient>, ContractWrite) {
        let contract = Address::repeat_byte(0xAA);
        let chain = Arc::new(SimulatedLeaderboard::new(contract));
        let client = Arc::new(client(SimulatedClient::new(chain, Some(Address::repeat_byte(1)))));
        let write = ContractWrite::new(Arc::clone(&client) as Arc<dyn ContractClient>, contract);
        (client, write)
    }

    fn set_score(score: u64) -> ILeaderboard::setScoreCall {
        ILeaderboard::setScoreCall {
            score: U256::from(score),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_phases_pending_confirming_success() {
        let (_, write) = setup(|c| {
            c.with_submit_latency(Duration::from_millis(100))
                .with_confirmation_delay(Duration::from_millis(500))
        });
        let write = Arc::new(write);

        let task = {
            let write = Arc::clone(&write);
            tokio::spawn(async move { write.submit(&set_score(42)).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(write.snapshot().state, TransactionState::Pending);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let snapshot = write.snapshot();
        assert_eq!(snapshot.state, TransactionState::Confirming);
        assert!(snapshot.tx_hash.is_some());
        assert!(snapshot.is_busy());

        let receipt = task.await.unwrap().unwrap();
        let snapshot = write.snapshot();
        assert!(snapshot.is_success());
        assert_eq!(snapshot.receipt, Some(receipt));

        write.reset();
        assert_eq!(write.snapshot(), WriteSnapshot::default());
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_error() {
        let (client, write) = setup(|c| c);
        client.revert_next_write();

        let result = write.submit(&set_score(7)).await;
        let snapshot = write.snapshot();
        assert_eq!(result, Err(LeaderboardError::Reverted(snapshot.tx_hash.unwrap())));
        assert!(snapshot.is_error());
        assert!(snapshot.receipt.is_some());
        assert_eq!(client.chain().total_users(), 0);
    }

    #[tokio::test]
    async fn test_submission_failure_is_error() {
        let (client, write) = setup(|c| c);
        client.fail_next_writes(1);

        let result = write.submit(&set_score(7)).await;
        assert!(matches!(result, Err(LeaderboardError::TransactionFailed(_))));
        let snapshot = write.snapshot();
        assert!(snapshot.is_error());
        assert!(snapshot.tx_hash.is_none());

        // A fresh submit starts over from Pending.
        write.submit(&set_score(7)).await.unwrap();
        assert!(write.snapshot().error.is_none());
    }
}
