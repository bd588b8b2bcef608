//! # Contract Client Capability
//!
//! The external collaborator that actually talks to a chain. Wallet
//! connection, signing and transport all live behind this trait; the
//! adapters only ever hand it ABI-encoded calldata.
//!
//! ```text
//! ┌──────────────┐  calldata  ┌──────────────┐   RPC    ┌──────────────┐
//! │  Adapters    │ ─────────▶ │ ContractClient│ ──────▶ │   Chain      │
//! │ (read/write) │ ◀───────── │ (wallet+rpc)  │ ◀────── │  (contract)  │
//! └──────────────┘   bytes    └──────────────┘ receipts └──────────────┘
//! ```

mod simulated;

pub use simulated::{SimulatedClient, SimulatedLeaderboard};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use thiserror::Error;

use jumpboard_contract::{LeaderboardError, TransactionReceipt};

/// Failures reported by a contract client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The node could not be reached or answered with an RPC error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The wallet refused to sign.
    #[error("user rejected the request")]
    Rejected,

    /// The call reverted during simulation or execution.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// Nothing is deployed at the target address.
    #[error("no contract at {0}")]
    NoContract(Address),

    /// The transaction hash is unknown to the node.
    #[error("unknown transaction {0}")]
    UnknownTransaction(B256),
}

impl ClientError {
    /// Maps a failed view call of `function` into the leaderboard error space.
    #[must_use]
    pub fn into_read_error(self, function: &str) -> LeaderboardError {
        match self {
            Self::NoContract(_) => LeaderboardError::ContractNotConnected,
            other => LeaderboardError::ReadFailed {
                function: function.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Maps a failed submission or confirmation.
    #[must_use]
    pub fn into_write_error(self) -> LeaderboardError {
        match self {
            Self::NoContract(_) => LeaderboardError::ContractNotConnected,
            other => LeaderboardError::TransactionFailed(other.to_string()),
        }
    }
}

/// Read, write and confirmation access to a deployed contract.
///
/// Implementations must be cheap to share (`Arc<dyn ContractClient>`). Calls
/// may resolve after the caller stopped caring; adapters tolerate that.
#[async_trait]
pub trait ContractClient: Send + Sync {
    /// Currently connected account, if any.
    ///
    /// Reads run with this account as `msg.sender`; writes are signed by it.
    fn account(&self) -> Option<Address>;

    /// Executes a view call and returns the raw return data.
    async fn read(&self, contract: Address, calldata: Bytes) -> Result<Bytes, ClientError>;

    /// Signs and broadcasts a transaction, returning its hash.
    async fn write(&self, contract: Address, calldata: Bytes) -> Result<B256, ClientError>;

    /// Waits until the transaction is included.
    async fn await_confirmation(&self, tx_hash: B256) -> Result<TransactionReceipt, ClientError>;
}
