//! # JUMPBOARD Contract
//!
//! Everything the leaderboard layer knows about the deployed score contract,
//! without touching the network.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   calldata    ┌─────────────────┐
//! │  ILeaderboard   │ ───────────▶  │  ContractClient │  (jumpboard_client)
//! │  (sol! ABI)     │ ◀───────────  │  (external)     │
//! └────────┬────────┘   returns     └────────┬────────┘
//!          │                                 │ receipts
//!          ▼                                 ▼
//! ┌─────────────────┐              ┌─────────────────┐
//! │  Standings      │              │  EventParser    │
//! │  (ranks/pages)  │              │  (score events) │
//! └─────────────────┘              └─────────────────┘
//! ```
//!
//! Validation (`validation`) runs before any calldata is built, and
//! `config` describes one mini-app deployment.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod contracts;
pub mod error;
pub mod events;
pub mod standings;
pub mod validation;

pub use config::{DeploymentConfig, NetworkConfig, RefreshConfig};
pub use contracts::{ContractConfig, ILeaderboard};
pub use error::{LeaderboardError, LeaderboardResult};
pub use events::{EventParser, Log, NewUserAdded, ScoreEvent, ScoreUpdated, TransactionReceipt};
pub use standings::{
    format_user_scores, ContractStats, FormattedUserScore, LeaderboardOptions, LeaderboardPage,
    UserRanking, UserStats,
};
pub use validation::{parse_address, Score, ScoreLimit};
