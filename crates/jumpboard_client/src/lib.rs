//! # JUMPBOARD Client
//!
//! Async adapters between the jump mini-apps and their on-chain leaderboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  game_over   ┌──────────────────┐
//! │ GameEngine   │ ───────────▶ │ GameSession      │
//! └──────────────┘              └────────┬─────────┘
//!                                        │ submit_score
//!                                        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ LeaderboardContext (per session)                         │
//! │   LeaderboardReads ─▶ ContractRead<T>   (watch snapshots) │
//! │   ScoreSubmitter   ─▶ ContractWrite     (tx lifecycle)    │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │ calldata / receipts
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │ dyn ContractClient   │  wallet + RPC (external)
//!                  └──────────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Wallet and score checks happen before any network call
//! 2. The client never re-sorts contract results
//! 3. No process-wide state; everything is passed in

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod client;
pub mod context;
pub mod game;
pub mod hooks;
pub mod read;
pub mod write;

pub use client::{ClientError, ContractClient, SimulatedClient, SimulatedLeaderboard};
pub use context::{ContextOptions, ContractState, LeaderboardContext, LeaderboardData, MyData};
pub use game::{GameEngine, GameSession};
pub use hooks::{
    BatchSnapshot, BatchSubmitter, LeaderboardPageRead, LeaderboardReads, RetryPolicy,
    RetryingSubmitter, ScoreSubmission, ScoreSubmitter, UserStatsRead, ValidatingSubmitter,
};
pub use read::{ContractRead, HookOptions, PollHandle, ReadSnapshot};
pub use write::{ContractWrite, TransactionState, WriteSnapshot};

pub use jumpboard_contract;
