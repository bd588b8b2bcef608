//! # Score Hooks
//!
//! Leaderboard-specific adapters built on the generic read and write
//! adapters.
//!
//! ```text
//! LeaderboardReads ──▶ ContractRead<T>      (one per query)
//!                 ├──▶ UserStatsRead        (score + rank + hasScore)
//!                 └──▶ LeaderboardPageRead  (all scores + total users)
//!
//! ScoreSubmitter ──▶ ContractWrite          (setScore)
//!   ├── RetryingSubmitter   linear backoff
//!   ├── ValidatingSubmitter plausibility bound
//!   └── BatchSubmitter      paced, non-atomic
//! ```

mod reads;
mod submit;

pub use reads::{LeaderboardPageRead, LeaderboardReads, UserStatsRead};
pub use submit::{
    BatchSnapshot, BatchSubmitter, RetryPolicy, RetryingSubmitter, ScoreSubmission, ScoreSubmitter,
    ValidatingSubmitter, BATCH_PACING,
};
