//! # Game Boundary
//!
//! The game runs outside this crate. It is driven through [`GameEngine`] and
//! reports its final score to [`GameSession::game_over`].

use tracing::{debug, info};

use jumpboard_contract::{LeaderboardError, LeaderboardResult};

use crate::hooks::{ScoreSubmission, ScoreSubmitter};

/// Controls a running game exposes to the mini-app shell.
pub trait GameEngine: Send {
    /// Starts a fresh run.
    fn start_game(&mut self);

    /// Restarts after game over.
    fn restart_game(&mut self);

    /// Asks the player to confirm leaving.
    fn exit_game(&mut self);

    /// Leaves the game after confirmation.
    fn confirm_exit(&mut self);
}

/// A game wired to the leaderboard write path.
pub struct GameSession<E: GameEngine> {
    engine: E,
    submitter: ScoreSubmitter,
}

impl<E: GameEngine> GameSession<E> {
    /// Pairs an engine with a submitter.
    #[must_use]
    pub fn new(engine: E, submitter: ScoreSubmitter) -> Self {
        Self { engine, submitter }
    }

    /// The engine.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The write path.
    #[inline]
    #[must_use]
    pub fn submitter(&self) -> &ScoreSubmitter {
        &self.submitter
    }

    /// Forwards to [`GameEngine::start_game`].
    pub fn start_game(&mut self) {
        debug!("start game");
        self.engine.start_game();
    }

    /// Forwards to [`GameEngine::restart_game`] and clears the last
    /// transaction.
    pub fn restart_game(&mut self) {
        debug!("restart game");
        self.submitter.reset();
        self.engine.restart_game();
    }

    /// Forwards to [`GameEngine::exit_game`].
    pub fn exit_game(&mut self) {
        debug!("exit game");
        self.engine.exit_game();
    }

    /// Forwards to [`GameEngine::confirm_exit`].
    pub fn confirm_exit(&mut self) {
        debug!("confirm exit");
        self.engine.confirm_exit();
    }

    /// Records the final score of a finished run.
    ///
    /// # Errors
    ///
    /// - [`LeaderboardError::WalletNotConnected`] without an account
    /// - [`LeaderboardError::NothingToSubmit`] for a score of zero
    /// - any error of [`ScoreSubmitter::submit_score`]
    pub async fn game_over(&self, final_score: u64) -> LeaderboardResult<ScoreSubmission> {
        self.submitter.check_ready()?;
        if final_score == 0 {
            return Err(LeaderboardError::NothingToSubmit);
        }

        info!(final_score, "game over, submitting");
        self.submitter.submit_score(final_score).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ContractClient, SimulatedClient, SimulatedLeaderboard};
    use alloy_primitives::{Address, U256};
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<&'static str>,
    }

    impl GameEngine for RecordingEngine {
        fn start_game(&mut self) {
            self.calls.push("start");
        }
        fn restart_game(&mut self) {
            self.calls.push("restart");
        }
        fn exit_game(&mut self) {
            self.calls.push("exit");
        }
        fn confirm_exit(&mut self) {
            self.calls.push("confirm");
        }
    }

    fn session(account: Option<Address>) -> (Arc<SimulatedClient>, GameSession<RecordingEngine>) {
        let contract = Address::repeat_byte(0xAA);
        let chain = Arc::new(SimulatedLeaderboard::new(contract));
        let client = Arc::new(SimulatedClient::new(chain, account));
        let submitter = ScoreSubmitter::new(Arc::clone(&client) as Arc<dyn ContractClient>, contract);
        (client, GameSession::new(RecordingEngine::default(), submitter))
    }

    #[test]
    fn test_controls_forwarded() {
        let (_, mut session) = session(None);
        session.start_game();
        session.exit_game();
        session.confirm_exit();
        session.restart_game();
        assert_eq!(session.engine().calls, vec!["start", "exit", "confirm", "restart"]);
    }

    #[tokio::test]
    async fn test_game_over_guards() {
        let (client, session) = session(None);
        assert_eq!(session.game_over(50).await, Err(LeaderboardError::WalletNotConnected));

        client.set_account(Some(Address::repeat_byte(1)));
        let refused = session.game_over(0).await;
        assert_eq!(refused, Err(LeaderboardError::NothingToSubmit));
        assert_eq!(
            LeaderboardError::NothingToSubmit.to_string(),
            "Invalid score! Play the game first."
        );
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_game_over_submits() {
        let player = Address::repeat_byte(1);
        let (client, session) = session(Some(player));

        let submission = session.game_over(1337).await.unwrap();
        assert!(submission.is_new_user());
        assert_eq!(client.chain().score_of(player), Some(U256::from(1337)));
    }
}
