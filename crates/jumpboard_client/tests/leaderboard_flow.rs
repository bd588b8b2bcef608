//! # Leaderboard Flow Integration Test
//!
//! Drives a full mini-app session against the simulated contract: config
//! loading, game-over submission, context refresh and derived views.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};

use jumpboard_client::jumpboard_contract::{DeploymentConfig, LeaderboardError, ScoreEvent};
use jumpboard_client::{
    BatchSubmitter, ContractClient, GameEngine, GameSession, LeaderboardContext, LeaderboardReads,
    RetryPolicy, RetryingSubmitter, ScoreSubmitter, SimulatedClient, SimulatedLeaderboard,
    TransactionState,
};

struct NoopEngine;

impl GameEngine for NoopEngine {
    fn start_game(&mut self) {}
    fn restart_game(&mut self) {}
    fn exit_game(&mut self) {}
    fn confirm_exit(&mut self) {}
}

fn deployment(name: &str) -> DeploymentConfig {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "..", "..", "deployments", name]
        .iter()
        .collect();
    DeploymentConfig::from_file(path).unwrap()
}

fn player(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn connect(chain: &Arc<SimulatedLeaderboard>, account: Option<Address>) -> Arc<SimulatedClient> {
    Arc::new(SimulatedClient::new(Arc::clone(chain), account))
}

/// Test: the shipped deployment files all load.
#[test]
fn test_shipped_deployments_load() {
    let celojump = deployment("celojump.toml");
    assert_eq!(celojump.network.chain_id, 44_787);

    let chainjump = deployment("chainjump.toml");
    assert_eq!(chainjump.network.chain_id, 84_532);
    assert!(chainjump.refresh.auto_refresh);

    let wordgame = deployment("wordgame.toml");
    assert_eq!(wordgame.network.chain_id, 42_220);
    assert_eq!(wordgame.refresh.top_scores_limit, 20);
}

/// Test: several players finish games; the viewer's context reflects the board.
#[tokio::test]
async fn test_session_end_to_end() {
    let config = deployment("celojump.toml");
    let contract = config.contract.address;
    let chain = Arc::new(SimulatedLeaderboard::new(contract));

    for (byte, score) in [(1u8, 1200u64), (2, 800), (3, 1500)] {
        let client = connect(&chain, Some(player(byte)));
        let session = GameSession::new(NoopEngine, ScoreSubmitter::new(client, contract));
        let submission = session.game_over(score).await.unwrap();
        assert_eq!(submission.events.len(), 1);
        assert!(matches!(submission.events[0], ScoreEvent::NewUserAdded(_)));
    }

    let viewer = connect(&chain, Some(player(2)));
    let context = LeaderboardContext::from_deployment(viewer.clone(), &config).unwrap();
    context.start().await;
    assert!(!context.is_auto_refreshing());

    let state = context.state();
    let order: Vec<u64> = state.top_scores.iter().map(|s| s.score).collect();
    assert_eq!(order, vec![1500, 1200, 800]);
    assert_eq!(state.my_rank, Some(3));

    // Beat everyone; the context refreshes on success.
    let submission = context.set_score(2000u64).await.unwrap();
    assert!(matches!(
        submission.events[0],
        ScoreEvent::ScoreUpdated(updated) if updated.old_score == U256::from(800)
    ));

    let state = context.state();
    assert_eq!(state.my_score, Some(2000));
    assert_eq!(state.my_rank, Some(1));
    assert_eq!(state.transaction.state, TransactionState::Success);
    assert_eq!(context.stats().highest_score, 2000);
    assert_eq!(context.user_ranking(player(2)).unwrap().percentile, 100);
}

/// Test: reads issued by a disconnected viewer never hit the client for own data.
#[tokio::test]
async fn test_disconnected_viewer() {
    let chain = Arc::new(SimulatedLeaderboard::new(player(0xAA)));
    let viewer = connect(&chain, None);
    let reads = LeaderboardReads::new(viewer.clone() as Arc<dyn ContractClient>, player(0xAA));

    assert!(reads.my_stats().refetch().await.data.is_none());
    assert_eq!(viewer.read_count(), 0);

    let context = LeaderboardContext::new(viewer.clone(), player(0xAA), Default::default()).unwrap();
    assert_eq!(
        context.set_score(10u64).await.unwrap_err(),
        LeaderboardError::WalletNotConnected
    );
    assert_eq!(viewer.write_count(), 0);
}

/// Test: a flaky wallet recovers through retries, then a paced batch applies.
#[tokio::test(start_paused = true)]
async fn test_retry_then_batch() {
    let contract = player(0xAA);
    let chain = Arc::new(SimulatedLeaderboard::new(contract));
    let client = connect(&chain, Some(player(1)));

    client.fail_next_writes(2);
    let retrying = RetryingSubmitter::new(
        ScoreSubmitter::new(client.clone(), contract),
        RetryPolicy::new(3, Duration::from_millis(500)),
    );
    retrying.submit(100u64).await.unwrap();
    assert_eq!(client.write_count(), 3);

    let batch = BatchSubmitter::new(ScoreSubmitter::new(client.clone(), contract));
    let submissions = batch.submit_all([200u64, 300]).await.unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(chain.score_of(player(1)), Some(U256::from(300)));
    assert_eq!(chain.total_users(), 1);
}
