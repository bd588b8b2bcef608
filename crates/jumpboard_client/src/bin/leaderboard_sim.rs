//! # Leaderboard Simulation
//!
//! Plays a few rounds for a handful of simulated players against an
//! in-process leaderboard contract, then prints the board the way the
//! mini-app would show it.
//!
//! Usage: `leaderboard_sim [--config deployments/celojump.toml] [--players N] [--rounds N] [--seed N]`
//!
//! Log level follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use alloy_primitives::Address;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use jumpboard_client::jumpboard_contract::{DeploymentConfig, NetworkConfig};
use jumpboard_client::{
    ContractClient, GameEngine, GameSession, LeaderboardContext, ScoreSubmitter, SimulatedClient,
    SimulatedLeaderboard,
};

/// Stand-in for the real game: counts runs.
#[derive(Default)]
struct SimEngine {
    runs: u32,
}

impl GameEngine for SimEngine {
    fn start_game(&mut self) {
        self.runs += 1;
    }

    fn restart_game(&mut self) {
        self.runs += 1;
    }

    fn exit_game(&mut self) {}

    fn confirm_exit(&mut self) {}
}

struct Args {
    config: Option<String>,
    players: u64,
    rounds: u32,
    seed: u64,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        players: 8,
        rounds: 3,
        seed: 42,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("missing value for {flag}"))?;
        match flag.as_str() {
            "--config" => args.config = Some(value),
            "--players" => args.players = value.parse().map_err(|e| format!("--players: {e}"))?,
            "--rounds" => args.rounds = value.parse().map_err(|e| format!("--rounds: {e}"))?,
            "--seed" => args.seed = value.parse().map_err(|e| format!("--seed: {e}"))?,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn player_address(index: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x70;
    bytes[12..].copy_from_slice(&index.to_be_bytes());
    Address::from(bytes)
}

fn local_deployment() -> DeploymentConfig {
    let network = NetworkConfig {
        name: "local".to_string(),
        chain_id: 31_337,
        rpc_url: "http://127.0.0.1:8545".to_string(),
    };
    DeploymentConfig::new("local", network, Address::repeat_byte(0x11))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let deployment = match &args.config {
        Some(path) => match DeploymentConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
        None => local_deployment(),
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         JUMPBOARD - LEADERBOARD SIMULATION                       ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ DEPLOYMENT ─────────────────────────────────────────────────────┐");
    println!("│ App:                {}", deployment.app);
    println!("│ Network:            {} ({})", deployment.network.name, deployment.network.caip2());
    println!("│ Contract:           {}", deployment.contract.address);
    println!("│ Players:            {}", args.players);
    println!("│ Rounds:             {}", args.rounds);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let chain = Arc::new(SimulatedLeaderboard::new(deployment.contract.address));
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut submitted = 0u32;
    let mut refused = 0u32;
    let mut runs = 0u32;

    for index in 1..=args.players {
        let client: Arc<dyn ContractClient> = Arc::new(SimulatedClient::new(
            Arc::clone(&chain),
            Some(player_address(index)),
        ));
        let submitter = ScoreSubmitter::new(client, deployment.contract.address);
        let mut session = GameSession::new(SimEngine::default(), submitter);

        for round in 0..args.rounds {
            if round == 0 {
                session.start_game();
            } else {
                session.restart_game();
            }

            // Some runs end before scoring anything.
            let score = if rng.gen_bool(0.1) { 0 } else { rng.gen_range(50..=5_000) };
            match session.game_over(score).await {
                Ok(_) => submitted += 1,
                Err(error) => {
                    refused += 1;
                    warn!(player = index, round, %error, "score not recorded");
                }
            }
        }
        session.exit_game();
        session.confirm_exit();
        runs += session.engine().runs;
    }

    let viewer = player_address(1);
    let client: Arc<dyn ContractClient> =
        Arc::new(SimulatedClient::new(Arc::clone(&chain), Some(viewer)));
    let context = match LeaderboardContext::from_deployment(client, &deployment) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    context.start().await;
    let state = context.state();

    println!("┌─ TOP {:<3} ───────────────────────────────────────────────────────┐", deployment.refresh.top_scores_limit);
    for entry in &state.top_scores {
        let marker = if entry.user == viewer { "◀ you" } else { "" };
        println!(
            "│ #{:<4} {}  {:>6} {}",
            entry.rank.unwrap_or(0),
            entry.user,
            entry.score,
            marker
        );
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let stats = context.stats();
    println!("┌─ STATS ──────────────────────────────────────────────────────────┐");
    println!("│ Runs:               {runs}");
    println!("│ Submissions:        {submitted} ({refused} refused)");
    println!("│ Players:            {}", stats.total_users);
    println!("│ Highest:            {}", stats.highest_score);
    println!("│ Lowest:             {}", stats.lowest_score);
    println!("│ Average:            {}", stats.average_score);
    if let Some(ranking) = context.user_ranking(viewer) {
        println!(
            "│ You:                #{} of {} (percentile {})",
            ranking.rank, ranking.total_players, ranking.percentile
        );
    }
    println!("└──────────────────────────────────────────────────────────────────┘");

    context.dispose();
}
