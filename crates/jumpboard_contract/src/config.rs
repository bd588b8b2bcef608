//! # Deployment Configuration
//!
//! Each mini-app (celojump, chainjump, wordgame) is one deployment of the same
//! leaderboard contract on its own network. A deployment is described by a
//! TOML file loaded once at startup:
//!
//! ```toml
//! app = "celojump"
//!
//! [network]
//! preset = "celo-alfajores"
//!
//! [contract]
//! address = "0x52908400098527886E0F7030069857D2E4169EE7"
//!
//! [refresh]
//! auto_refresh = false
//! interval_ms = 30000
//! top_scores_limit = 10
//! ```
//!
//! A custom network replaces `preset` with `name`, `chain_id` and `rpc_url`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contracts::ContractConfig;
use crate::error::{LeaderboardError, LeaderboardResult};
use crate::validation::{parse_address, ScoreLimit};

/// Chain a deployment lives on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Human-readable network name.
    pub name: String,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
}

impl NetworkConfig {
    /// Celo mainnet.
    #[must_use]
    pub fn celo() -> Self {
        Self {
            name: "celo".to_string(),
            chain_id: 42_220,
            rpc_url: "https://forno.celo.org".to_string(),
        }
    }

    /// Celo Alfajores testnet.
    #[must_use]
    pub fn celo_alfajores() -> Self {
        Self {
            name: "celo-alfajores".to_string(),
            chain_id: 44_787,
            rpc_url: "https://alfajores-forno.celo-testnet.org".to_string(),
        }
    }

    /// Base Sepolia testnet.
    #[must_use]
    pub fn base_sepolia() -> Self {
        Self {
            name: "base-sepolia".to_string(),
            chain_id: 84_532,
            rpc_url: "https://sepolia.base.org".to_string(),
        }
    }

    /// Looks up a preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "celo" => Some(Self::celo()),
            "celo-alfajores" | "alfajores" => Some(Self::celo_alfajores()),
            "base-sepolia" => Some(Self::base_sepolia()),
            _ => None,
        }
    }

    /// CAIP-2 chain identifier (`eip155:<chain id>`).
    #[must_use]
    pub fn caip2(&self) -> String {
        format!("eip155:{}", self.chain_id)
    }

    /// Sets a custom RPC endpoint.
    #[must_use]
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }
}

/// Polling behaviour of the aggregation context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Whether the context refreshes on a timer.
    pub auto_refresh: bool,
    /// Timer period in milliseconds.
    pub interval_ms: u64,
    /// Size of the cached top-N list.
    pub top_scores_limit: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            auto_refresh: false,
            interval_ms: 30_000,
            top_scores_limit: ScoreLimit::default().get(),
        }
    }
}

impl RefreshConfig {
    /// Timer period as a duration.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// One mini-app's leaderboard deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentConfig {
    /// Mini-app name.
    pub app: String,
    /// Network the contract is on.
    pub network: NetworkConfig,
    /// Contract location.
    pub contract: ContractConfig,
    /// Context refresh settings.
    pub refresh: RefreshConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeployment {
    app: String,
    network: RawNetwork,
    contract: RawContract,
    #[serde(default)]
    refresh: RefreshConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNetwork {
    preset: Option<String>,
    name: Option<String>,
    chain_id: Option<u64>,
    rpc_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawContract {
    address: String,
}

impl RawNetwork {
    fn resolve(self) -> LeaderboardResult<NetworkConfig> {
        let network = match self.preset {
            Some(preset) => NetworkConfig::preset(&preset)
                .ok_or_else(|| LeaderboardError::InvalidConfig(format!("unknown network preset: {preset}")))?,
            None => NetworkConfig {
                name: self
                    .name
                    .ok_or_else(|| LeaderboardError::InvalidConfig("network.name is required".into()))?,
                chain_id: self
                    .chain_id
                    .ok_or_else(|| LeaderboardError::InvalidConfig("network.chain_id is required".into()))?,
                rpc_url: self.rpc_url.clone().unwrap_or_default(),
            },
        };

        Ok(match self.rpc_url {
            Some(rpc_url) => network.with_rpc_url(rpc_url),
            None => network,
        })
    }
}

impl DeploymentConfig {
    /// Creates a deployment from parts.
    #[must_use]
    pub fn new(app: impl Into<String>, network: NetworkConfig, address: alloy_primitives::Address) -> Self {
        let contract = ContractConfig::new(address, network.chain_id);
        Self {
            app: app.into(),
            network,
            contract,
            refresh: RefreshConfig::default(),
        }
    }

    /// Parses a deployment from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidConfig`] for malformed TOML, unknown
    /// presets, missing fields or an invalid top-N limit, and
    /// [`LeaderboardError::InvalidAddress`] for a malformed contract address.
    pub fn from_toml_str(text: &str) -> LeaderboardResult<Self> {
        let raw: RawDeployment =
            toml::from_str(text).map_err(|e| LeaderboardError::InvalidConfig(e.to_string()))?;

        let network = raw.network.resolve()?;
        let address = parse_address(&raw.contract.address)?;
        ScoreLimit::new(raw.refresh.top_scores_limit)
            .map_err(|e| LeaderboardError::InvalidConfig(format!("refresh.top_scores_limit: {e}")))?;

        Ok(Self {
            app: raw.app,
            contract: ContractConfig::new(address, network.chain_id),
            network,
            refresh: raw.refresh,
        })
    }

    /// Loads a deployment from a TOML file.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_toml_str`], plus [`LeaderboardError::InvalidConfig`]
    /// when the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> LeaderboardResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LeaderboardError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
