//! Engine configuration.
//!
//! Everything here is static per deployment. Per-call user preferences live in
//! [`rap_common::models::intent::RapSettings`] and are passed to each run instead.
use std::{collections::HashMap, fs::File, io::Read, path::Path, time::Duration};

use alloy_primitives::{address, Address};
use rap_common::models::{action::ActionKind, chains, ChainId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis point denominator for gas padding factors.
pub const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Fallback gas limits used when a live estimate is unavailable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainGasUnits {
    pub approval: u64,
    pub swap: u64,
    pub crosschain_swap: u64,
    pub bridge: u64,
    pub wrap: u64,
    pub unwrap: u64,
    pub revoke: u64,
}

impl Default for ChainGasUnits {
    fn default() -> Self {
        Self {
            approval: 55_000,
            swap: 200_000,
            crosschain_swap: 400_000,
            bridge: 400_000,
            wrap: 30_000,
            unwrap: 36_000,
            revoke: 55_000,
        }
    }
}

impl ChainGasUnits {
    /// Gas limit used when `kind` cannot be estimated. Trades get half again on top.
    pub fn fallback_for(&self, kind: ActionKind) -> u64 {
        let units = self.for_kind(kind);
        if kind.is_trade() {
            units.saturating_mul(3) / 2
        } else {
            units
        }
    }

    fn for_kind(&self, kind: ActionKind) -> u64 {
        match kind {
            ActionKind::Approve | ActionKind::Unlock => self.approval,
            ActionKind::Swap => self.swap,
            ActionKind::CrosschainSwap => self.crosschain_swap,
            ActionKind::Bridge | ActionKind::ClaimBridge => self.bridge,
            ActionKind::Wrap => self.wrap,
            ActionKind::RevokeApproval => self.revoke,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub gas_units: ChainGasUnits,
    /// Padding applied to swap, crosschain swap and bridge estimates (11_000 = 1.1x).
    pub swap_padding_bps: u64,
    pub wrap_padding_bps: u64,
    pub approval_padding_bps: u64,
    /// Bound on nonce and allowance reads.
    pub read_timeout_ms: u64,
    pub estimation_timeout_ms: u64,
    pub broadcast_timeout_ms: u64,
    pub confirmation_timeout_ms: u64,
    /// Wait until the node reports a broadcast transaction before moving to the next action.
    pub wait_for_node_ack: bool,
    pub node_ack_max_tries: u32,
    pub node_ack_interval_ms: u64,
    /// Wrapped form of the chain's native asset (WETH, WMATIC, WBNB...).
    pub wrapped_native: Option<Address>,
    /// Tokens the router can pull with an EIP-2612 permit; selling them needs no approval.
    pub permit_tokens: Vec<Address>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            gas_units: ChainGasUnits::default(),
            swap_padding_bps: 11_000,
            wrap_padding_bps: 10_020,
            approval_padding_bps: 11_000,
            read_timeout_ms: 10_000,
            estimation_timeout_ms: 10_000,
            broadcast_timeout_ms: 30_000,
            confirmation_timeout_ms: 180_000,
            wait_for_node_ack: false,
            node_ack_max_tries: 10,
            node_ack_interval_ms: 1_000,
            wrapped_native: None,
            permit_tokens: Vec::new(),
        }
    }
}

impl ChainConfig {
    /// Defaults for rollups and sidechains: faster blocks, shorter waits, and nodes that lag
    /// behind their own sequencer.
    fn fast_chain(wrapped_native: Address, swap_gas: u64) -> Self {
        Self {
            gas_units: ChainGasUnits { swap: swap_gas, ..ChainGasUnits::default() },
            confirmation_timeout_ms: 60_000,
            wait_for_node_ack: true,
            wrapped_native: Some(wrapped_native),
            ..Self::default()
        }
    }

    pub fn padding_bps(&self, kind: ActionKind) -> u64 {
        match kind {
            ActionKind::Wrap => self.wrap_padding_bps,
            ActionKind::Approve | ActionKind::Unlock | ActionKind::RevokeApproval => {
                self.approval_padding_bps
            }
            ActionKind::Swap |
            ActionKind::CrosschainSwap |
            ActionKind::Bridge |
            ActionKind::ClaimBridge => self.swap_padding_bps,
        }
    }

    pub fn allows_permit(&self, token: Address) -> bool {
        self.permit_tokens.contains(&token)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn estimation_timeout(&self) -> Duration {
        Duration::from_millis(self.estimation_timeout_ms)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn node_ack_interval(&self) -> Duration {
        Duration::from_millis(self.node_ack_interval_ms)
    }

    fn validate(&self, label: &str) -> Result<(), ConfigError> {
        for (name, bps) in [
            ("swap_padding_bps", self.swap_padding_bps),
            ("wrap_padding_bps", self.wrap_padding_bps),
            ("approval_padding_bps", self.approval_padding_bps),
        ] {
            if bps < BPS_DENOMINATOR {
                return Err(ConfigError::Invalid(format!(
                    "{label}: {name} must be at least {BPS_DENOMINATOR}, got {bps}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastRetryConfig {
    /// Total broadcast attempts per action, the first one included.
    pub max_attempts: u32,
}

impl Default for BroadcastRetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub broadcast_retry: BroadcastRetryConfig,
    /// Used for chains without an entry in `chains`.
    pub default_chain: ChainConfig,
    pub chains: HashMap<ChainId, ChainConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut per_chain = HashMap::new();
        per_chain.insert(
            chains::MAINNET,
            ChainConfig {
                wrapped_native: Some(address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
                permit_tokens: vec![
                    // USDC
                    address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                    // UNI
                    address!("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
                ],
                ..ChainConfig::default()
            },
        );
        per_chain.insert(
            chains::OPTIMISM,
            ChainConfig::fast_chain(
                address!("0x4200000000000000000000000000000000000006"),
                200_000,
            ),
        );
        per_chain.insert(
            chains::BSC,
            ChainConfig::fast_chain(
                address!("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
                200_000,
            ),
        );
        per_chain.insert(
            chains::POLYGON,
            ChainConfig::fast_chain(
                address!("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
                450_000,
            ),
        );
        per_chain.insert(
            chains::BASE,
            ChainConfig::fast_chain(
                address!("0x4200000000000000000000000000000000000006"),
                200_000,
            ),
        );
        per_chain.insert(
            chains::ARBITRUM,
            ChainConfig::fast_chain(
                address!("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
                1_200_000,
            ),
        );
        Self {
            broadcast_retry: BroadcastRetryConfig::default(),
            default_chain: ChainConfig::default(),
            chains: per_chain,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("broadcast_retry.max_attempts must be > 0".into()));
        }
        self.default_chain
            .validate("default_chain")?;
        for (chain_id, chain) in &self.chains {
            chain.validate(&format!("chain {chain_id}"))?;
        }
        Ok(())
    }

    pub fn chain(&self, chain_id: ChainId) -> &ChainConfig {
        self.chains
            .get(&chain_id)
            .unwrap_or(&self.default_chain)
    }
}
