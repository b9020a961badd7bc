//! # Simulation Configuration
//!
//! Defaults for every knob of a simulated run, overridable from `GL_*`
//! environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GL_NODES` | `nodes` |
//! | `GL_CONNECTIONS` | `connections` |
//! | `GL_ORDERERS` / `GL_ENDORSERS` / `GL_CLIENTS` | role mix |
//! | `GL_MINERS` | `miners` |
//! | `GL_PROTOCOL` | `protocol` (`standard`, `send-headers`) |
//! | `GL_LINKAGE` | `linkage` (`miner-identity`, `shared-parent`) |
//! | `GL_BANDWIDTH_MBPS` | symmetric `internet_speed` |
//! | `GL_LATENCY_MS` | `network.latency` |
//! | `GL_CHUNK_SIZE` | `network.chunk_size` |
//! | `GL_BLOCK_INTERVAL_SECS` | `block_interval` |
//! | `GL_BLOCK_SIZE` | `block_size_bytes` |
//! | `GL_BLOCKS` | `blocks_to_mint` |
//! | `GL_DURATION_SECS` | `duration` |
//! | `GL_INV_TIMEOUT_SECS` | `session.gossip.inv_timeout` |
//! | `GL_SEED` | `seed` |

use std::str::FromStr;
use std::time::Duration;

use gl_02_ledger_store::LinkageRule;
use gl_05_gossip_protocol::{InternetSpeed, SessionConfig};
use shared_types::ProtocolVariant;
use thiserror::Error;
use tracing::info;

use crate::network::NetworkConfig;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key}={value} is not a valid value")]
    InvalidValue { key: &'static str, value: String },

    #[error("A network needs at least 2 nodes, got {0}")]
    TooFewNodes(u32),

    #[error("Role mix leaves no committer among {nodes} nodes")]
    NoCommitters { nodes: u32 },

    #[error("{miners} miners requested but only {committers} committers exist")]
    TooManyMiners { miners: u32, committers: u32 },

    #[error("Connections per node must be between 1 and {max}, got {got}")]
    Connections { got: usize, max: usize },

    #[error("Bandwidth must be positive, got {0} Mbps")]
    Bandwidth(f64),
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Node count; ids run from 1 to `nodes`.
    pub nodes: u32,
    /// Peers each node tries to connect to.
    pub connections: usize,
    pub orderers: u32,
    pub endorsers: u32,
    pub clients: u32,
    /// Committers that mine blocks.
    pub miners: u32,
    pub protocol: ProtocolVariant,
    pub linkage: LinkageRule,
    pub internet_speed: InternetSpeed,
    pub network: NetworkConfig,
    /// Mean time between mined blocks.
    pub block_interval: Duration,
    pub block_size_bytes: u64,
    /// Most pending transactions a miner packs into one block.
    pub transactions_per_block: usize,
    pub blocks_to_mint: u64,
    /// Simulated run length.
    pub duration: Duration,
    pub seed: u64,
    pub session: SessionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: 16,
            connections: 4,
            orderers: 1,
            endorsers: 2,
            clients: 2,
            miners: 2,
            protocol: ProtocolVariant::Standard,
            linkage: LinkageRule::MinerIdentity,
            internet_speed: InternetSpeed::default(),
            network: NetworkConfig::default(),
            block_interval: Duration::from_secs(10),
            block_size_bytes: 100_000,
            transactions_per_block: 50,
            blocks_to_mint: 20,
            duration: Duration::from_secs(600),
            seed: 42,
            session: SessionConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// A small, fast network for tests.
    pub fn for_testing() -> Self {
        Self {
            nodes: 6,
            connections: 2,
            orderers: 0,
            endorsers: 1,
            clients: 1,
            miners: 1,
            network: NetworkConfig {
                latency: Duration::from_millis(10),
                jitter_fraction: 0.0,
                chunk_size: 256,
            },
            block_interval: Duration::from_secs(5),
            block_size_bytes: 10_000,
            blocks_to_mint: 5,
            duration: Duration::from_secs(120),
            session: SessionConfig::for_testing(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `GL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let vars = Vars(&lookup);

        if let Some(nodes) = vars.parse("GL_NODES")? {
            config.nodes = nodes;
        }
        if let Some(connections) = vars.parse("GL_CONNECTIONS")? {
            config.connections = connections;
        }
        if let Some(orderers) = vars.parse("GL_ORDERERS")? {
            config.orderers = orderers;
        }
        if let Some(endorsers) = vars.parse("GL_ENDORSERS")? {
            config.endorsers = endorsers;
        }
        if let Some(clients) = vars.parse("GL_CLIENTS")? {
            config.clients = clients;
        }
        if let Some(miners) = vars.parse("GL_MINERS")? {
            config.miners = miners;
        }
        if let Some(protocol) = vars.parse("GL_PROTOCOL")? {
            config.protocol = protocol;
        }
        if let Some(linkage) = vars.get("GL_LINKAGE") {
            config.linkage = parse_linkage(&linkage).ok_or(ConfigError::InvalidValue {
                key: "GL_LINKAGE",
                value: linkage,
            })?;
        }
        if let Some(mbps) = vars.parse("GL_BANDWIDTH_MBPS")? {
            config.internet_speed = InternetSpeed::symmetric(mbps);
        }
        if let Some(ms) = vars.parse("GL_LATENCY_MS")? {
            config.network.latency = Duration::from_millis(ms);
        }
        if let Some(chunk_size) = vars.parse("GL_CHUNK_SIZE")? {
            config.network.chunk_size = chunk_size;
        }
        if let Some(secs) = vars.get("GL_BLOCK_INTERVAL_SECS") {
            config.block_interval = secs
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .map(Duration::from_secs_f64)
                .ok_or(ConfigError::InvalidValue {
                    key: "GL_BLOCK_INTERVAL_SECS",
                    value: secs,
                })?;
        }
        if let Some(size) = vars.parse("GL_BLOCK_SIZE")? {
            config.block_size_bytes = size;
        }
        if let Some(blocks) = vars.parse("GL_BLOCKS")? {
            config.blocks_to_mint = blocks;
        }
        if let Some(secs) = vars.parse("GL_DURATION_SECS")? {
            config.duration = Duration::from_secs(secs);
        }
        if let Some(secs) = vars.parse("GL_INV_TIMEOUT_SECS")? {
            config.session.gossip.inv_timeout = Duration::from_secs(secs);
        }
        if let Some(seed) = vars.parse("GL_SEED")? {
            config.seed = seed;
            info!(seed, "Using seed from environment");
        }

        config.session.ledger.linkage = config.linkage;
        config.validate()?;
        Ok(config)
    }

    /// Nodes taken by the order, endorser and client roles.
    pub fn non_committers(&self) -> u32 {
        self.orderers
            .saturating_add(self.endorsers)
            .saturating_add(self.clients)
    }

    /// Committers left after the role mix is assigned.
    pub fn committers(&self) -> u32 {
        self.nodes.saturating_sub(self.non_committers())
    }

    /// Check the configuration describes a network that can run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes < 2 {
            return Err(ConfigError::TooFewNodes(self.nodes));
        }
        if self.non_committers() >= self.nodes {
            return Err(ConfigError::NoCommitters { nodes: self.nodes });
        }
        if self.miners == 0 || self.miners > self.committers() {
            return Err(ConfigError::TooManyMiners {
                miners: self.miners,
                committers: self.committers(),
            });
        }
        let max = self.nodes as usize - 1;
        if self.connections == 0 || self.connections > max {
            return Err(ConfigError::Connections {
                got: self.connections,
                max,
            });
        }
        let speed = self.internet_speed;
        if !(speed.download_mbps > 0.0 && speed.upload_mbps > 0.0) {
            return Err(ConfigError::Bandwidth(
                speed.download_mbps.min(speed.upload_mbps),
            ));
        }
        Ok(())
    }
}

fn parse_linkage(value: &str) -> Option<LinkageRule> {
    match value.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
        "mineridentity" | "miner" => Some(LinkageRule::MinerIdentity),
        "sharedparent" | "parent" => Some(LinkageRule::SharedParent),
        _ => None,
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { key, value }),
        }
    }
}
