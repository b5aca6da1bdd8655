//! Process configuration: the peripheral CLI/environment surface for a
//! node process. Loaded from a TOML file with CLI overrides, with a
//! `Default` impl, `toml` (de)serialisation, and `dirs` for a platform
//! data directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Reward-address, storage and networking configuration for a single
/// node process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address credited with the block reward by this node's miner.
    pub reward_address: Option<String>,
    /// Root directory for the chain store and the node's keypair file.
    pub data_dir: PathBuf,
    /// Address this node's transport listens on for inbound peers.
    pub listen_addr: String,
    /// Peer URLs dialled at startup.
    pub seed_peers: Vec<String>,
    /// Local-testing-only override of the PoW difficulty. Production
    /// nodes must leave this unset — the consensus constant
    /// (`consensus::DIFFICULTY`) is the only difficulty a networked node
    /// may use; a node started with an override will not produce blocks
    /// other nodes accept.
    pub difficulty_override: Option<usize>,
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or
    /// `"ledger_node=debug,warn"`.
    pub log_level: String,
    /// Start the mining loop immediately on `run`.
    pub mine_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reward_address: None,
            data_dir: default_data_dir(),
            listen_addr: "0.0.0.0:7878".to_string(),
            seed_peers: Vec::new(),
            difficulty_override: None,
            log_level: "info".to_string(),
            mine_on_start: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("ledger-node")
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, LedgerError> {
        let content = std::fs::read_to_string(path).map_err(|err| LedgerError::Config(err.to_string()))?;
        toml::from_str(&content).map_err(|err| LedgerError::Config(err.to_string()))
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| LedgerError::Config(err.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|err| LedgerError::Config(err.to_string()))?;
        std::fs::write(path, content).map_err(|err| LedgerError::Config(err.to_string()))
    }

    pub fn chain_store_path(&self) -> PathBuf {
        self.data_dir.join("chain.json")
    }

    pub fn keypair_path(&self) -> PathBuf {
        self.data_dir.join("node.key")
    }
}
