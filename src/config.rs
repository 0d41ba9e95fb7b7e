//! Configuration for both node roles.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Defaults match the standard deployment: name node on 5000,
//! storage nodes on 7000 (clients) and 6000 (control).

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name_node: NameNodeConfig,
    pub storage_node: StorageNodeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NameNodeConfig {
    /// Address the name node listens on.
    pub bind: String,
    /// Path of the persisted file registry (one line per record).
    pub registry_path: PathBuf,
    /// Capacity of the filename -> record LRU cache.
    pub cache_capacity: usize,
    /// Heartbeats older than this mark a storage node disconnected.
    pub heartbeat_timeout_secs: u64,
    /// Interval of the background failure / lease scan.
    pub scan_interval_secs: u64,
    /// Sentence-lock lease duration; renewed on re-acquire.
    pub lock_lease_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageNodeConfig {
    /// Identifier this node registers under.
    pub node_id: String,
    /// Address advertised to clients via the name node.
    pub advertise_ip: String,
    pub client_port: u16,
    pub control_port: u16,
    /// Root of the files/metadata/undo/checkpoints directories.
    pub data_dir: PathBuf,
    pub name_node_addr: String,
    pub heartbeat_interval_secs: u64,
    /// When set, write commits are validated against the name node's
    /// sentence-lock table and rejected if the hold cannot be confirmed.
    pub enforce_locks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name_node: NameNodeConfig::default(),
            storage_node: StorageNodeConfig::default(),
        }
    }
}

impl Default for NameNodeConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            registry_path: PathBuf::from("data/file_registry.txt"),
            cache_capacity: 100,
            heartbeat_timeout_secs: 30,
            scan_interval_secs: 10,
            lock_lease_secs: 60,
        }
    }
}

impl Default for StorageNodeConfig {
    fn default() -> Self {
        Self {
            node_id: "SN1".to_string(),
            advertise_ip: "127.0.0.1".to_string(),
            client_port: 7000,
            control_port: 6000,
            data_dir: PathBuf::from("data"),
            name_node_addr: "127.0.0.1:5000".to_string(),
            heartbeat_interval_secs: 30,
            enforce_locks: true,
        }
    }
}

impl Config {
    /// Loads the config file if present, then applies env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = path {
            let contents = std::fs::read_to_string(path)?;
            config = toml::from_str(&contents)?;
        } else if Path::new("cluster.toml").exists() {
            let contents = std::fs::read_to_string("cluster.toml")?;
            config = toml::from_str(&contents)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("DC_NAME_NODE_BIND") {
            self.name_node.bind = bind;
        }
        if let Ok(addr) = std::env::var("DC_NAME_NODE_ADDR") {
            self.storage_node.name_node_addr = addr;
        }
        if let Ok(id) = std::env::var("DC_NODE_ID") {
            self.storage_node.node_id = id;
        }
        if let Ok(dir) = std::env::var("DC_DATA_DIR") {
            self.storage_node.data_dir = PathBuf::from(dir);
        }
    }
}
