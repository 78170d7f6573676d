// engine/src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Chain engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain loaded on start
    pub root_chain: String,
    /// Lifetime of an admission cache entry
    pub tx_id_cache_expired_secs: u64,
    /// How often expired admission cache entries are swept
    pub tx_id_cache_gc_interval_secs: u64,
    /// Block production tick
    pub miner_period_ms: u64,
    /// Pending transactions packed into one block at most
    pub max_block_txs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_chain: "xuper".into(),
            tx_id_cache_expired_secs: 120,
            tx_id_cache_gc_interval_secs: 180,
            miner_period_ms: 3000,
            max_block_txs: 1000,
        }
    }
}

impl EngineConfig {
    pub fn tx_id_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.tx_id_cache_expired_secs)
    }

    pub fn tx_id_cache_gc_interval(&self) -> Duration {
        Duration::from_secs(self.tx_id_cache_gc_interval_secs.max(1))
    }

    pub fn miner_period(&self) -> Duration {
        Duration::from_millis(self.miner_period_ms.max(1))
    }
}

/// Node directory layout; relative directories resolve against `root_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub root_path: PathBuf,
    pub conf_dir: String,
    pub data_dir: String,
    /// Node identity, relative to the data directory
    pub key_dir: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            conf_dir: "conf".into(),
            data_dir: "data".into(),
            key_dir: "keys".into(),
        }
    }
}

impl EnvConfig {
    /// Layout rooted at `root_path` with default directory names
    pub fn with_root(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Default::default()
        }
    }

    fn resolve(&self, dir: impl AsRef<Path>) -> PathBuf {
        let dir = dir.as_ref();
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root_path.join(dir)
        }
    }

    /// Path under the data directory
    pub fn gen_data_abs_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        let dir = dir.as_ref();
        if dir.is_absolute() {
            return dir.to_path_buf();
        }
        self.resolve(&self.data_dir).join(dir)
    }

    /// Path under the config directory
    pub fn gen_conf_abs_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        let dir = dir.as_ref();
        if dir.is_absolute() {
            return dir.to_path_buf();
        }
        self.resolve(&self.conf_dir).join(dir)
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn key_path(&self) -> PathBuf {
        self.gen_data_abs_path(&self.key_dir)
    }
}
