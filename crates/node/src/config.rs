// node/src/config.rs
use engine::{EngineConfig, EnvConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name under the conf directory
pub const NODE_CONFIG_FILE: &str = "node.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub env: EnvConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl NodeConfig {
    /// Default layout rooted at `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            env: EnvConfig::with_root(root.as_ref()),
            engine: EngineConfig::default(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
