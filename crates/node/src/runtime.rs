// node/src/runtime.rs
use crate::config::NodeConfig;
use engine::{Chain, EngineCtx};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A node serving its root chain
pub struct Node {
    config: NodeConfig,
    chain: Arc<Chain>,
    miner: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Bring up the root chain named in `config`
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let engine = Arc::new(EngineCtx::new(config.env.clone(), config.engine.clone()));
        let chain = Chain::load(engine, &config.engine.root_chain)?;
        info!(chain = %config.engine.root_chain, root = %config.env.root_path.display(), "Node created");

        Ok(Self {
            config,
            chain: Arc::new(chain),
            miner: parking_lot::Mutex::new(None),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    /// Start block production in the background
    pub fn start(&self) {
        let chain = self.chain.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = chain.start().await {
                error!(chain = %chain.name(), error = %e, "Block production failed");
            }
        });
        *self.miner.lock() = Some(handle);
        info!(chain = %self.chain.name(), "Node started");
    }

    /// Stop the chain and wait for block production to wind down
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.chain.stop()?;
        let handle = self.miner.lock().take();
        if let Some(handle) = handle {
            handle.await?;
        }
        info!(chain = %self.chain.name(), "Node stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::{init_node, InitOptions};

    #[tokio::test]
    async fn test_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = init_node(&InitOptions {
            root: dir.path().to_path_buf(),
            chain: "xuper".into(),
            crypto: "default".into(),
            no_fee: true,
        })
        .unwrap();
        config.engine.miner_period_ms = 10;

        let node = Node::new(config).unwrap();
        node.start();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        node.stop().await.unwrap();

        assert!(node.stop().await.is_err(), "already stopped");
        assert!(node.chain().context().is_err());
    }
}
