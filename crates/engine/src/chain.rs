// engine/src/chain.rs

use crate::admission::TxIdCache;
use crate::agent::{ChainRelyAgent, DefaultRelyAgent};
use crate::context::{CallContext, ChainCtx, EngineCtx};
use crate::error::{EngineError, EngineResult};
use crate::executor;
use crate::miner::Miner;
use blockchain_core::{Block, BlockchainError, InvokeRequest, InvokeResponse, Transaction};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn, Span};

const SUBMIT_TX_METHOD: &str = "SubmitTx";

/// Everything that exists only while the chain runs
struct RunningChain {
    ctx: Arc<ChainCtx>,
    miner: Arc<Miner>,
    tx_cache: Arc<TxIdCache>,
    sweeper_stop: watch::Sender<bool>,
}

/// One loaded chain: pre-executes requests, admits transactions and
/// processes blocks.
///
/// After [`Chain::stop`] every operation fails with [`EngineError::Stopped`].
pub struct Chain {
    name: String,
    inner: RwLock<Option<Arc<RunningChain>>>,
    log: Span,
}

fn chain_log(name: &str) -> EngineResult<Span> {
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '/' || c == '\\')
    {
        return Err(EngineError::NewLogFailed(format!("bad chain name {:?}", name)));
    }
    Ok(tracing::info_span!("chain", name = %name))
}

impl Chain {
    /// Load `name` with the default subsystems
    pub fn load(engine: Arc<EngineCtx>, name: &str) -> EngineResult<Self> {
        let agent = DefaultRelyAgent::new(engine.clone());
        Self::load_with_agent(engine, name, &agent)
    }

    /// Load `name` building subsystems through `agent`
    pub fn load_with_agent(engine: Arc<EngineCtx>, name: &str, agent: &dyn ChainRelyAgent) -> EngineResult<Self> {
        if name.is_empty() {
            return Err(EngineError::Parameter("empty chain name".into()));
        }
        let log = chain_log(name)?;

        let ttl = engine.config.tx_id_cache_ttl();
        let gc_interval = engine.config.tx_id_cache_gc_interval();

        let ctx = match ChainCtx::bring_up(engine, name, agent, log.clone()) {
            Ok(ctx) => Arc::new(ctx),
            Err(err) => {
                log.in_scope(|| error!(chain = name, err = %err, "Init chain ctx failed"));
                return Err(err);
            }
        };

        let miner = Arc::new(Miner::new(ctx.clone()));
        let tx_cache = Arc::new(TxIdCache::new(ttl));
        let (sweeper_stop, stop_rx) = watch::channel(false);
        tx_cache.spawn_sweeper(gc_interval, stop_rx);

        log.in_scope(|| info!(chain = name, height = ctx.state.meta().height, "Chain loaded"));
        Ok(Self {
            name: name.to_string(),
            inner: RwLock::new(Some(Arc::new(RunningChain {
                ctx,
                miner,
                tx_cache,
                sweeper_stop,
            }))),
            log,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn running(&self) -> EngineResult<Arc<RunningChain>> {
        self.inner.read().clone().ok_or(EngineError::Stopped)
    }

    /// Shared handle to the chain's subsystems
    pub fn context(&self) -> EngineResult<Arc<ChainCtx>> {
        Ok(self.running()?.ctx.clone())
    }

    /// Produce blocks until [`Chain::stop`]
    pub async fn start(&self) -> EngineResult<()> {
        let running = self.running()?;
        running.miner.start().await;
        Ok(())
    }

    /// Stop block production and close ledger and state
    pub fn stop(&self) -> EngineResult<()> {
        let running = self.inner.write().take().ok_or(EngineError::Stopped)?;
        let _enter = self.log.enter();

        running.miner.stop();
        running.sweeper_stop.send_replace(true);
        running.ctx.ledger.close();
        running.ctx.state.close();

        info!(chain = %self.name, "Chain stopped");
        Ok(())
    }

    /// Execute `requests` against current state without committing
    pub fn pre_exec(
        &self,
        call: &CallContext,
        requests: Vec<InvokeRequest>,
        initiator: &str,
        auth_require: &[String],
    ) -> EngineResult<InvokeResponse> {
        call.log()?;
        let running = self.running()?;
        let _enter = self.log.enter();
        executor::pre_exec(&running.ctx, call, requests, initiator, auth_require)
    }

    /// Admit a signed transaction into the pending pool
    pub fn submit_tx(&self, call: &CallContext, tx: &Transaction) -> EngineResult<()> {
        let log = call.log()?;
        if tx.txid.is_empty() {
            return Err(EngineError::Parameter("transaction without txid".into()));
        }
        let running = self.running()?;
        let _chain = self.log.enter();
        let _call = log.enter();
        let ctx = &running.ctx;
        let txid = tx.txid_hex();

        if tx.tx_inputs.is_empty() && !ctx.ledger.no_fee() {
            warn!(chain = %self.name, txid = %txid, "Transaction has no inputs on a fee chain");
            return Err(EngineError::InsufficientFunds(format!("{} has no inputs", txid)));
        }

        if !running.tx_cache.check_and_mark(&txid) {
            return Err(EngineError::AlreadyExists(txid));
        }

        let result = self.admit(&running, tx, &txid);
        let code = match &result {
            Ok(()) => "OK",
            Err(err) => err.label(),
        };
        ctx.metrics().call_method(&self.name, SUBMIT_TX_METHOD, code);
        result
    }

    fn admit(&self, running: &RunningChain, tx: &Transaction, txid: &str) -> EngineResult<()> {
        let state = &running.ctx.state;

        // A lookup failure here is left to verification
        if let Ok(Some(_)) = state.query_tx(&tx.txid) {
            error!(chain = %self.name, txid, "Transaction already exists");
            return Err(EngineError::AlreadyExists(txid.to_string()));
        }

        if let Err(source) = state.verify_tx(tx) {
            error!(chain = %self.name, txid, err = %source, "Verify transaction failed");
            return Err(EngineError::Verification {
                txid: txid.to_string(),
                source,
            });
        }

        match state.do_tx(tx) {
            Ok(()) => {
                debug!(chain = %self.name, txid, "Transaction submitted");
                Ok(())
            }
            Err(BlockchainError::AlreadyInUnconfirmed(_)) => {
                error!(chain = %self.name, txid, "Transaction already in unconfirmed pool");
                running.tx_cache.remove(txid);
                Err(EngineError::AlreadyExists(txid.to_string()))
            }
            Err(source) => {
                error!(chain = %self.name, txid, err = %source, "Submit transaction failed");
                Err(EngineError::Admission {
                    txid: txid.to_string(),
                    source,
                })
            }
        }
    }

    /// Apply a block received from the network
    pub fn proc_block(&self, call: &CallContext, block: &Block) -> EngineResult<()> {
        let log = call.log()?;
        if block.blockid.is_empty() {
            return Err(EngineError::Parameter("block without blockid".into()));
        }
        let running = self.running()?;
        let _chain = self.log.enter();
        let _call = log.enter();
        let blockid = block.blockid_hex();

        match running.miner.proc_block(block) {
            Ok(()) => {
                info!(chain = %self.name, height = block.height(), blockid = %blockid, "Process block succeeded");
                Ok(())
            }
            Err(err @ BlockchainError::Forbidden(_)) => {
                trace!(chain = %self.name, blockid = %blockid, err = %err, "Forbidden block");
                Err(EngineError::Forbidden(err))
            }
            Err(BlockchainError::InvalidParameter(reason)) => {
                trace!(chain = %self.name, blockid = %blockid, err = %reason, "Block parameter error");
                Err(EngineError::Parameter(reason))
            }
            Err(source) => {
                warn!(chain = %self.name, blockid = %blockid, err = %source, "Process block failed");
                Err(EngineError::BlockProcessing { blockid, source })
            }
        }
    }

    /// Produce one block now if this node is the next proposer
    pub fn mine_once(&self) -> EngineResult<Option<Block>> {
        let running = self.running()?;
        running.miner.mine_once().map_err(|source| EngineError::BlockProcessing {
            blockid: String::new(),
            source,
        })
    }
}
