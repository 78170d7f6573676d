// engine/src/miner.rs

use crate::context::ChainCtx;
use crate::executor::timer_tx;
use blockchain_core::{Block, BlockchainError, BlockchainResult, Transaction};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Applies blocks to the chain and, when this node is the scheduled
/// proposer, produces them
pub struct Miner {
    ctx: Arc<ChainCtx>,
    stop_tx: watch::Sender<bool>,
    /// Serializes block application
    apply_lock: Mutex<()>,
}

impl Miner {
    pub fn new(ctx: Arc<ChainCtx>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            ctx,
            stop_tx,
            apply_lock: Mutex::new(()),
        }
    }

    /// Validate `block` and confirm it into ledger and state.
    ///
    /// A block the ledger already holds is accepted as is. Consensus
    /// rejections come back as `Forbidden`, blocks not extending the tip as
    /// `InvalidParameter`.
    pub fn proc_block(&self, block: &Block) -> BlockchainResult<()> {
        let _guard = self.apply_lock.lock();
        self.apply(block)
    }

    fn apply(&self, block: &Block) -> BlockchainResult<()> {
        if self.ctx.ledger.exist_block(&block.blockid)? {
            debug!(chain = %self.ctx.bcname, blockid = %block.blockid_hex(), "Block already confirmed");
            return Ok(());
        }

        let meta = self.ctx.state.meta();
        if block.height() != meta.height + 1 || block.header.pre_hash != meta.tip_blockid {
            return Err(BlockchainError::InvalidParameter(format!(
                "block {} at height {} does not extend tip {} at height {}",
                block.blockid_hex(),
                block.height(),
                hex::encode(&meta.tip_blockid),
                meta.height
            )));
        }

        self.ctx.consensus.check_block(block)?;
        block.validate()?;
        self.ctx.state.play_block(block)
    }

    /// Produce one block if this node proposes the next height.
    ///
    /// Tasks due at that height lead the block in a timer transaction; if it
    /// cannot be built or applied the block goes out without it.
    pub fn mine_once(&self) -> BlockchainResult<Option<Block>> {
        let _guard = self.apply_lock.lock();

        let meta = self.ctx.state.meta();
        let height = meta.height + 1;
        let address = self.ctx.address.address.to_string();
        if !self.ctx.consensus.is_proposer(height, &address) {
            return Ok(None);
        }

        let txs = self.ctx.state.unconfirmed_txs(self.ctx.config().max_block_txs);
        let timer = match timer_tx(&self.ctx, height) {
            Ok(timer) => timer,
            Err(err) => {
                warn!(chain = %self.ctx.bcname, height, err = %err, "Timer tasks failed, skipped");
                None
            }
        };

        let block = match timer {
            Some(timer) => {
                let mut with_timer = vec![timer];
                with_timer.extend(txs.iter().cloned());
                match self.seal(height, &meta.tip_blockid, &address, with_timer) {
                    Ok(block) => block,
                    Err(err) => {
                        warn!(chain = %self.ctx.bcname, height, err = %err, "Block with timer transaction rejected");
                        self.seal(height, &meta.tip_blockid, &address, txs)?
                    }
                }
            }
            None => self.seal(height, &meta.tip_blockid, &address, txs)?,
        };

        info!(
            chain = %self.ctx.bcname,
            height,
            blockid = %block.blockid_hex(),
            txs = block.transactions.len(),
            "Block mined"
        );
        Ok(Some(block))
    }

    fn seal(&self, height: u64, pre_hash: &[u8], address: &str, txs: Vec<Transaction>) -> BlockchainResult<Block> {
        let mut block = Block::new(height, pre_hash.to_vec(), address.to_string(), txs);
        block.sign(&self.ctx.address.keypair)?;
        self.apply(&block)?;
        Ok(block)
    }

    /// Run block production until [`Miner::stop`] is called
    pub async fn start(&self) {
        let mut stop = self.stop_tx.subscribe();
        if *stop.borrow() {
            return;
        }

        let period = self.ctx.config().miner_period();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(chain = %self.ctx.bcname, period_ms = period.as_millis() as u64, "Miner started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.mine_once() {
                        warn!(chain = %self.ctx.bcname, err = %err, "Mining failed");
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!(chain = %self.ctx.bcname, "Miner stopped");
    }

    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

}
