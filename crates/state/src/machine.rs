// state/src/machine.rs

use crate::pool::{PendingPool, PoolConfig, PoolMetrics};
use crate::reader::{ConfirmedReader, LiveReader};
use crate::verify::VerifyScope;
use crate::world::WorldState;
use blockchain_core::{
    contract_desc_key, AclManager, Amount, Block, BlockchainError, BlockchainResult, ContractDesc,
    ContractManager, GovernTokenManager, InvokeRequest, Ledger, ProposalManager, StateMachine,
    StateMeta, TimerTaskManager, Transaction, TxStatus, UtxoReader, XMReader, CONTRACT_BUCKET,
};
use blockchain_crypto::CryptoClient;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// Everything guarded by the state lock
pub(crate) struct Inner {
    /// State as of the trunk tip
    pub(crate) confirmed: WorldState,
    /// Confirmed state with every pending transaction applied
    pub(crate) live: WorldState,
    pub(crate) pending: PendingPool,
    pub(crate) meta: StateMeta,
}

#[derive(Default)]
struct Managers {
    contract: Option<Weak<dyn ContractManager>>,
    acl: Option<Weak<dyn AclManager>>,
    timer_task: Option<Weak<dyn TimerTaskManager>>,
}

/// Reference state machine over a [`Ledger`]
pub struct State {
    bcname: String,
    pub(crate) ledger: Arc<dyn Ledger>,
    pub(crate) crypto: Arc<dyn CryptoClient>,
    pub(crate) inner: Arc<RwLock<Inner>>,
    managers: RwLock<Managers>,
    closed: AtomicBool,
}

impl State {
    pub fn new(bcname: &str, ledger: Arc<dyn Ledger>, crypto: Arc<dyn CryptoClient>) -> BlockchainResult<Self> {
        Self::with_pool_config(bcname, ledger, crypto, PoolConfig::default())
    }

    /// Rebuild state by replaying the ledger trunk from genesis
    pub fn with_pool_config(
        bcname: &str,
        ledger: Arc<dyn Ledger>,
        crypto: Arc<dyn CryptoClient>,
        pool_config: PoolConfig,
    ) -> BlockchainResult<Self> {
        let ledger_meta = ledger.meta();
        let mut world = WorldState::new();

        for height in 0..=ledger_meta.trunk_height {
            let block = ledger.query_block_by_height(height)?;
            for tx in &block.transactions {
                world.check_tx(tx)?;
                world.apply_tx(tx);
            }
        }

        let meta = StateMeta {
            gas_price: ledger.genesis().gas_price,
            no_fee: ledger.no_fee(),
            height: ledger_meta.trunk_height,
            tip_blockid: ledger_meta.tip_blockid,
        };
        debug!(
            chain = bcname,
            height = meta.height,
            utxos = world.utxo_count(),
            "State rebuilt from ledger"
        );

        Ok(Self {
            bcname: bcname.to_string(),
            ledger,
            crypto,
            inner: Arc::new(RwLock::new(Inner {
                confirmed: world.clone(),
                live: world,
                pending: PendingPool::new(pool_config),
                meta,
            })),
            managers: RwLock::new(Managers::default()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.bcname
    }

    /// Spendable balance of `address` in the live view
    pub fn balance(&self, address: &str) -> BlockchainResult<Amount> {
        LiveReader::new(self.inner.clone()).balance(address)
    }

    pub fn pool_metrics(&self) -> PoolMetrics {
        self.inner.read().pending.metrics().clone()
    }

    pub(crate) fn ensure_open(&self) -> BlockchainResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BlockchainError::Closed);
        }
        Ok(())
    }

    pub(crate) fn contract_manager(&self) -> Option<Arc<dyn ContractManager>> {
        self.managers.read().contract.as_ref().and_then(|m| m.upgrade())
    }

    pub(crate) fn acl_manager(&self) -> Option<Arc<dyn AclManager>> {
        self.managers.read().acl.as_ref().and_then(|m| m.upgrade())
    }

    pub(crate) fn timer_task_manager(&self) -> Option<Arc<dyn TimerTaskManager>> {
        self.managers.read().timer_task.as_ref().and_then(|m| m.upgrade())
    }
}

impl StateMachine for State {
    fn create_xm_reader(&self) -> Arc<dyn XMReader> {
        Arc::new(LiveReader::new(self.inner.clone()))
    }

    fn create_utxo_reader(&self) -> Arc<dyn UtxoReader> {
        Arc::new(LiveReader::new(self.inner.clone()))
    }

    fn create_confirmed_xm_reader(&self) -> Arc<dyn XMReader> {
        Arc::new(ConfirmedReader::new(self.inner.clone()))
    }

    fn create_confirmed_utxo_reader(&self) -> Arc<dyn UtxoReader> {
        Arc::new(ConfirmedReader::new(self.inner.clone()))
    }

    fn get_reserved_contract_requests(&self, _requests: &[InvokeRequest]) -> BlockchainResult<Vec<InvokeRequest>> {
        Ok(self.ledger.genesis().reserved_contracts.clone())
    }

    fn get_contract_desc(&self, contract_name: &str) -> BlockchainResult<ContractDesc> {
        let inner = self.inner.read();
        let data = inner
            .live
            .get(CONTRACT_BUCKET, &contract_desc_key(contract_name))
            .ok_or_else(|| BlockchainError::ContractNotFound(contract_name.to_string()))?;
        Ok(serde_json::from_slice(&data.pure_data.value)?)
    }

    fn verify_tx(&self, tx: &Transaction) -> BlockchainResult<()> {
        self.ensure_open()?;
        self.verify(tx, VerifyScope::Admission)
    }

    fn do_tx(&self, tx: &Transaction) -> BlockchainResult<()> {
        self.ensure_open()?;
        if tx.is_timer_tx() {
            return Err(BlockchainError::Forbidden(format!(
                "timer transaction {} cannot be pended",
                tx.txid_hex()
            )));
        }
        if self.ledger.query_transaction(&tx.txid)?.is_some() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "{} is already confirmed",
                tx.txid_hex()
            )));
        }

        let mut inner = self.inner.write();
        inner.pending.ensure_admissible(tx)?;
        inner.live.check_tx(tx)?;
        inner.live.apply_tx(tx);
        inner.pending.insert(tx.clone())?;

        trace!(chain = %self.bcname, txid = %tx.txid_hex(), pending = inner.pending.len(), "Transaction pended");
        Ok(())
    }

    fn query_tx(&self, txid: &[u8]) -> BlockchainResult<Option<(Transaction, TxStatus)>> {
        if let Some(tx) = self.inner.read().pending.get(txid) {
            return Ok(Some((tx.clone(), TxStatus::Unconfirmed)));
        }
        Ok(self
            .ledger
            .query_transaction(txid)?
            .map(|tx| (tx, TxStatus::Confirmed)))
    }

    fn unconfirmed_txs(&self, limit: usize) -> Vec<Transaction> {
        self.inner.read().pending.iter().take(limit).cloned().collect()
    }

    fn play_block(&self, block: &Block) -> BlockchainResult<()> {
        self.ensure_open()?;
        block.validate()?;

        // Transactions this node never admitted get the full check first
        let unseen: Vec<usize> = {
            let inner = self.inner.read();
            block
                .transactions
                .iter()
                .enumerate()
                .filter(|(_, tx)| !inner.pending.contains(&tx.txid))
                .map(|(index, _)| index)
                .collect()
        };
        for index in unseen {
            let tx = &block.transactions[index];
            if tx.coinbase {
                return Err(BlockchainError::InvalidBlock(format!(
                    "coinbase {} outside genesis",
                    tx.txid_hex()
                )));
            }
            self.verify(
                tx,
                VerifyScope::Block {
                    height: block.height(),
                    earlier: &block.transactions[..index],
                },
            )?;
        }

        let mut inner = self.inner.write();
        if block.height() != inner.meta.height + 1 || block.header.pre_hash != inner.meta.tip_blockid {
            return Err(BlockchainError::InvalidParameter(format!(
                "block {} at height {} does not extend tip at height {}",
                block.blockid_hex(),
                block.height(),
                inner.meta.height
            )));
        }

        let mut confirmed = inner.confirmed.clone();
        for tx in &block.transactions {
            confirmed.check_tx(tx)?;
            confirmed.apply_tx(tx);
        }

        self.ledger.confirm_block(block)?;

        for tx in &block.transactions {
            inner.pending.remove(&tx.txid);
        }

        let remaining: Vec<Transaction> = inner.pending.iter().cloned().collect();
        let mut live = confirmed.clone();
        for tx in remaining {
            match live.check_tx(&tx) {
                Ok(()) => live.apply_tx(&tx),
                Err(err) => {
                    warn!(chain = %self.bcname, txid = %tx.txid_hex(), err = %err, "Dropping pending transaction");
                    inner.pending.drop_invalid(&tx.txid);
                }
            }
        }

        inner.confirmed = confirmed;
        inner.live = live;
        inner.meta.height = block.height();
        inner.meta.tip_blockid = block.blockid.clone();

        info!(
            chain = %self.bcname,
            height = block.height(),
            blockid = %block.blockid_hex(),
            txs = block.transactions.len(),
            "Block played"
        );
        Ok(())
    }

    fn meta(&self) -> StateMeta {
        self.inner.read().meta.clone()
    }

    fn set_contract_manager(&self, manager: Weak<dyn ContractManager>) {
        self.managers.write().contract = Some(manager);
    }

    fn set_acl_manager(&self, manager: Weak<dyn AclManager>) {
        self.managers.write().acl = Some(manager);
    }

    // Token balances and proposals are only read by their own kernel
    // contracts, so these are not kept
    fn set_govern_token_manager(&self, _manager: Weak<dyn GovernTokenManager>) {
        trace!(chain = %self.bcname, "Govern token manager bound");
    }

    fn set_proposal_manager(&self, _manager: Weak<dyn ProposalManager>) {
        trace!(chain = %self.bcname, "Proposal manager bound");
    }

    fn set_timer_task_manager(&self, manager: Weak<dyn TimerTaskManager>) {
        self.managers.write().timer_task = Some(manager);
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(chain = %self.bcname, "State closed");
        }
    }
}
