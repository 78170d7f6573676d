// state/src/pool.rs

use blockchain_core::{BlockchainError, BlockchainResult, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Pending pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of pending transactions
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_size: 100_000 }
    }
}

/// Pool metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub pending_count: usize,
    pub total_added: u64,
    pub total_removed: u64,
    pub total_dropped: u64,
}

/// Admitted transactions not yet in a block, in admission order
#[derive(Debug, Clone, Default)]
pub struct PendingPool {
    config: PoolConfig,
    by_txid: HashMap<Vec<u8>, (u64, Transaction)>,
    order: BTreeMap<u64, Vec<u8>>,
    next_seq: u64,
    metrics: PoolMetrics,
}

impl PendingPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn contains(&self, txid: &[u8]) -> bool {
        self.by_txid.contains_key(txid)
    }

    pub fn get(&self, txid: &[u8]) -> Option<&Transaction> {
        self.by_txid.get(txid).map(|(_, tx)| tx)
    }

    pub fn len(&self) -> usize {
        self.by_txid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_txid.is_empty()
    }

    /// Fails if `tx` is already pending or the pool is full
    pub fn ensure_admissible(&self, tx: &Transaction) -> BlockchainResult<()> {
        if self.contains(&tx.txid) {
            return Err(BlockchainError::AlreadyInUnconfirmed(tx.txid_hex()));
        }
        if self.by_txid.len() >= self.config.max_size {
            return Err(BlockchainError::StateError("pending pool full".into()));
        }
        Ok(())
    }

    pub fn insert(&mut self, tx: Transaction) -> BlockchainResult<()> {
        self.ensure_admissible(&tx)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, tx.txid.clone());
        self.by_txid.insert(tx.txid.clone(), (seq, tx));

        self.metrics.total_added += 1;
        self.metrics.pending_count = self.by_txid.len();
        Ok(())
    }

    pub fn remove(&mut self, txid: &[u8]) -> Option<Transaction> {
        let (seq, tx) = self.by_txid.remove(txid)?;
        self.order.remove(&seq);

        self.metrics.total_removed += 1;
        self.metrics.pending_count = self.by_txid.len();
        Some(tx)
    }

    /// Remove a transaction that no longer applies on top of the trunk
    pub fn drop_invalid(&mut self, txid: &[u8]) -> Option<Transaction> {
        let tx = self.remove(txid)?;
        self.metrics.total_dropped += 1;
        Some(tx)
    }

    /// Pending transactions in admission order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order
            .values()
            .filter_map(|txid| self.by_txid.get(txid).map(|(_, tx)| tx))
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}
