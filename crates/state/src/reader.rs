// state/src/reader.rs

use crate::machine::Inner;
use blockchain_core::{
    BlockchainError, BlockchainResult, TxInput, UtxoReader, VersionedData, XMReader,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads the live view: confirmed state plus every pending transaction
pub struct LiveReader {
    inner: Arc<RwLock<Inner>>,
}

impl LiveReader {
    pub(crate) fn new(inner: Arc<RwLock<Inner>>) -> Self {
        Self { inner }
    }
}

impl XMReader for LiveReader {
    fn get(&self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<VersionedData>> {
        Ok(self.inner.read().live.get(bucket, key).cloned())
    }
}

impl UtxoReader for LiveReader {
    fn list_utxos(&self, address: &str) -> BlockchainResult<Vec<TxInput>> {
        Ok(self.inner.read().live.utxos_of(address))
    }
}

/// Reads the trunk tip without pending writes
pub struct ConfirmedReader {
    inner: Arc<RwLock<Inner>>,
}

impl ConfirmedReader {
    pub(crate) fn new(inner: Arc<RwLock<Inner>>) -> Self {
        Self { inner }
    }
}

impl XMReader for ConfirmedReader {
    fn get(&self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<VersionedData>> {
        Ok(self.inner.read().confirmed.get(bucket, key).cloned())
    }
}

impl UtxoReader for ConfirmedReader {
    fn list_utxos(&self, address: &str) -> BlockchainResult<Vec<TxInput>> {
        Ok(self.inner.read().confirmed.utxos_of(address))
    }
}

/// Serves exactly the reads and inputs a transaction declared, so replaying
/// its contract calls does not depend on what happened to the state since.
pub struct TxInputsReader {
    declared: HashMap<(String, Vec<u8>), Option<VersionedData>>,
    utxos: Vec<TxInput>,
}

impl TxInputsReader {
    pub(crate) fn new(declared: HashMap<(String, Vec<u8>), Option<VersionedData>>, utxos: Vec<TxInput>) -> Self {
        Self { declared, utxos }
    }
}

impl XMReader for TxInputsReader {
    fn get(&self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<VersionedData>> {
        match self.declared.get(&(bucket.to_string(), key.to_vec())) {
            Some(data) => Ok(data.clone()),
            None => Err(BlockchainError::Conflict(format!(
                "{}/{} is outside the declared read set",
                bucket,
                hex::encode(key)
            ))),
        }
    }
}

impl UtxoReader for TxInputsReader {
    fn list_utxos(&self, address: &str) -> BlockchainResult<Vec<TxInput>> {
        Ok(self
            .utxos
            .iter()
            .filter(|u| u.from_addr == address)
            .cloned()
            .collect())
    }
}
