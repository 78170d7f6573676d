// smart-contracts/src/sandbox.rs

use blockchain_core::{
    Amount, BlockchainError, BlockchainResult, PureData, RwSet, SandboxConfig, StateSandbox,
    TxInput, TxOutput, UtxoReader, UtxoRwSet, VersionedData, XMReader,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

type StateKey = (String, Vec<u8>);

#[derive(Default)]
struct Buffers {
    /// First version seen of every key read, including absent ones
    reads: BTreeMap<StateKey, VersionedData>,
    writes: BTreeMap<StateKey, Vec<u8>>,
    utxo_inputs: Vec<TxInput>,
    utxo_outputs: Vec<TxOutput>,
    spent: HashSet<String>,
    rw_set: RwSet,
    utxo_rw_set: UtxoRwSet,
}

/// Buffered view over chain state shared by every call of one batch.
///
/// Nothing reaches the underlying state; the caller turns the flushed sets
/// into a transaction.
pub struct XModelSandbox {
    xm_reader: Arc<dyn XMReader>,
    utxo_reader: Arc<dyn UtxoReader>,
    buffers: Mutex<Buffers>,
}

impl XModelSandbox {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            xm_reader: config.xm_reader.clone(),
            utxo_reader: config.utxo_reader.clone(),
            buffers: Mutex::new(Buffers::default()),
        }
    }
}

impl StateSandbox for XModelSandbox {
    fn get(&self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<Vec<u8>>> {
        let state_key = (bucket.to_string(), key.to_vec());
        let mut buffers = self.buffers.lock();

        if let Some(value) = buffers.writes.get(&state_key) {
            return Ok(Some(value.clone()));
        }
        if let Some(data) = buffers.reads.get(&state_key) {
            return Ok((!data.is_empty()).then(|| data.pure_data.value.clone()));
        }

        let data = self.xm_reader.get(bucket, key)?.unwrap_or_else(|| VersionedData {
            pure_data: PureData {
                bucket: bucket.to_string(),
                key: key.to_vec(),
                value: Vec::new(),
            },
            ..Default::default()
        });
        let value = (!data.is_empty()).then(|| data.pure_data.value.clone());
        buffers.reads.insert(state_key, data);
        Ok(value)
    }

    fn put(&self, bucket: &str, key: &[u8], value: Vec<u8>) -> BlockchainResult<()> {
        self.buffers
            .lock()
            .writes
            .insert((bucket.to_string(), key.to_vec()), value);
        Ok(())
    }

    fn transfer(&self, from: &str, to: &str, amount: &Amount) -> BlockchainResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        if from.is_empty() || to.is_empty() {
            return Err(BlockchainError::InvalidParameter("transfer needs both parties".into()));
        }

        let mut buffers = self.buffers.lock();
        let (inputs, total) = self.utxo_reader.select_utxos(from, amount, &buffers.spent)?;

        for input in &inputs {
            buffers.spent.insert(input.utxo_key());
        }
        buffers.utxo_inputs.extend(inputs);
        buffers.utxo_outputs.push(TxOutput {
            to_addr: to.to_string(),
            amount: amount.clone(),
        });

        if let Some(change) = total.checked_sub(amount).filter(|c| !c.is_zero()) {
            buffers.utxo_outputs.push(TxOutput {
                to_addr: from.to_string(),
                amount: change,
            });
        }
        Ok(())
    }

    fn flush(&self) -> BlockchainResult<()> {
        let mut buffers = self.buffers.lock();

        let rw_set = RwSet {
            rset: buffers.reads.values().cloned().collect(),
            wset: buffers
                .writes
                .iter()
                .map(|((bucket, key), value)| PureData {
                    bucket: bucket.clone(),
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        };
        let utxo_rw_set = UtxoRwSet {
            rset: buffers.utxo_inputs.clone(),
            wset: buffers.utxo_outputs.clone(),
        };

        buffers.rw_set = rw_set;
        buffers.utxo_rw_set = utxo_rw_set;
        Ok(())
    }

    fn rw_set(&self) -> RwSet {
        self.buffers.lock().rw_set.clone()
    }

    fn utxo_rw_set(&self) -> UtxoRwSet {
        self.buffers.lock().utxo_rw_set.clone()
    }
}
