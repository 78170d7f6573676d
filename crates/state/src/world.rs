// state/src/world.rs

use blockchain_core::{
    utxo_key, BlockchainError, BlockchainResult, PureData, Transaction, TxInput, VersionedData,
    FEE_ADDRESS,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Versioned key/value contract state plus the UTXO set.
///
/// Values remember the transaction output that wrote them; unspent outputs
/// are stored as the input that would spend them.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    kv: HashMap<(String, Vec<u8>), VersionedData>,
    utxos: BTreeMap<String, TxInput>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, key: &[u8]) -> Option<&VersionedData> {
        self.kv.get(&(bucket.to_string(), key.to_vec()))
    }

    pub fn utxo(&self, key: &str) -> Option<&TxInput> {
        self.utxos.get(key)
    }

    /// Unspent outputs of `address` in key order
    pub fn utxos_of(&self, address: &str) -> Vec<TxInput> {
        self.utxos
            .values()
            .filter(|u| u.from_addr == address)
            .cloned()
            .collect()
    }

    pub fn utxo_count(&self) -> usize {
        self.utxos.len()
    }

    /// Check that every read version is current and every input unspent
    pub fn check_tx(&self, tx: &Transaction) -> BlockchainResult<()> {
        for input in &tx.inputs_ext {
            let current = self
                .get(&input.bucket, &input.key)
                .map(VersionedData::version)
                .unwrap_or_default();
            let declared = VersionedData {
                ref_txid: input.ref_txid.clone(),
                ref_offset: input.ref_offset,
                ..Default::default()
            }
            .version();

            if current != declared {
                return Err(BlockchainError::Conflict(format!(
                    "{}/{} read at {:?}, now {:?}",
                    input.bucket,
                    hex::encode(&input.key),
                    declared,
                    current
                )));
            }
        }

        let mut spent = HashSet::new();
        for input in &tx.tx_inputs {
            let key = input.utxo_key();
            if !spent.insert(key.clone()) {
                return Err(BlockchainError::DoubleSpend(key));
            }
            match self.utxos.get(&key) {
                Some(utxo) if utxo.from_addr == input.from_addr && utxo.amount == input.amount => {}
                Some(_) => {
                    return Err(BlockchainError::InvalidTransaction(format!(
                        "input {} does not match the referenced output",
                        key
                    )))
                }
                None => return Err(BlockchainError::DoubleSpend(key)),
            }
        }

        Ok(())
    }

    /// Apply writes and UTXO moves of an already checked transaction
    pub fn apply_tx(&mut self, tx: &Transaction) {
        for (offset, output) in tx.outputs_ext.iter().enumerate() {
            let data = VersionedData {
                pure_data: PureData {
                    bucket: output.bucket.clone(),
                    key: output.key.clone(),
                    value: output.value.clone(),
                },
                ref_txid: tx.txid.clone(),
                ref_offset: offset as u32,
            };
            self.kv.insert((output.bucket.clone(), output.key.clone()), data);
        }

        for input in &tx.tx_inputs {
            self.utxos.remove(&input.utxo_key());
        }

        for (offset, output) in tx.tx_outputs.iter().enumerate() {
            if output.to_addr == FEE_ADDRESS {
                continue;
            }
            let offset = offset as u32;
            self.utxos.insert(
                utxo_key(&tx.txid, offset),
                TxInput {
                    ref_txid: tx.txid.clone(),
                    ref_offset: offset,
                    from_addr: output.to_addr.clone(),
                    amount: output.amount.clone(),
                },
            );
        }
    }
}
