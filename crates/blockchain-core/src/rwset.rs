// blockchain-core/src/rwset.rs

//! Read and write sets produced by contract execution.
//!
//! Contract state is a versioned key/value model: every value remembers the
//! transaction output that wrote it (`ref_txid`, `ref_offset`). A read records
//! the version it observed so a later admission can detect conflicts.

use crate::transaction::{TxInput, TxOutput};
use serde::{Deserialize, Serialize};

/// A bucket/key/value triple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PureData {
    pub bucket: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A value together with the transaction output that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedData {
    pub pure_data: PureData,
    /// Empty for values that have never been written
    pub ref_txid: Vec<u8>,
    pub ref_offset: u32,
}

impl VersionedData {
    pub fn is_empty(&self) -> bool {
        self.ref_txid.is_empty()
    }

    /// Version string, `<txid hex>_<offset>`, empty for unwritten keys
    pub fn version(&self) -> String {
        if self.ref_txid.is_empty() {
            String::new()
        } else {
            format!("{}_{}", hex::encode(&self.ref_txid), self.ref_offset)
        }
    }
}

/// A read recorded in a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInputExt {
    pub bucket: String,
    pub key: Vec<u8>,
    pub ref_txid: Vec<u8>,
    pub ref_offset: u32,
}

/// A write recorded in a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutputExt {
    pub bucket: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Contract-model read/write set of a sandbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwSet {
    pub rset: Vec<VersionedData>,
    pub wset: Vec<PureData>,
}

impl RwSet {
    pub fn tx_inputs_ext(&self) -> Vec<TxInputExt> {
        self.rset
            .iter()
            .map(|vd| TxInputExt {
                bucket: vd.pure_data.bucket.clone(),
                key: vd.pure_data.key.clone(),
                ref_txid: vd.ref_txid.clone(),
                ref_offset: vd.ref_offset,
            })
            .collect()
    }

    pub fn tx_outputs_ext(&self) -> Vec<TxOutputExt> {
        self.wset
            .iter()
            .map(|pd| TxOutputExt {
                bucket: pd.bucket.clone(),
                key: pd.key.clone(),
                value: pd.value.clone(),
            })
            .collect()
    }
}

/// UTXO-model read/write set produced by contract transfers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRwSet {
    pub rset: Vec<TxInput>,
    pub wset: Vec<TxOutput>,
}
