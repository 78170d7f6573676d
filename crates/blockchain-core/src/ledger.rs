// blockchain-core/src/ledger.rs

use crate::block::Block;
use crate::invoke::InvokeRequest;
use crate::transaction::Transaction;
use crate::types::{Amount, BlockNumber, GasPrice};
use crate::{BlockchainError, BlockchainResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial coin allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predistribution {
    pub address: String,
    pub quota: Amount,
}

/// Consensus parameters recorded at genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Consensus kind, e.g. `poa`
    #[serde(rename = "type")]
    pub kind: String,
    /// Proposer addresses in schedule order
    pub validators: Vec<String>,
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

fn default_period_ms() -> u64 {
    3000
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            kind: "poa".into(),
            validators: Vec::new(),
            period_ms: default_period_ms(),
        }
    }
}

/// Chain parameters fixed when the ledger is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Crypto type name, e.g. `default`, `ed25519`, `secp256k1`
    #[serde(default)]
    pub crypto: String,
    /// Transactions need no fee inputs
    #[serde(default)]
    pub no_fee: bool,
    #[serde(default)]
    pub gas_price: GasPrice,
    /// System requests prepended to every pre-execution batch
    #[serde(default)]
    pub reserved_contracts: Vec<InvokeRequest>,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub predistribution: Vec<Predistribution>,
}

impl GenesisConfig {
    pub fn from_file(path: impl AsRef<Path>) -> BlockchainResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BlockchainError::LedgerError(format!("read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> BlockchainResult<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| BlockchainError::LedgerError(format!("write {}: {}", path.display(), e)))
    }

    /// The genesis block minting the predistribution
    pub fn genesis_block(&self) -> BlockchainResult<Block> {
        let allocations: Vec<(String, Amount)> = self
            .predistribution
            .iter()
            .map(|p| (p.address.clone(), p.quota.clone()))
            .collect();
        let coinbase = Transaction::coinbase(&allocations, b"genesis")?;
        Block::genesis(vec![coinbase])
    }
}

/// Trunk position of the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMeta {
    pub root_blockid: Vec<u8>,
    pub tip_blockid: Vec<u8>,
    pub trunk_height: BlockNumber,
}

/// Durable block log of one chain
pub trait Ledger: Send + Sync {
    fn genesis(&self) -> &GenesisConfig;

    fn meta(&self) -> LedgerMeta;

    /// Crypto type recorded at genesis
    fn crypto_type(&self) -> String {
        self.genesis().crypto.clone()
    }

    fn no_fee(&self) -> bool {
        self.genesis().no_fee
    }

    fn exist_block(&self, blockid: &[u8]) -> BlockchainResult<bool>;

    fn query_block(&self, blockid: &[u8]) -> BlockchainResult<Block>;

    fn query_block_by_height(&self, height: BlockNumber) -> BlockchainResult<Block>;

    /// A confirmed transaction, `None` if the ledger has never seen it
    fn query_transaction(&self, txid: &[u8]) -> BlockchainResult<Option<Transaction>>;

    /// Append `block` to the trunk; it must extend the current tip
    fn confirm_block(&self, block: &Block) -> BlockchainResult<()>;

    fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_config_json() {
        let json = r#"{
            "crypto": "default",
            "no_fee": true,
            "consensus": { "type": "poa", "validators": ["alice"] },
            "predistribution": [{ "address": "alice", "quota": "1000" }]
        }"#;
        let config: GenesisConfig = serde_json::from_str(json).unwrap();

        assert!(config.no_fee);
        assert_eq!(config.consensus.period_ms, 3000);
        assert_eq!(config.predistribution[0].quota, Amount::from_u64(1000));
        assert!(config.reserved_contracts.is_empty());
    }

    #[test]
    fn test_genesis_block_mints_predistribution() {
        let config = GenesisConfig {
            predistribution: vec![Predistribution { address: "alice".into(), quota: Amount::from_u64(7) }],
            ..Default::default()
        };
        let block = config.genesis_block().unwrap();

        assert_eq!(block.height(), 0);
        assert!(block.transactions[0].coinbase);
        assert_eq!(block.transactions[0].output_total(), Amount::from_u64(7));
    }

    #[test]
    fn test_genesis_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("genesis-{}", rand::random::<u32>()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("genesis.json");

        let config = GenesisConfig { crypto: "secp256k1".into(), ..Default::default() };
        config.to_file(&path).unwrap();
        assert_eq!(GenesisConfig::from_file(&path).unwrap(), config);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
