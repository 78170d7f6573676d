// blockchain-core/src/block.rs
use crate::{transaction::Transaction, types::*, BlockchainError, BlockchainResult};
use blockchain_crypto::{double_sha256, merkle_root, KeyPair};
use serde::{Deserialize, Serialize};

/// Block header; the block id is the double SHA256 of its encoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height, 0 for genesis
    pub height: BlockNumber,
    /// Id of the previous block, empty for genesis
    pub pre_hash: Vec<u8>,
    /// Merkle root of the transaction ids
    pub merkle_root: Vec<u8>,
    pub tx_count: u32,
    /// Address of the proposer
    pub proposer: String,
    /// Hex public key of the proposer
    pub pubkey: String,
    pub timestamp: Timestamp,
}

impl BlockHeader {
    pub fn compute_id(&self) -> BlockchainResult<Vec<u8>> {
        let bytes = bincode::serialize(self)?;
        Ok(double_sha256(&bytes).to_vec())
    }
}

/// Complete block structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub blockid: Vec<u8>,
    pub header: BlockHeader,
    /// Hex proposer signature over the block id
    pub sign: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create an unsigned block on top of `pre_hash`
    pub fn new(height: BlockNumber, pre_hash: Vec<u8>, proposer: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        let header = BlockHeader {
            height,
            pre_hash,
            merkle_root: tx_merkle_root(&transactions),
            tx_count: transactions.len() as u32,
            proposer: proposer.into(),
            pubkey: String::new(),
            timestamp: now_nanos(),
        };

        Self {
            blockid: Vec::new(),
            header,
            sign: String::new(),
            transactions,
        }
    }

    /// The first block of a chain
    pub fn genesis(transactions: Vec<Transaction>) -> BlockchainResult<Self> {
        let mut block = Self::new(0, Vec::new(), "", transactions);
        block.header.timestamp = 0;
        block.blockid = block.header.compute_id()?;
        Ok(block)
    }

    /// Fill in the proposer key, compute the id and sign it
    pub fn sign(&mut self, keypair: &KeyPair) -> BlockchainResult<()> {
        self.header.proposer = keypair.address().to_string();
        self.header.pubkey = keypair.public_key().to_hex();
        self.blockid = self.header.compute_id()?;
        self.sign = keypair.sign(&self.blockid)?.to_hex();
        Ok(())
    }

    pub fn height(&self) -> BlockNumber {
        self.header.height
    }

    pub fn blockid_hex(&self) -> String {
        hex::encode(&self.blockid)
    }

    /// Structural checks that need no chain state: id, merkle root and txids
    pub fn validate(&self) -> BlockchainResult<()> {
        if self.blockid.is_empty() {
            return Err(BlockchainError::InvalidBlock("empty blockid".into()));
        }
        if self.header.compute_id()? != self.blockid {
            return Err(BlockchainError::InvalidBlock(format!(
                "blockid mismatch for {}",
                self.blockid_hex()
            )));
        }
        if self.header.tx_count as usize != self.transactions.len() {
            return Err(BlockchainError::InvalidBlock(format!(
                "tx_count {} but {} transactions",
                self.header.tx_count,
                self.transactions.len()
            )));
        }
        if tx_merkle_root(&self.transactions) != self.header.merkle_root {
            return Err(BlockchainError::InvalidBlock("merkle root mismatch".into()));
        }

        for tx in &self.transactions {
            if tx.coinbase && self.header.height != 0 {
                return Err(BlockchainError::InvalidBlock(format!(
                    "coinbase transaction {} outside genesis",
                    tx.txid_hex()
                )));
            }
            if tx.digest()?.to_vec() != tx.txid {
                return Err(BlockchainError::InvalidBlock(format!(
                    "txid mismatch for {}",
                    tx.txid_hex()
                )));
            }
        }

        Ok(())
    }
}

fn tx_merkle_root(transactions: &[Transaction]) -> Vec<u8> {
    let txids: Vec<&[u8]> = transactions.iter().map(|tx| tx.txid.as_slice()).collect();
    merkle_root(&txids).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_crypto::SignatureScheme;

    fn sealed_tx(initiator: &str) -> Transaction {
        let mut tx = Transaction::new(initiator);
        tx.seal().unwrap();
        tx
    }

    #[test]
    fn test_genesis_block() {
        let coinbase = Transaction::coinbase(&[("alice".into(), Amount::from_u64(100))], b"genesis").unwrap();
        let genesis = Block::genesis(vec![coinbase]).unwrap();

        assert_eq!(genesis.height(), 0);
        assert!(genesis.header.pre_hash.is_empty());
        assert!(genesis.validate().is_ok());

        let again = Block::genesis(genesis.transactions.clone()).unwrap();
        assert_eq!(again.blockid, genesis.blockid, "genesis id is deterministic");
    }

    #[test]
    fn test_signed_block_validates() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let mut block = Block::new(1, vec![1; 32], "", vec![sealed_tx("a"), sealed_tx("b")]);
        block.sign(&keypair).unwrap();

        assert_eq!(block.header.proposer, keypair.address().to_string());
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_tampered_block_fails() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let mut block = Block::new(1, vec![1; 32], "", vec![sealed_tx("a")]);
        block.sign(&keypair).unwrap();

        let mut tampered = block.clone();
        tampered.header.height = 2;
        assert!(tampered.validate().is_err());

        let mut dropped = block.clone();
        dropped.transactions.clear();
        assert!(dropped.validate().is_err());

        let mut unsealed = block;
        unsealed.transactions[0].desc = b"changed".to_vec();
        assert!(unsealed.validate().is_err());
    }

    #[test]
    fn test_coinbase_only_in_genesis() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let coinbase = Transaction::coinbase(&[("alice".into(), Amount::from_u64(1))], b"mint").unwrap();
        let mut block = Block::new(3, vec![1; 32], "", vec![coinbase]);
        block.sign(&keypair).unwrap();
        assert!(block.validate().is_err());
    }
}
