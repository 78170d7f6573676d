// consensus/src/poa.rs

use crate::{validator::ValidatorSet, ConsensusError, ConsensusResult};
use blockchain_core::{Block, BlockNumber, BlockchainResult, ConsensusEngine};
use blockchain_crypto::CryptoClient;
use std::sync::Arc;
use tracing::debug;

/// Round-robin proof-of-authority engine
pub struct PoaConsensus {
    validators: ValidatorSet,
    crypto: Arc<dyn CryptoClient>,
}

impl PoaConsensus {
    pub fn new(validators: ValidatorSet, crypto: Arc<dyn CryptoClient>) -> Self {
        Self { validators, crypto }
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validators
    }

    fn check_proposer(&self, block: &Block) -> ConsensusResult<()> {
        let height = block.height();
        if height == 0 {
            return Ok(());
        }

        let expected = self.validators.proposer_at(height).unwrap_or_default();
        if block.header.proposer != expected {
            return Err(ConsensusError::WrongProposer {
                height,
                expected: expected.to_string(),
                actual: block.header.proposer.clone(),
            });
        }

        let public_key = self.crypto.public_key_from_hex(&block.header.pubkey)?;
        if self.crypto.address_of(&public_key).to_string() != block.header.proposer {
            return Err(ConsensusError::InvalidSignature(format!(
                "public key of block {} does not belong to {}",
                block.blockid_hex(),
                block.header.proposer
            )));
        }

        let signature = self.crypto.signature_from_hex(&block.sign)?;
        if !self.crypto.verify(&public_key, &block.blockid, &signature)? {
            return Err(ConsensusError::InvalidSignature(block.blockid_hex()));
        }

        debug!(height, proposer = %block.header.proposer, "Block proposer checked");
        Ok(())
    }
}

impl ConsensusEngine for PoaConsensus {
    fn name(&self) -> &str {
        "poa"
    }

    fn proposer_at(&self, height: BlockNumber) -> Option<String> {
        self.validators.proposer_at(height).map(str::to_string)
    }

    fn check_block(&self, block: &Block) -> BlockchainResult<()> {
        self.check_proposer(block).map_err(|e| match e {
            // Unparseable keys or signatures are the proposer's fault too
            ConsensusError::CryptoError(inner) => ConsensusError::InvalidSignature(inner.to_string()).into(),
            other => other.into(),
        })
    }
}
