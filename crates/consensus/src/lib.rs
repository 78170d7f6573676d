// consensus/src/lib.rs

//! Proof-of-Authority consensus
//!
//! This crate implements a single-leader schedule where:
//! - A fixed, ordered validator list is recorded at genesis
//! - Height `h` is proposed by validator `(h - 1) mod n`
//! - Blocks must be signed by the scheduled proposer

pub mod poa;
pub mod validator;

pub use poa::PoaConsensus;
pub use validator::ValidatorSet;

use blockchain_core::{BlockchainError, ConsensusConfig, ConsensusEngine};
use blockchain_crypto::CryptoClient;
use std::sync::Arc;

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Errors that can occur during consensus operations
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Validator error: {0}")]
    ValidatorError(String),

    #[error("Unsupported consensus type: {0}")]
    UnsupportedType(String),

    #[error("Wrong proposer at height {height}: expected {expected}, got {actual}")]
    WrongProposer {
        height: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid proposer signature: {0}")]
    InvalidSignature(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(#[from] BlockchainError),

    #[error("Crypto error: {0}")]
    CryptoError(#[from] blockchain_crypto::CryptoError),
}

impl From<ConsensusError> for BlockchainError {
    fn from(e: ConsensusError) -> Self {
        match e {
            ConsensusError::BlockchainError(inner) => inner,
            ConsensusError::ValidatorError(_) | ConsensusError::UnsupportedType(_) => {
                BlockchainError::InvalidParameter(e.to_string())
            }
            other => BlockchainError::Forbidden(other.to_string()),
        }
    }
}

/// Build the engine named by the genesis consensus config
pub fn new_consensus(
    config: &ConsensusConfig,
    crypto: Arc<dyn CryptoClient>,
) -> ConsensusResult<Arc<dyn ConsensusEngine>> {
    match config.kind.as_str() {
        "poa" | "single" => {
            let validators = ValidatorSet::new(config.validators.clone())?;
            Ok(Arc::new(PoaConsensus::new(validators, crypto)))
        }
        other => Err(ConsensusError::UnsupportedType(other.to_string())),
    }
}
