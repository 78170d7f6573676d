// blockchain-core/src/lib.rs

//! Core chain data structures and the interfaces of chain subsystems
//!
//! This crate provides:
//! - Block and transaction structures (UTXO inputs/outputs plus contract read/write sets)
//! - Contract invocation requests and responses, resource limits and gas pricing
//! - Ledger, state machine, contract manager and consensus interfaces
//! - Governance manager interfaces (ACL, govern token, proposal, timer task, xtoken)

pub mod block;
pub mod consensus;
pub mod contract;
pub mod governance;
pub mod invoke;
pub mod ledger;
pub mod rwset;
pub mod state;
pub mod transaction;
pub mod types;

pub use block::{Block, BlockHeader};
pub use consensus::ConsensusEngine;
pub use contract::{
    Contract, ContractContext, ContractManager, ContextConfig, ExecutionContext, SandboxConfig,
    StateSandbox, KERNEL_MODULE, NATIVE_MODULE,
};
pub use governance::{
    is_account_name, Acl, AclManager, GovernTokenManager, Proposal, ProposalManager, ProposalStatus, TimerTask,
    TimerTaskManager, XTokenManager, TIMER_TX_INITIATOR,
};
pub use invoke::{
    parse_contract_transfer_request, ContractResponse, ContractTransfer, InvokeRequest,
    InvokeResponse, STATUS_ERROR_THRESHOLD, STATUS_OK,
};
pub use ledger::{ConsensusConfig, GenesisConfig, Ledger, LedgerMeta, Predistribution};
pub use rwset::{PureData, RwSet, TxInputExt, TxOutputExt, UtxoRwSet, VersionedData};
pub use state::{
    contract_desc_key, ContractDesc, StateMachine, StateMeta, TxStatus, UtxoReader, XMReader,
    CONTRACT_BUCKET,
};
pub use transaction::{utxo_key, SignatureInfo, Transaction, TxInput, TxOutput, FEE_ADDRESS};
pub use types::*;

/// Result type for chain operations
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Errors reported by chain subsystems
#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Ledger error: {0}")]
    LedgerError(String),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    #[error("Transaction already in unconfirmed pool: {0}")]
    AlreadyInUnconfirmed(String),

    #[error("Read set conflict on {0}")]
    Conflict(String),

    #[error("Double spend of {0}")]
    DoubleSpend(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Contract execution error: {0}")]
    ContractError(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Closed")]
    Closed,

    #[error("Cryptographic error: {0}")]
    CryptoError(#[from] blockchain_crypto::CryptoError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<bincode::Error> for BlockchainError {
    fn from(e: bincode::Error) -> Self {
        BlockchainError::SerializationError(e.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(e: serde_json::Error) -> Self {
        BlockchainError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_converts() {
        let err: BlockchainError = blockchain_crypto::CryptoError::InvalidSignature.into();
        assert!(matches!(err, BlockchainError::CryptoError(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = BlockchainError::ContractNotFound("counter".into());
        assert_eq!(err.to_string(), "Contract not found: counter");
    }
}
