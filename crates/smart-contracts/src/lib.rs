// smart-contracts/src/lib.rs

//! Native contract execution
//!
//! This crate provides the reference contract manager of a chain:
//! - A per-batch state sandbox recording contract and UTXO read/write sets
//! - Execution contexts with resource metering
//! - A registry of native contract code (`counter`, `vault`)
//! - Kernel (system) contracts, starting with `$contract` for deployment

pub mod context;
pub mod gas;
pub mod kernel;
pub mod manager;
pub mod native;
pub mod registry;
pub mod sandbox;

pub use context::NativeContext;
pub use gas::{ResourceConfig, ResourceMeter};
pub use kernel::{DeployContract, DEPLOY_CONTRACT};
pub use manager::NativeContractManager;
pub use native::{Counter, Vault};
pub use registry::NativeRegistry;
pub use sandbox::XModelSandbox;

use blockchain_core::BlockchainError;

/// Result type for smart contract operations
pub type ContractResult<T> = Result<T, ContractError>;

/// Errors that can occur during contract execution
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Out of resource: {0}")]
    OutOfResource(String),

    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Context released")]
    Released,

    #[error("State error: {0}")]
    StateError(String),
}

impl From<ContractError> for BlockchainError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::OutOfResource(what) => BlockchainError::ResourceExhausted(what),
            ContractError::ContractNotFound(name) => BlockchainError::ContractNotFound(name),
            ContractError::Forbidden(what) => BlockchainError::Forbidden(what),
            other => BlockchainError::ContractError(other.to_string()),
        }
    }
}
