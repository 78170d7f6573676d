// engine/src/error.rs

use blockchain_core::BlockchainError;
use std::fmt;

/// Result type for chain operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Bring-up step of a chain, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BringUpStep {
    Ledger,
    CryptoType,
    Crypto,
    State,
    NodeAddress,
    Contract,
    Acl,
    Consensus,
    GovernToken,
    Proposal,
    TimerTask,
    XToken,
}

impl BringUpStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BringUpStep::Ledger => "ledger",
            BringUpStep::CryptoType => "crypto type",
            BringUpStep::Crypto => "crypto",
            BringUpStep::State => "state",
            BringUpStep::NodeAddress => "node address",
            BringUpStep::Contract => "contract manager",
            BringUpStep::Acl => "acl",
            BringUpStep::Consensus => "consensus",
            BringUpStep::GovernToken => "govern token",
            BringUpStep::Proposal => "proposal",
            BringUpStep::TimerTask => "timer task",
            BringUpStep::XToken => "xtoken",
        }
    }
}

impl fmt::Display for BringUpStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by chain operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Create chain log failed: {0}")]
    NewLogFailed(String),

    #[error("Chain bring-up failed at {step}: {source}")]
    Configuration {
        step: BringUpStep,
        #[source]
        source: BlockchainError,
    },

    #[error("Create sandbox failed: {0}")]
    SandboxCreation(#[source] BlockchainError),

    #[error("Create execution context for {contract} failed: {source}")]
    ExecutionContext {
        contract: String,
        #[source]
        source: BlockchainError,
    },

    #[error("Invoke {contract}.{method} failed: {reason}")]
    Invocation {
        contract: String,
        method: String,
        reason: String,
    },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Transaction already exists: {0}")]
    AlreadyExists(String),

    #[error("Verify transaction {txid} failed: {source}")]
    Verification {
        txid: String,
        #[source]
        source: BlockchainError,
    },

    #[error("Submit transaction {txid} failed: {source}")]
    Admission {
        txid: String,
        #[source]
        source: BlockchainError,
    },

    #[error("Forbidden: {0}")]
    Forbidden(#[source] BlockchainError),

    #[error("Process block {blockid} failed: {source}")]
    BlockProcessing {
        blockid: String,
        #[source]
        source: BlockchainError,
    },

    #[error("Chain stopped")]
    Stopped,
}

impl EngineError {
    /// Stable numeric code
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Parameter(_) => 1001,
            EngineError::NewLogFailed(_) => 1002,
            EngineError::Configuration { .. } => 1003,
            EngineError::SandboxCreation(_) => 1004,
            EngineError::ExecutionContext { .. } => 1005,
            EngineError::Invocation { .. } => 1006,
            EngineError::InsufficientFunds(_) => 1007,
            EngineError::AlreadyExists(_) => 1008,
            EngineError::Verification { .. } => 1009,
            EngineError::Admission { .. } => 1010,
            EngineError::Forbidden(_) => 1011,
            EngineError::BlockProcessing { .. } => 1012,
            EngineError::Stopped => 1013,
        }
    }

    /// Result code reported to metrics
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::Parameter(_) => "ParameterError",
            EngineError::NewLogFailed(_) => "NewLogFailed",
            EngineError::Configuration { .. } => "NewChainCtxFailed",
            EngineError::SandboxCreation(_) => "NewSandboxFailed",
            EngineError::ExecutionContext { .. } => "NewContextFailed",
            EngineError::Invocation { .. } => "InvokeFailed",
            EngineError::InsufficientFunds(_) => "TxNotEnough",
            EngineError::AlreadyExists(_) => "TxAlreadyExist",
            EngineError::Verification { .. } => "VerifyTxFailed",
            EngineError::Admission { .. } => "SubmitTxFailed",
            EngineError::Forbidden(_) => "Forbidden",
            EngineError::BlockProcessing { .. } => "ProcBlockFailed",
            EngineError::Stopped => "Stopped",
        }
    }

    /// The bring-up step behind a configuration error
    pub fn step(&self) -> Option<BringUpStep> {
        match self {
            EngineError::Configuration { step, .. } => Some(*step),
            _ => None,
        }
    }
}
