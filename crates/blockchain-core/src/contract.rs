// blockchain-core/src/contract.rs

//! Contract execution interfaces.
//!
//! A batch of calls shares one [`StateSandbox`]; each call gets its own
//! [`ExecutionContext`] over that sandbox. Contract code sees the call through
//! [`ContractContext`].

use crate::invoke::ContractResponse;
use crate::rwset::{RwSet, UtxoRwSet};
use crate::state::{UtxoReader, XMReader};
use crate::types::{Amount, ResourceLimits};
use crate::BlockchainResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Module of system contracts; their names start with `$`
pub const KERNEL_MODULE: &str = "kernel";

/// Module of built-in contracts deployed through `$contract`
pub const NATIVE_MODULE: &str = "native";

/// State views a sandbox reads through
#[derive(Clone)]
pub struct SandboxConfig {
    pub xm_reader: Arc<dyn XMReader>,
    pub utxo_reader: Arc<dyn UtxoReader>,
}

/// One contract call inside a sandbox
#[derive(Clone)]
pub struct ContextConfig {
    pub state: Arc<dyn StateSandbox>,
    pub initiator: String,
    pub auth_require: Vec<String>,
    pub module: String,
    pub contract_name: String,
    pub resource_limits: ResourceLimits,
    /// Set only when this call is the target of the batch's transfer
    pub transfer_amount: Option<Amount>,
}

/// Buffered view over chain state recording everything read and written
pub trait StateSandbox: Send + Sync {
    fn get(&self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<Vec<u8>>>;

    fn put(&self, bucket: &str, key: &[u8], value: Vec<u8>) -> BlockchainResult<()>;

    /// Move `amount` from `from` to `to` using unspent outputs of `from`
    fn transfer(&self, from: &str, to: &str, amount: &Amount) -> BlockchainResult<()>;

    /// Materialize buffered reads and writes into the read/write sets
    fn flush(&self) -> BlockchainResult<()>;

    fn rw_set(&self) -> RwSet;

    fn utxo_rw_set(&self) -> UtxoRwSet;
}

/// A single call's execution environment
pub trait ExecutionContext: Send {
    fn invoke(&mut self, method: &str, args: &BTreeMap<String, Vec<u8>>) -> BlockchainResult<ContractResponse>;

    fn resource_used(&self) -> ResourceLimits;

    fn release(&mut self) -> BlockchainResult<()>;
}

/// What contract code can see and do during a call
pub trait ContractContext {
    fn contract_name(&self) -> &str;

    fn initiator(&self) -> &str;

    fn auth_require(&self) -> &[String];

    fn args(&self) -> &BTreeMap<String, Vec<u8>>;

    fn arg(&self, key: &str) -> Option<&[u8]> {
        self.args().get(key).map(Vec::as_slice)
    }

    fn transfer_amount(&self) -> Option<&Amount>;

    fn get_object(&mut self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<Vec<u8>>>;

    fn put_object(&mut self, bucket: &str, key: &[u8], value: Vec<u8>) -> BlockchainResult<()>;

    /// Pay `amount` out of this contract's own balance
    fn transfer(&mut self, to: &str, amount: &Amount) -> BlockchainResult<()>;
}

/// Contract code, native or kernel
pub trait Contract: Send + Sync {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse>;
}

/// Creates sandboxes and execution contexts for one chain
pub trait ContractManager: Send + Sync {
    fn new_state_sandbox(&self, config: &SandboxConfig) -> BlockchainResult<Arc<dyn StateSandbox>>;

    /// Fails with `ContractNotFound` when nothing backs the target contract
    fn new_context(&self, config: ContextConfig) -> BlockchainResult<Box<dyn ExecutionContext>>;

    fn register_kernel_contract(&self, name: &str, contract: Arc<dyn Contract>) -> BlockchainResult<()>;
}
