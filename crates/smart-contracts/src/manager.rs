// smart-contracts/src/manager.rs

use crate::context::NativeContext;
use crate::gas::ResourceConfig;
use crate::kernel::{DeployContract, DEPLOY_CONTRACT};
use crate::registry::NativeRegistry;
use crate::sandbox::XModelSandbox;
use blockchain_core::{
    contract_desc_key, BlockchainError, BlockchainResult, Contract, ContractDesc, ContractManager,
    ContextConfig, ExecutionContext, SandboxConfig, StateSandbox, XMReader, CONTRACT_BUCKET,
    KERNEL_MODULE, NATIVE_MODULE,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Contract manager running native and kernel contracts
pub struct NativeContractManager {
    xm_reader: Arc<dyn XMReader>,
    kernel: RwLock<HashMap<String, Arc<dyn Contract>>>,
    natives: NativeRegistry,
    costs: ResourceConfig,
}

impl NativeContractManager {
    pub fn new(xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Self> {
        Self::with_registry(xm_reader, NativeRegistry::new(), ResourceConfig::default())
    }

    /// Manager over a custom code registry; `$contract` is registered
    /// for deployments of those codes
    pub fn with_registry(
        xm_reader: Arc<dyn XMReader>,
        natives: NativeRegistry,
        costs: ResourceConfig,
    ) -> BlockchainResult<Self> {
        let manager = Self {
            xm_reader,
            kernel: RwLock::new(HashMap::new()),
            costs,
            natives,
        };
        let deploy = DeployContract::new(manager.natives.codes());
        manager.register_kernel_contract(DEPLOY_CONTRACT, Arc::new(deploy))?;
        Ok(manager)
    }

    /// Descriptor of a deployed contract as of the committed view
    pub fn contract_desc(&self, contract_name: &str) -> BlockchainResult<Option<ContractDesc>> {
        match self.xm_reader.get(CONTRACT_BUCKET, &contract_desc_key(contract_name))? {
            Some(data) if !data.is_empty() => Ok(Some(serde_json::from_slice(&data.pure_data.value)?)),
            _ => Ok(None),
        }
    }

    pub fn kernel_contracts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.kernel.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, config: &ContextConfig) -> BlockchainResult<(Arc<dyn Contract>, bool)> {
        match config.module.as_str() {
            KERNEL_MODULE => {
                let contract = self
                    .kernel
                    .read()
                    .get(&config.contract_name)
                    .cloned()
                    .ok_or_else(|| BlockchainError::ContractNotFound(config.contract_name.clone()))?;
                Ok((contract, true))
            }
            NATIVE_MODULE => {
                let raw = config
                    .state
                    .get(CONTRACT_BUCKET, &contract_desc_key(&config.contract_name))?
                    .ok_or_else(|| BlockchainError::ContractNotFound(config.contract_name.clone()))?;
                let desc: ContractDesc = serde_json::from_slice(&raw)?;
                if desc.module != NATIVE_MODULE {
                    return Err(BlockchainError::InvalidParameter(format!(
                        "{} is a {} contract",
                        desc.contract_name, desc.module
                    )));
                }
                let contract = self
                    .natives
                    .get(&desc.code)
                    .ok_or_else(|| BlockchainError::ContractNotFound(format!("native code {}", desc.code)))?;
                Ok((contract, false))
            }
            other => Err(BlockchainError::InvalidParameter(format!("unknown module {:?}", other))),
        }
    }
}

impl ContractManager for NativeContractManager {
    fn new_state_sandbox(&self, config: &SandboxConfig) -> BlockchainResult<Arc<dyn StateSandbox>> {
        Ok(Arc::new(XModelSandbox::new(config)))
    }

    fn new_context(&self, config: ContextConfig) -> BlockchainResult<Box<dyn ExecutionContext>> {
        let (contract, kernel) = self.resolve(&config)?;
        let context = NativeContext::new(config, contract, kernel, self.costs.clone())?;
        Ok(Box::new(context))
    }

    fn register_kernel_contract(&self, name: &str, contract: Arc<dyn Contract>) -> BlockchainResult<()> {
        if !name.starts_with('$') {
            return Err(BlockchainError::InvalidParameter(format!(
                "kernel contract {} must start with $",
                name
            )));
        }
        let mut kernel = self.kernel.write();
        if kernel.contains_key(name) {
            return Err(BlockchainError::InvalidParameter(format!(
                "kernel contract {} already registered",
                name
            )));
        }
        kernel.insert(name.to_string(), contract);
        debug!(contract = name, "Kernel contract registered");
        Ok(())
    }
}
