// smart-contracts/src/context.rs

use crate::gas::{ResourceConfig, ResourceMeter};
use crate::ContractError;
use blockchain_core::{
    Amount, BlockchainResult, Contract, ContractContext, ContractResponse, ContextConfig,
    ExecutionContext, ResourceLimits,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Execution context of one call into native or kernel code.
///
/// Creating the context performs the batch's value transfer when this call
/// is its target.
pub struct NativeContext {
    config: ContextConfig,
    contract: Arc<dyn Contract>,
    /// Kernel code may write any bucket; native code only its own
    kernel: bool,
    costs: ResourceConfig,
    meter: ResourceMeter,
    released: bool,
}

impl NativeContext {
    pub fn new(
        config: ContextConfig,
        contract: Arc<dyn Contract>,
        kernel: bool,
        costs: ResourceConfig,
    ) -> BlockchainResult<Self> {
        let mut meter = ResourceMeter::new(config.resource_limits);

        if let Some(amount) = config.transfer_amount.as_ref().filter(|a| !a.is_zero()) {
            meter.consume(&costs.transfer_cost())?;
            config
                .state
                .transfer(&config.initiator, &config.contract_name, amount)?;
        }

        Ok(Self {
            config,
            contract,
            kernel,
            costs,
            meter,
            released: false,
        })
    }
}

impl ExecutionContext for NativeContext {
    fn invoke(&mut self, method: &str, args: &BTreeMap<String, Vec<u8>>) -> BlockchainResult<ContractResponse> {
        if self.released {
            return Err(ContractError::Released.into());
        }

        let args_len = args.iter().map(|(k, v)| k.len() + v.len()).sum();
        self.meter.consume(&self.costs.call_cost(args_len))?;

        let mut frame = CallFrame {
            config: &self.config,
            args,
            kernel: self.kernel,
            costs: &self.costs,
            meter: &mut self.meter,
        };
        let response = self.contract.invoke(&mut frame, method)?;

        trace!(
            contract = %self.config.contract_name,
            method,
            status = response.status,
            "Contract invoked"
        );
        Ok(response)
    }

    fn resource_used(&self) -> ResourceLimits {
        self.meter.used()
    }

    fn release(&mut self) -> BlockchainResult<()> {
        self.released = true;
        Ok(())
    }
}

/// What the contract sees during a single method call
struct CallFrame<'a> {
    config: &'a ContextConfig,
    args: &'a BTreeMap<String, Vec<u8>>,
    kernel: bool,
    costs: &'a ResourceConfig,
    meter: &'a mut ResourceMeter,
}

impl ContractContext for CallFrame<'_> {
    fn contract_name(&self) -> &str {
        &self.config.contract_name
    }

    fn initiator(&self) -> &str {
        &self.config.initiator
    }

    fn auth_require(&self) -> &[String] {
        &self.config.auth_require
    }

    fn args(&self) -> &BTreeMap<String, Vec<u8>> {
        self.args
    }

    fn transfer_amount(&self) -> Option<&Amount> {
        self.config.transfer_amount.as_ref()
    }

    fn get_object(&mut self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<Vec<u8>>> {
        let value = self.config.state.get(bucket, key)?;
        let len = value.as_ref().map_or(0, Vec::len);
        self.meter.consume(&self.costs.get_cost(len))?;
        Ok(value)
    }

    fn put_object(&mut self, bucket: &str, key: &[u8], value: Vec<u8>) -> BlockchainResult<()> {
        if !self.kernel && bucket != self.config.contract_name {
            return Err(ContractError::Forbidden(format!(
                "{} cannot write bucket {}",
                self.config.contract_name, bucket
            ))
            .into());
        }
        self.meter.consume(&self.costs.put_cost(key.len(), value.len()))?;
        self.config.state.put(bucket, key, value)
    }

    fn transfer(&mut self, to: &str, amount: &Amount) -> BlockchainResult<()> {
        self.meter.consume(&self.costs.transfer_cost())?;
        self.config
            .state
            .transfer(&self.config.contract_name, to, amount)
    }
}
