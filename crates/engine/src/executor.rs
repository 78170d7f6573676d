// engine/src/executor.rs

//! Pre-execution of a request batch in one throwaway sandbox.
//!
//! Reserved requests run first, are free, and may be skipped when their
//! contract does not exist. Any other failure discards the whole batch.
//!
//! Timer tasks due at a height run in their own batch as `$timer_task`,
//! against confirmed state, and become the unsigned timer transaction
//! leading that block.

use crate::context::{CallContext, ChainCtx};
use crate::error::{EngineError, EngineResult};
use blockchain_core::{
    parse_contract_transfer_request, BlockNumber, BlockchainError, ContextConfig, ExecutionContext,
    Gas, InvokeRequest, InvokeResponse, ResourceLimits, SandboxConfig, Transaction, TIMER_TX_INITIATOR,
};
use std::time::Instant;
use tracing::{debug, error, warn};

const STATUS_OK: &str = "OK";
const STATUS_INVOKE_ERROR: &str = "InvokeError";

/// Execute `requests` as `initiator` against current state without
/// committing anything. The response carries the read/write sets a
/// transaction needs.
pub fn pre_exec(
    chain: &ChainCtx,
    call: &CallContext,
    requests: Vec<InvokeRequest>,
    initiator: &str,
    auth_require: &[String],
) -> EngineResult<InvokeResponse> {
    let _log = call.log()?.enter();

    let mut batch = chain
        .state
        .get_reserved_contract_requests(&requests)
        .map_err(|e| EngineError::Parameter(format!("get reserved requests: {}", e)))?;
    let reserved_len = batch.len();
    batch.extend(requests);

    let readers = SandboxConfig {
        xm_reader: chain.state.create_xm_reader(),
        utxo_reader: chain.state.create_utxo_reader(),
    };
    execute(chain, batch, reserved_len, readers, initiator, auth_require)
}

/// The timer transaction for the block at `height`, or `None` when no task
/// is due. Any failing task drops the whole transaction.
pub(crate) fn timer_tx(chain: &ChainCtx, height: BlockNumber) -> EngineResult<Option<Transaction>> {
    let tasks = chain
        .timer_task
        .tasks_at(height)
        .map_err(|e| EngineError::Parameter(format!("timer tasks at {}: {}", height, e)))?;
    if tasks.is_empty() {
        return Ok(None);
    }

    let readers = SandboxConfig {
        xm_reader: chain.state.create_confirmed_xm_reader(),
        utxo_reader: chain.state.create_confirmed_utxo_reader(),
    };
    let response = execute(chain, tasks, 0, readers, TIMER_TX_INITIATOR, &[])?;
    if let Some((request, failed)) = response.requests.iter().zip(&response.responses).find(|(_, r)| r.is_error()) {
        return Err(EngineError::Invocation {
            contract: request.contract_name.clone(),
            method: request.method_name.clone(),
            reason: format!("status {}: {}", failed.status, failed.message),
        });
    }

    let tx = Transaction::timer(height, &response).map_err(|e| EngineError::Parameter(e.to_string()))?;
    debug!(chain = %chain.bcname, height, tasks = response.requests.len(), "Timer transaction built");
    Ok(Some(tx))
}

/// Run `batch` in one sandbox over `readers`; its first `reserved_len`
/// requests are reserved
fn execute(
    chain: &ChainCtx,
    batch: Vec<InvokeRequest>,
    reserved_len: usize,
    readers: SandboxConfig,
    initiator: &str,
    auth_require: &[String],
) -> EngineResult<InvokeResponse> {
    let transfer =
        parse_contract_transfer_request(&batch).map_err(|e| EngineError::Parameter(e.to_string()))?;

    if batch.iter().all(InvokeRequest::is_empty) {
        return Ok(InvokeResponse::default());
    }

    let sandbox = chain
        .contract
        .new_state_sandbox(&readers)
        .map_err(EngineError::SandboxCreation)?;

    let gas_price = chain.state.meta().gas_price;
    let metrics = chain.metrics();
    let mut response = InvokeResponse::default();
    let mut gas_used: Gas = 0;

    for (index, request) in batch.into_iter().enumerate() {
        if request.is_empty() {
            warn!(chain = %chain.bcname, index, "Skipping empty request");
            continue;
        }
        let is_reserved = index < reserved_len;

        let module = if request.module_name.is_empty() {
            chain
                .state
                .get_contract_desc(&request.contract_name)
                .map_err(|e| EngineError::Parameter(format!("module of {}: {}", request.contract_name, e)))?
                .module
        } else {
            request.module_name.clone()
        };

        let config = ContextConfig {
            state: sandbox.clone(),
            initiator: initiator.to_string(),
            auth_require: auth_require.to_vec(),
            module: module.clone(),
            contract_name: request.contract_name.clone(),
            resource_limits: ResourceLimits::MAX,
            transfer_amount: transfer
                .as_ref()
                .filter(|t| t.contract_name == request.contract_name)
                .map(|t| t.amount.clone()),
        };

        let begin = Instant::now();
        let mut context = match chain.contract.new_context(config) {
            Ok(context) => context,
            Err(BlockchainError::ContractNotFound(name)) if is_reserved => {
                debug!(chain = %chain.bcname, contract = %name, "Reserved contract not found, skipped");
                response.requests.push(request);
                continue;
            }
            Err(source) => {
                error!(chain = %chain.bcname, contract = %request.contract_name, err = %source, "Create contract context failed");
                return Err(EngineError::ExecutionContext {
                    contract: request.contract_name,
                    source,
                });
            }
        };

        let failure = match context.invoke(&request.method_name, &request.args) {
            Err(err) => Some(err.to_string()),
            Ok(resp) if is_reserved && resp.is_error() => Some(format!("status {}: {}", resp.status, resp.message)),
            Ok(resp) => {
                metrics.contract_invoke(&chain.bcname, &module, &request.contract_name, &request.method_name, STATUS_OK);
                metrics.contract_invoke_latency(
                    &chain.bcname,
                    &module,
                    &request.contract_name,
                    &request.method_name,
                    begin.elapsed().as_secs_f64(),
                );

                let used = context.resource_used();
                if !is_reserved {
                    gas_used = gas_used.saturating_add(used.total_gas(&gas_price));
                }

                let mut resolved = request.clone();
                resolved.resource_limits = Some(used);
                response.requests.push(resolved);
                response.response.push(resp.body.clone());
                response.responses.push(resp);
                None
            }
        };

        release(context.as_mut(), chain, &request);

        if let Some(reason) = failure {
            error!(
                chain = %chain.bcname,
                contract = %request.contract_name,
                method = %request.method_name,
                err = %reason,
                "Pre-execution invoke failed"
            );
            metrics.contract_invoke(&chain.bcname, &module, &request.contract_name, &request.method_name, STATUS_INVOKE_ERROR);
            return Err(EngineError::Invocation {
                contract: request.contract_name,
                method: request.method_name,
                reason,
            });
        }
    }

    sandbox.flush().map_err(|e| EngineError::Invocation {
        contract: "sandbox".into(),
        method: "flush".into(),
        reason: e.to_string(),
    })?;

    let rw_set = sandbox.rw_set();
    let utxo_rw_set = sandbox.utxo_rw_set();
    response.gas_used = gas_used;
    response.inputs = rw_set.tx_inputs_ext();
    response.outputs = rw_set.tx_outputs_ext();
    response.utxo_inputs = utxo_rw_set.rset;
    response.utxo_outputs = utxo_rw_set.wset;

    debug!(
        chain = %chain.bcname,
        requests = response.requests.len(),
        gas_used,
        "Pre-execution done"
    );
    Ok(response)
}

fn release(context: &mut dyn ExecutionContext, chain: &ChainCtx, request: &InvokeRequest) {
    if let Err(err) = context.release() {
        warn!(chain = %chain.bcname, contract = %request.contract_name, err = %err, "Release contract context failed");
    }
}
