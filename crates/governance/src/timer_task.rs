// governance/src/timer_task.rs

use crate::govern_token::GOVERN_TOKEN_CONTRACT;
use crate::proposal::{proposal_key, PROPOSAL_CONTRACT};
use crate::store::{self, STATUS_BAD_REQUEST, STATUS_CONFLICT, STATUS_FORBIDDEN, STATUS_NOT_FOUND};
use crate::xtoken::XTOKEN_CONTRACT;
use blockchain_core::{
    BlockNumber, BlockchainResult, Contract, ContractContext, ContractManager, ContractResponse,
    InvokeRequest, Proposal, ProposalStatus, TimerTask, TimerTaskManager, XMReader, KERNEL_MODULE,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TIMER_TASK_CONTRACT: &str = "$timer_task";

/// Kernel calls a passed proposal may schedule
const SCHEDULABLE: &[(&str, &str)] = &[
    (GOVERN_TOKEN_CONTRACT, "Transfer"),
    (XTOKEN_CONTRACT, "NewToken"),
    (XTOKEN_CONTRACT, "Transfer"),
];

fn height_key(height: BlockNumber) -> String {
    format!("height_{:020}", height)
}

fn scheduled_key(proposal_id: u64) -> String {
    format!("scheduled_{:020}", proposal_id)
}

/// Checks a task a proposal carries and pins it to the kernel module.
///
/// Tasks run as `$timer_task`, which signs nothing, so they cannot carry a
/// transfer amount and only reach the calls in the schedulable list.
pub(crate) fn check_task(mut task: TimerTask) -> Result<TimerTask, String> {
    if task.trigger_height == 0 {
        return Err("bad trigger_height".into());
    }
    let request = &mut task.request;
    if request.amount.is_some() {
        return Err("scheduled requests cannot transfer".into());
    }
    if !request.module_name.is_empty() && request.module_name != KERNEL_MODULE {
        return Err(format!("module {} cannot be scheduled", request.module_name));
    }
    let allowed = SCHEDULABLE
        .iter()
        .any(|(contract, method)| request.contract_name == *contract && request.method_name == *method);
    if !allowed {
        return Err(format!("{}.{} cannot be scheduled", request.contract_name, request.method_name));
    }
    request.module_name = KERNEL_MODULE.to_string();
    request.resource_limits = None;
    Ok(task)
}

/// `$timer_task`: `Add(proposal_id)` and `Query(trigger_height)`.
///
/// `Add` schedules the task of a passed proposal, once. The task runs in the
/// timer transaction leading the block at its trigger height.
pub struct TimerTaskContract;

impl TimerTaskContract {
    fn add(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let Some(id) = store::arg_u64(ctx, "proposal_id") else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad proposal_id"));
        };
        let Some(proposal) = store::get_json::<Proposal>(ctx, PROPOSAL_CONTRACT, &proposal_key(id))? else {
            return Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("proposal {} not found", id)));
        };
        if proposal.status != ProposalStatus::Passed {
            warn!(proposal = id, caller = %ctx.initiator(), "Timer task from a proposal not passed");
            return Ok(ContractResponse::error(STATUS_FORBIDDEN, format!("proposal {} has not passed", id)));
        }
        let Some(task) = proposal.task else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("proposal {} has no task", id)));
        };
        if store::get_json::<BlockNumber>(ctx, TIMER_TASK_CONTRACT, &scheduled_key(id))?.is_some() {
            return Ok(ContractResponse::error(STATUS_CONFLICT, format!("proposal {} already scheduled", id)));
        }

        let key = height_key(task.trigger_height);
        let mut tasks: Vec<InvokeRequest> = store::get_json(ctx, TIMER_TASK_CONTRACT, &key)?.unwrap_or_default();
        tasks.push(task.request.clone());
        store::put_json(ctx, TIMER_TASK_CONTRACT, &key, &tasks)?;
        store::put_json(ctx, TIMER_TASK_CONTRACT, &scheduled_key(id), &task.trigger_height)?;

        debug!(proposal = id, height = task.trigger_height, contract = %task.request.contract_name, "Timer task added");
        Ok(ContractResponse::ok(serde_json::to_vec(&task)?))
    }
}

impl Contract for TimerTaskContract {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        match method {
            "Add" => Self::add(ctx),
            "Query" => {
                let Some(height) = store::arg_u64(ctx, "trigger_height") else {
                    return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad trigger_height"));
                };
                let raw = ctx.get_object(TIMER_TASK_CONTRACT, height_key(height).as_bytes())?;
                Ok(ContractResponse::ok(raw.unwrap_or_else(|| b"[]".to_vec())))
            }
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}

/// Scheduled requests as committed by `$timer_task`
pub struct TimerTaskKernel {
    xm_reader: Arc<dyn XMReader>,
}

impl TimerTaskKernel {
    /// Registers `$timer_task` into `contracts`; `xm_reader` must see the
    /// confirmed state only
    pub fn new(contracts: &dyn ContractManager, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<Self>> {
        contracts.register_kernel_contract(TIMER_TASK_CONTRACT, Arc::new(TimerTaskContract))?;
        Ok(Arc::new(Self { xm_reader }))
    }
}

impl TimerTaskManager for TimerTaskKernel {
    fn tasks_at(&self, height: BlockNumber) -> BlockchainResult<Vec<InvokeRequest>> {
        Ok(store::read_json(self.xm_reader.as_ref(), TIMER_TASK_CONTRACT, &height_key(height))?.unwrap_or_default())
    }
}
