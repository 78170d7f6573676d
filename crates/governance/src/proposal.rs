// governance/src/proposal.rs

use crate::govern_token::{balance_key, GOVERN_TOKEN_CONTRACT, TOTAL_SUPPLY_KEY};
use crate::store::{self, STATUS_BAD_REQUEST, STATUS_CONFLICT, STATUS_FORBIDDEN, STATUS_NOT_FOUND};
use crate::timer_task::check_task;
use blockchain_core::{
    Amount, BlockchainResult, Contract, ContractContext, ContractManager, ContractResponse,
    InvokeRequest, Proposal, ProposalManager, ProposalStatus, TimerTask, XMReader,
};
use std::sync::Arc;
use tracing::info;

pub const PROPOSAL_CONTRACT: &str = "$proposal";

const NEXT_ID_KEY: &str = "next_id";

pub(crate) fn proposal_key(id: u64) -> String {
    format!("proposal_{:020}", id)
}

/// `$proposal`: `Propose(description[, trigger_height, request])`,
/// `Vote(proposal_id)` and `Query(proposal_id)`.
///
/// A vote weighs the voter's govern token balance; a proposal passes once its
/// votes exceed half of the total supply. `request` is a JSON invoke request
/// that `$timer_task.Add` schedules at `trigger_height` after the proposal
/// passes.
pub struct ProposalContract;

impl ProposalContract {
    fn propose(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let Some(description) = store::arg_str(ctx, "description") else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "missing description"));
        };
        let task = match ctx.arg("request") {
            None => None,
            Some(raw) => {
                let request = match serde_json::from_slice::<InvokeRequest>(raw) {
                    Ok(request) => request,
                    Err(e) => return Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("bad request: {}", e))),
                };
                let trigger_height = store::arg_u64(ctx, "trigger_height").unwrap_or_default();
                match check_task(TimerTask { trigger_height, request }) {
                    Ok(task) => Some(task),
                    Err(message) => return Ok(ContractResponse::error(STATUS_BAD_REQUEST, message)),
                }
            }
        };
        let id: u64 = store::get_json(ctx, PROPOSAL_CONTRACT, NEXT_ID_KEY)?.unwrap_or(1);

        let proposal = Proposal {
            id,
            proposer: ctx.initiator().to_string(),
            description,
            votes: Amount::zero(),
            voters: Vec::new(),
            status: ProposalStatus::Voting,
            task,
        };
        store::put_json(ctx, PROPOSAL_CONTRACT, &proposal_key(id), &proposal)?;
        store::put_json(ctx, PROPOSAL_CONTRACT, NEXT_ID_KEY, &(id + 1))?;
        Ok(ContractResponse::ok(id.to_string()))
    }

    fn vote(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let Some(id) = store::arg_u64(ctx, "proposal_id") else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad proposal_id"));
        };
        let Some(mut proposal) = store::get_json::<Proposal>(ctx, PROPOSAL_CONTRACT, &proposal_key(id))? else {
            return Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("proposal {} not found", id)));
        };
        if proposal.status != ProposalStatus::Voting {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("proposal {} is closed", id)));
        }

        let voter = ctx.initiator().to_string();
        if proposal.voters.contains(&voter) {
            return Ok(ContractResponse::error(STATUS_CONFLICT, format!("{} already voted", voter)));
        }
        let weight: Amount = store::get_json(ctx, GOVERN_TOKEN_CONTRACT, &balance_key(&voter))?.unwrap_or_default();
        if weight.is_zero() {
            return Ok(ContractResponse::error(STATUS_FORBIDDEN, format!("{} holds no govern tokens", voter)));
        }

        proposal.votes = &proposal.votes + &weight;
        proposal.voters.push(voter);

        let total: Amount = store::get_json(ctx, GOVERN_TOKEN_CONTRACT, TOTAL_SUPPLY_KEY)?.unwrap_or_default();
        if &proposal.votes + &proposal.votes > total {
            proposal.status = ProposalStatus::Passed;
            info!(proposal = id, votes = %proposal.votes, "Proposal passed");
        }

        let body = store::put_json(ctx, PROPOSAL_CONTRACT, &proposal_key(id), &proposal)?;
        Ok(ContractResponse::ok(body))
    }
}

impl Contract for ProposalContract {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        match method {
            "Propose" => Self::propose(ctx),
            "Vote" => Self::vote(ctx),
            "Query" => {
                let Some(id) = store::arg_u64(ctx, "proposal_id") else {
                    return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad proposal_id"));
                };
                match ctx.get_object(PROPOSAL_CONTRACT, proposal_key(id).as_bytes())? {
                    Some(raw) => Ok(ContractResponse::ok(raw)),
                    None => Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("proposal {} not found", id))),
                }
            }
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}

/// Proposals as committed by `$proposal`
pub struct ProposalKernel {
    xm_reader: Arc<dyn XMReader>,
}

impl ProposalKernel {
    /// Registers `$proposal` into `contracts`
    pub fn new(contracts: &dyn ContractManager, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<Self>> {
        contracts.register_kernel_contract(PROPOSAL_CONTRACT, Arc::new(ProposalContract))?;
        Ok(Arc::new(Self { xm_reader }))
    }
}

impl ProposalManager for ProposalKernel {
    fn get_proposal(&self, id: u64) -> BlockchainResult<Option<Proposal>> {
        store::read_json(self.xm_reader.as_ref(), PROPOSAL_CONTRACT, &proposal_key(id))
    }
}
