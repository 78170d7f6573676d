// governance/src/govern_token.rs

use crate::store::{self, STATUS_BAD_REQUEST, STATUS_CONFLICT};
use blockchain_core::{
    Amount, BlockchainResult, Contract, ContractContext, ContractManager, ContractResponse,
    GovernTokenManager, XMReader,
};
use std::sync::Arc;
use tracing::debug;

pub const GOVERN_TOKEN_CONTRACT: &str = "$govern_token";

pub(crate) const TOTAL_SUPPLY_KEY: &str = "total_supply";

/// Key of an address balance in the `$govern_token` bucket
pub fn balance_key(address: &str) -> String {
    format!("balance_{}", address)
}

/// `$govern_token`: `Init(total_supply)`, `Transfer(to, amount)` and `Query(address)`
pub struct GovernTokenContract;

impl GovernTokenContract {
    fn balance(ctx: &mut dyn ContractContext, address: &str) -> BlockchainResult<Amount> {
        Ok(store::get_json(ctx, GOVERN_TOKEN_CONTRACT, &balance_key(address))?.unwrap_or_default())
    }

    fn init(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let Some(total) = store::arg_amount(ctx, "total_supply").filter(|a| !a.is_zero()) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad total_supply"));
        };
        if ctx.get_object(GOVERN_TOKEN_CONTRACT, TOTAL_SUPPLY_KEY.as_bytes())?.is_some() {
            return Ok(ContractResponse::error(STATUS_CONFLICT, "govern token already initialized"));
        }

        let owner = ctx.initiator().to_string();
        store::put_json(ctx, GOVERN_TOKEN_CONTRACT, TOTAL_SUPPLY_KEY, &total)?;
        store::put_json(ctx, GOVERN_TOKEN_CONTRACT, &balance_key(&owner), &total)?;
        debug!(owner = %owner, total = %total, "Govern token initialized");
        Ok(ContractResponse::ok(total.to_string()))
    }

    fn transfer(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let (Some(to), Some(amount)) = (store::arg_str(ctx, "to"), store::arg_amount(ctx, "amount")) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "transfer needs to and amount"));
        };
        let from = ctx.initiator().to_string();
        let Some(rest) = Self::balance(ctx, &from)?.checked_sub(&amount) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "insufficient govern tokens"));
        };
        store::put_json(ctx, GOVERN_TOKEN_CONTRACT, &balance_key(&from), &rest)?;

        let received = &Self::balance(ctx, &to)? + &amount;
        store::put_json(ctx, GOVERN_TOKEN_CONTRACT, &balance_key(&to), &received)?;
        Ok(ContractResponse::ok(rest.to_string()))
    }
}

impl Contract for GovernTokenContract {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        match method {
            "Init" => Self::init(ctx),
            "Transfer" => Self::transfer(ctx),
            "Query" => {
                let address = store::arg_str(ctx, "address").unwrap_or_else(|| ctx.initiator().to_string());
                Ok(ContractResponse::ok(Self::balance(ctx, &address)?.to_string()))
            }
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}

/// Governance token balances as committed by `$govern_token`
pub struct GovernTokenKernel {
    xm_reader: Arc<dyn XMReader>,
}

impl GovernTokenKernel {
    /// Registers `$govern_token` into `contracts`
    pub fn new(contracts: &dyn ContractManager, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<Self>> {
        contracts.register_kernel_contract(GOVERN_TOKEN_CONTRACT, Arc::new(GovernTokenContract))?;
        Ok(Arc::new(Self { xm_reader }))
    }
}

impl GovernTokenManager for GovernTokenKernel {
    fn get_balance(&self, address: &str) -> BlockchainResult<Amount> {
        Ok(store::read_json(self.xm_reader.as_ref(), GOVERN_TOKEN_CONTRACT, &balance_key(address))?.unwrap_or_default())
    }

    fn total_supply(&self) -> BlockchainResult<Amount> {
        Ok(store::read_json(self.xm_reader.as_ref(), GOVERN_TOKEN_CONTRACT, TOTAL_SUPPLY_KEY)?.unwrap_or_default())
    }
}
