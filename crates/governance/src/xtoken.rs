// governance/src/xtoken.rs

use crate::store::{self, STATUS_BAD_REQUEST, STATUS_CONFLICT, STATUS_NOT_FOUND};
use blockchain_core::{
    Amount, BlockchainResult, Contract, ContractContext, ContractManager, ContractResponse,
    XMReader, XTokenManager,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const XTOKEN_CONTRACT: &str = "$xtoken";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenInfo {
    name: String,
    total_supply: Amount,
    creator: String,
}

fn token_key(name: &str) -> String {
    format!("token_{}", name)
}

fn balance_key(name: &str, address: &str) -> String {
    format!("balance_{}_{}", name, address)
}

fn valid_token_name(name: &str) -> bool {
    (1..=32).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// `$xtoken`: `NewToken(name, total_supply)`, `Transfer(name, to, amount)` and
/// `Balance(name, address)`
pub struct XTokenContract;

impl XTokenContract {
    fn balance(ctx: &mut dyn ContractContext, name: &str, address: &str) -> BlockchainResult<Amount> {
        Ok(store::get_json(ctx, XTOKEN_CONTRACT, &balance_key(name, address))?.unwrap_or_default())
    }

    fn new_token(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let Some(name) = store::arg_str(ctx, "name").filter(|n| valid_token_name(n)) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad token name"));
        };
        let Some(total_supply) = store::arg_amount(ctx, "total_supply").filter(|a| !a.is_zero()) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad total_supply"));
        };
        if ctx.get_object(XTOKEN_CONTRACT, token_key(&name).as_bytes())?.is_some() {
            return Ok(ContractResponse::error(STATUS_CONFLICT, format!("token {} already exists", name)));
        }

        let creator = ctx.initiator().to_string();
        store::put_json(ctx, XTOKEN_CONTRACT, &balance_key(&name, &creator), &total_supply)?;
        let info = TokenInfo { name: name.clone(), total_supply, creator };
        let body = store::put_json(ctx, XTOKEN_CONTRACT, &token_key(&name), &info)?;
        Ok(ContractResponse::ok(body))
    }

    fn transfer(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let (Some(name), Some(to), Some(amount)) = (
            store::arg_str(ctx, "name"),
            store::arg_str(ctx, "to"),
            store::arg_amount(ctx, "amount"),
        ) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "transfer needs name, to and amount"));
        };
        if ctx.get_object(XTOKEN_CONTRACT, token_key(&name).as_bytes())?.is_none() {
            return Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("token {} not found", name)));
        }

        let from = ctx.initiator().to_string();
        let Some(rest) = Self::balance(ctx, &name, &from)?.checked_sub(&amount) else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("insufficient {}", name)));
        };
        store::put_json(ctx, XTOKEN_CONTRACT, &balance_key(&name, &from), &rest)?;
        let received = &Self::balance(ctx, &name, &to)? + &amount;
        store::put_json(ctx, XTOKEN_CONTRACT, &balance_key(&name, &to), &received)?;
        Ok(ContractResponse::ok(rest.to_string()))
    }
}

impl Contract for XTokenContract {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        match method {
            "NewToken" => Self::new_token(ctx),
            "Transfer" => Self::transfer(ctx),
            "Balance" => {
                let Some(name) = store::arg_str(ctx, "name") else {
                    return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "missing name"));
                };
                let address = store::arg_str(ctx, "address").unwrap_or_else(|| ctx.initiator().to_string());
                Ok(ContractResponse::ok(Self::balance(ctx, &name, &address)?.to_string()))
            }
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}

/// Auxiliary token balances as committed by `$xtoken`
pub struct XTokenKernel {
    xm_reader: Arc<dyn XMReader>,
}

impl XTokenKernel {
    /// Registers `$xtoken` into `contracts`
    pub fn new(contracts: &dyn ContractManager, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<Self>> {
        contracts.register_kernel_contract(XTOKEN_CONTRACT, Arc::new(XTokenContract))?;
        Ok(Arc::new(Self { xm_reader }))
    }
}

impl XTokenManager for XTokenKernel {
    fn balance(&self, token: &str, address: &str) -> BlockchainResult<Amount> {
        Ok(store::read_json(self.xm_reader.as_ref(), XTOKEN_CONTRACT, &balance_key(token, address))?.unwrap_or_default())
    }
}
