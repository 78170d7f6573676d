// smart-contracts/src/native.rs

//! Built-in native contract codes.
//!
//! Both keep their data in the bucket named after the deployed contract.

use blockchain_core::{
    Amount, BlockchainResult, Contract, ContractContext, ContractResponse,
};

const STATUS_BAD_REQUEST: i32 = 400;
const STATUS_NOT_FOUND: i32 = 404;

fn arg_string(ctx: &dyn ContractContext, key: &str) -> Option<String> {
    ctx.arg(key).and_then(|v| String::from_utf8(v.to_vec()).ok())
}

fn parse_u64(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// A named counter per key
pub struct Counter;

impl Counter {
    pub const CODE: &'static str = "counter";
}

impl Contract for Counter {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        let Some(key) = arg_string(ctx, "key") else {
            return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "missing key"));
        };
        let bucket = ctx.contract_name().to_string();

        match method {
            "Increase" => {
                let current = ctx
                    .get_object(&bucket, key.as_bytes())?
                    .and_then(|v| parse_u64(&v))
                    .unwrap_or(0);
                let next = current.saturating_add(1).to_string();
                ctx.put_object(&bucket, key.as_bytes(), next.clone().into_bytes())?;
                Ok(ContractResponse::ok(next))
            }
            "Get" => match ctx.get_object(&bucket, key.as_bytes())? {
                Some(value) => Ok(ContractResponse::ok(value)),
                None => Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("{} not found", key))),
            },
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}

/// Holds coins deposited by callers and pays them back on request
pub struct Vault;

impl Vault {
    pub const CODE: &'static str = "vault";

    fn balance_key(address: &str) -> Vec<u8> {
        format!("balance/{}", address).into_bytes()
    }

    fn balance(ctx: &mut dyn ContractContext, address: &str) -> BlockchainResult<Amount> {
        let bucket = ctx.contract_name().to_string();
        let raw = ctx.get_object(&bucket, &Self::balance_key(address))?;
        Ok(raw
            .and_then(|v| String::from_utf8(v).ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }

    fn set_balance(ctx: &mut dyn ContractContext, address: &str, amount: &Amount) -> BlockchainResult<()> {
        let bucket = ctx.contract_name().to_string();
        ctx.put_object(&bucket, &Self::balance_key(address), amount.to_string().into_bytes())
    }
}

impl Contract for Vault {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        let caller = ctx.initiator().to_string();

        match method {
            "Deposit" => {
                let Some(amount) = ctx.transfer_amount().cloned().filter(|a| !a.is_zero()) else {
                    return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "deposit needs an amount"));
                };
                let balance = &Self::balance(ctx, &caller)? + &amount;
                Self::set_balance(ctx, &caller, &balance)?;
                Ok(ContractResponse::ok(balance.to_string()))
            }
            "Withdraw" => {
                let Some(amount) = arg_string(ctx, "amount").and_then(|s| s.parse::<Amount>().ok()) else {
                    return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "bad amount"));
                };
                let Some(rest) = Self::balance(ctx, &caller)?.checked_sub(&amount) else {
                    return Ok(ContractResponse::error(STATUS_BAD_REQUEST, "insufficient deposit"));
                };
                ctx.transfer(&caller, &amount)?;
                Self::set_balance(ctx, &caller, &rest)?;
                Ok(ContractResponse::ok(rest.to_string()))
            }
            "Balance" => {
                let address = arg_string(ctx, "address").unwrap_or(caller);
                Ok(ContractResponse::ok(Self::balance(ctx, &address)?.to_string()))
            }
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}
