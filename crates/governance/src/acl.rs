// governance/src/acl.rs

use crate::store::{self, STATUS_BAD_REQUEST, STATUS_CONFLICT, STATUS_FORBIDDEN, STATUS_NOT_FOUND};
use blockchain_core::{
    is_account_name, Acl, AclManager, BlockchainResult, Contract, ContractContext, ContractManager,
    ContractResponse, XMReader,
};
use std::sync::Arc;
use tracing::debug;

pub const ACL_CONTRACT: &str = "$acl";

/// `$acl`: `NewAccount`, `SetAccountAcl` and `QueryAccountAcl`
pub struct AclContract;

impl AclContract {
    fn parse_acl(ctx: &dyn ContractContext) -> Result<Acl, ContractResponse> {
        let raw = ctx
            .arg("acl")
            .ok_or_else(|| ContractResponse::error(STATUS_BAD_REQUEST, "missing acl"))?;
        let acl: Acl = serde_json::from_slice(raw)
            .map_err(|e| ContractResponse::error(STATUS_BAD_REQUEST, format!("bad acl: {}", e)))?;
        let total: u64 = acl.aks_weight.values().fold(0u64, |sum, w| sum.saturating_add(*w));
        if acl.threshold == 0 || total < acl.threshold {
            return Err(ContractResponse::error(
                STATUS_BAD_REQUEST,
                format!("acl threshold {} unreachable with weight {}", acl.threshold, total),
            ));
        }
        Ok(acl)
    }

    fn account_name(ctx: &dyn ContractContext) -> Result<String, ContractResponse> {
        match store::arg_str(ctx, "account_name") {
            Some(name) if is_account_name(&name) => Ok(name),
            Some(name) => Err(ContractResponse::error(
                STATUS_BAD_REQUEST,
                format!("invalid account name {}", name),
            )),
            None => Err(ContractResponse::error(STATUS_BAD_REQUEST, "missing account_name")),
        }
    }

    fn new_account(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let (name, acl) = match (Self::account_name(ctx), Self::parse_acl(ctx)) {
            (Ok(name), Ok(acl)) => (name, acl),
            (Err(response), _) | (_, Err(response)) => return Ok(response),
        };
        if ctx.get_object(ACL_CONTRACT, name.as_bytes())?.is_some() {
            return Ok(ContractResponse::error(STATUS_CONFLICT, format!("account {} already exists", name)));
        }
        let body = store::put_json(ctx, ACL_CONTRACT, &name, &acl)?;
        debug!(account = %name, "Account created");
        Ok(ContractResponse::ok(body))
    }

    fn set_account_acl(ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let (name, acl) = match (Self::account_name(ctx), Self::parse_acl(ctx)) {
            (Ok(name), Ok(acl)) => (name, acl),
            (Err(response), _) | (_, Err(response)) => return Ok(response),
        };
        let Some(current) = store::get_json::<Acl>(ctx, ACL_CONTRACT, &name)? else {
            return Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("account {} not found", name)));
        };

        // auth_require entries are `account/address` or a bare address
        let signers: Vec<String> = std::iter::once(ctx.initiator().to_string())
            .chain(ctx.auth_require().iter().map(|entry| {
                entry.rsplit_once('/').map_or(entry.as_str(), |(_, addr)| addr).to_string()
            }))
            .collect();
        if !current.is_satisfied_by(signers.iter().map(String::as_str)) {
            return Ok(ContractResponse::error(
                STATUS_FORBIDDEN,
                format!("signers do not satisfy the acl of {}", name),
            ));
        }

        let body = store::put_json(ctx, ACL_CONTRACT, &name, &acl)?;
        Ok(ContractResponse::ok(body))
    }
}

impl Contract for AclContract {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        match method {
            "NewAccount" => Self::new_account(ctx),
            "SetAccountAcl" => Self::set_account_acl(ctx),
            "QueryAccountAcl" => {
                let name = match Self::account_name(ctx) {
                    Ok(name) => name,
                    Err(response) => return Ok(response),
                };
                match ctx.get_object(ACL_CONTRACT, name.as_bytes())? {
                    Some(acl) => Ok(ContractResponse::ok(acl)),
                    None => Ok(ContractResponse::error(STATUS_NOT_FOUND, format!("account {} not found", name))),
                }
            }
            other => Ok(ContractResponse::error(STATUS_BAD_REQUEST, format!("unknown method {}", other))),
        }
    }
}

/// Account ACLs as committed by `$acl`
pub struct AclKernel {
    xm_reader: Arc<dyn XMReader>,
}

impl AclKernel {
    /// Registers `$acl` into `contracts`
    pub fn new(contracts: &dyn ContractManager, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<Self>> {
        contracts.register_kernel_contract(ACL_CONTRACT, Arc::new(AclContract))?;
        Ok(Arc::new(Self { xm_reader }))
    }
}

impl AclManager for AclKernel {
    fn get_account_acl(&self, account: &str) -> BlockchainResult<Option<Acl>> {
        store::read_json(self.xm_reader.as_ref(), ACL_CONTRACT, account)
    }
}
