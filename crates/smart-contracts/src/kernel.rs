// smart-contracts/src/kernel.rs

use blockchain_core::{
    contract_desc_key, BlockchainResult, Contract, ContractContext, ContractDesc, ContractResponse,
    CONTRACT_BUCKET, NATIVE_MODULE,
};

/// Name of the kernel contract deploying native contracts
pub const DEPLOY_CONTRACT: &str = "$contract";

/// `$contract`: `Deploy(contract_name, code)` and `Query(contract_name)`
pub struct DeployContract {
    codes: Vec<String>,
}

impl DeployContract {
    /// `codes` are the native code names a deployment may pick
    pub fn new(codes: Vec<String>) -> Self {
        Self { codes }
    }

    fn valid_name(name: &str) -> bool {
        (2..=64).contains(&name.len())
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
    }

    fn deploy(&self, ctx: &mut dyn ContractContext) -> BlockchainResult<ContractResponse> {
        let name = ctx.arg("contract_name").and_then(|v| std::str::from_utf8(v).ok()).unwrap_or_default().to_string();
        let code = ctx.arg("code").and_then(|v| std::str::from_utf8(v).ok()).unwrap_or_default().to_string();

        if !Self::valid_name(&name) {
            return Ok(ContractResponse::error(400, format!("invalid contract name {:?}", name)));
        }
        if !self.codes.contains(&code) {
            return Ok(ContractResponse::error(400, format!("unknown native code {:?}", code)));
        }

        let key = contract_desc_key(&name);
        if ctx.get_object(CONTRACT_BUCKET, &key)?.is_some() {
            return Ok(ContractResponse::error(409, format!("contract {} already exists", name)));
        }

        let desc = ContractDesc {
            contract_name: name,
            module: NATIVE_MODULE.to_string(),
            code,
            initiator: ctx.initiator().to_string(),
        };
        let body = serde_json::to_vec(&desc)?;
        ctx.put_object(CONTRACT_BUCKET, &key, body.clone())?;
        Ok(ContractResponse::ok(body))
    }
}

impl Contract for DeployContract {
    fn invoke(&self, ctx: &mut dyn ContractContext, method: &str) -> BlockchainResult<ContractResponse> {
        match method {
            "Deploy" => self.deploy(ctx),
            "Query" => {
                let name = ctx.arg("contract_name").unwrap_or_default().to_vec();
                let name = String::from_utf8_lossy(&name).into_owned();
                match ctx.get_object(CONTRACT_BUCKET, &contract_desc_key(&name))? {
                    Some(desc) => Ok(ContractResponse::ok(desc)),
                    None => Ok(ContractResponse::error(404, format!("contract {} not found", name))),
                }
            }
            other => Ok(ContractResponse::error(400, format!("unknown method {}", other))),
        }
    }
}
