// blockchain-core/src/invoke.rs

use crate::rwset::{TxInputExt, TxOutputExt};
use crate::transaction::{TxInput, TxOutput};
use crate::types::{Amount, Gas, ResourceLimits};
use crate::{BlockchainError, BlockchainResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a successful contract call
pub const STATUS_OK: i32 = 200;

/// Statuses at or above this are client-style failures
pub const STATUS_ERROR_THRESHOLD: i32 = 400;

/// One contract method call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Contract module; empty means "look it up from the contract descriptor"
    #[serde(default)]
    pub module_name: String,
    pub contract_name: String,
    pub method_name: String,
    #[serde(default)]
    pub args: BTreeMap<String, Vec<u8>>,
    /// Resources the call may use; filled with actual usage after pre-execution
    #[serde(default)]
    pub resource_limits: Option<ResourceLimits>,
    /// Decimal amount transferred from the initiator to `contract_name`
    #[serde(default)]
    pub amount: Option<String>,
}

impl InvokeRequest {
    pub fn new(contract_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            method_name: method_name.into(),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    /// A placeholder with nothing to call
    pub fn is_empty(&self) -> bool {
        self.module_name.is_empty() && self.contract_name.is_empty() && self.method_name.is_empty()
    }

    fn transfer_amount(&self) -> Option<&str> {
        self.amount.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Status, message and body returned by a contract method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractResponse {
    pub status: i32,
    pub message: String,
    pub body: Vec<u8>,
}

impl ContractResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            body: body.into(),
        }
    }

    pub fn error(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status >= STATUS_ERROR_THRESHOLD
    }
}

/// Result of executing a batch of requests in one sandbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Gas of the caller's own requests; reserved requests are free
    pub gas_used: Gas,
    pub response: Vec<Vec<u8>>,
    pub inputs: Vec<TxInputExt>,
    pub outputs: Vec<TxOutputExt>,
    pub requests: Vec<InvokeRequest>,
    pub responses: Vec<ContractResponse>,
    pub utxo_inputs: Vec<TxInput>,
    pub utxo_outputs: Vec<TxOutput>,
}

impl InvokeResponse {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
            && self.responses.is_empty()
            && self.inputs.is_empty()
            && self.outputs.is_empty()
            && self.utxo_inputs.is_empty()
            && self.utxo_outputs.is_empty()
    }
}

/// The single value transfer carried by a request batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTransfer {
    pub contract_name: String,
    pub amount: Amount,
}

/// Find the request that carries a transfer amount.
///
/// At most one request of a batch may carry an amount, and it must be a
/// non-negative decimal integer.
pub fn parse_contract_transfer_request(
    requests: &[InvokeRequest],
) -> BlockchainResult<Option<ContractTransfer>> {
    let mut transfer: Option<ContractTransfer> = None;

    for req in requests {
        let Some(raw) = req.transfer_amount() else {
            continue;
        };
        if transfer.is_some() {
            return Err(BlockchainError::InvalidParameter(
                "duplicated contract transfer amount".into(),
            ));
        }
        let amount: Amount = raw.parse().map_err(|_| {
            BlockchainError::InvalidParameter(format!("bad amount in request: {}", raw))
        })?;
        transfer = Some(ContractTransfer {
            contract_name: req.contract_name.clone(),
            amount,
        });
    }

    Ok(transfer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transfer() {
        let reqs = vec![InvokeRequest::new("counter", "Increase")];
        assert_eq!(parse_contract_transfer_request(&reqs).unwrap(), None);
    }

    #[test]
    fn test_single_transfer() {
        let reqs = vec![
            InvokeRequest::new("counter", "Get"),
            InvokeRequest::new("vault", "Deposit").with_amount("100"),
        ];
        let transfer = parse_contract_transfer_request(&reqs).unwrap().unwrap();
        assert_eq!(transfer.contract_name, "vault");
        assert_eq!(transfer.amount, Amount::from_u64(100));
    }

    #[test]
    fn test_duplicated_transfer() {
        let reqs = vec![
            InvokeRequest::new("a", "m").with_amount("1"),
            InvokeRequest::new("b", "m").with_amount("2"),
        ];
        let err = parse_contract_transfer_request(&reqs).unwrap_err();
        assert!(err.to_string().contains("duplicated"));
    }

    #[test]
    fn test_bad_amount() {
        let reqs = vec![InvokeRequest::new("a", "m").with_amount("-3")];
        assert!(matches!(
            parse_contract_transfer_request(&reqs),
            Err(BlockchainError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_blank_amount_is_ignored() {
        let reqs = vec![InvokeRequest::new("a", "m").with_amount("  ")];
        assert_eq!(parse_contract_transfer_request(&reqs).unwrap(), None);
    }

    #[test]
    fn test_empty_request() {
        assert!(InvokeRequest::default().is_empty());
        assert!(!InvokeRequest::new("counter", "Get").is_empty());
        assert!(InvokeRequest::default().with_arg("key", "ignored").is_empty(), "args alone name nothing to call");
    }

    #[test]
    fn test_response_status() {
        assert!(!ContractResponse::ok(b"1".to_vec()).is_error());
        assert!(ContractResponse::error(404, "missing").is_error());
        assert!(!ContractResponse::error(302, "moved").is_error());
    }
}
