// smart-contracts/tests/manager_test.rs

use blockchain_core::{
    Amount, BlockchainError, BlockchainResult, Contract, ContractContext, ContractManager,
    ContractResponse, ContextConfig, ResourceLimits, SandboxConfig, StateSandbox, TxInput,
    TxOutput, UtxoReader, VersionedData, XMReader, KERNEL_MODULE, NATIVE_MODULE,
};
use smart_contracts::{NativeContractManager, DEPLOY_CONTRACT};
use std::collections::BTreeMap;
use std::sync::Arc;

struct EmptyState {
    utxos: Vec<TxInput>,
}

impl XMReader for EmptyState {
    fn get(&self, _bucket: &str, _key: &[u8]) -> BlockchainResult<Option<VersionedData>> {
        Ok(None)
    }
}

impl UtxoReader for EmptyState {
    fn list_utxos(&self, address: &str) -> BlockchainResult<Vec<TxInput>> {
        Ok(self.utxos.iter().filter(|u| u.from_addr == address).cloned().collect())
    }
}

fn setup(utxos: Vec<TxInput>) -> (NativeContractManager, Arc<dyn StateSandbox>) {
    let state = Arc::new(EmptyState { utxos });
    let manager = NativeContractManager::new(state.clone()).unwrap();
    let sandbox = manager
        .new_state_sandbox(&SandboxConfig { xm_reader: state.clone(), utxo_reader: state })
        .unwrap();
    (manager, sandbox)
}

fn context(sandbox: &Arc<dyn StateSandbox>, module: &str, contract: &str) -> ContextConfig {
    ContextConfig {
        state: sandbox.clone(),
        initiator: "alice".into(),
        auth_require: Vec::new(),
        module: module.into(),
        contract_name: contract.into(),
        resource_limits: ResourceLimits::MAX,
        transfer_amount: None,
    }
}

fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.as_bytes().to_vec())).collect()
}

fn call(
    manager: &NativeContractManager,
    config: ContextConfig,
    method: &str,
    pairs: &[(&str, &str)],
) -> BlockchainResult<ContractResponse> {
    let mut ctx = manager.new_context(config)?;
    let response = ctx.invoke(method, &args(pairs));
    ctx.release()?;
    response
}

fn deploy(manager: &NativeContractManager, sandbox: &Arc<dyn StateSandbox>, name: &str, code: &str) {
    let response = call(
        manager,
        context(sandbox, KERNEL_MODULE, DEPLOY_CONTRACT),
        "Deploy",
        &[("contract_name", name), ("code", code)],
    )
    .unwrap();
    assert!(!response.is_error(), "{}", response.message);
}

#[test]
fn test_deploy_then_call_in_one_sandbox() {
    let (manager, sandbox) = setup(Vec::new());
    deploy(&manager, &sandbox, "counter", "counter");

    let response = call(&manager, context(&sandbox, NATIVE_MODULE, "counter"), "Increase", &[("key", "n")]).unwrap();
    assert_eq!(response.body, b"1".to_vec());
    let response = call(&manager, context(&sandbox, NATIVE_MODULE, "counter"), "Increase", &[("key", "n")]).unwrap();
    assert_eq!(response.body, b"2".to_vec());

    sandbox.flush().unwrap();
    let outputs = sandbox.rw_set().tx_outputs_ext();
    assert!(outputs.iter().any(|o| o.bucket == "contract" && o.key == b"counter.desc".to_vec()));
    assert!(outputs.iter().any(|o| o.bucket == "counter" && o.value == b"2".to_vec()));
}

#[test]
fn test_deploy_twice_is_a_client_error() {
    let (manager, sandbox) = setup(Vec::new());
    deploy(&manager, &sandbox, "counter", "counter");

    let response = call(
        &manager,
        context(&sandbox, KERNEL_MODULE, DEPLOY_CONTRACT),
        "Deploy",
        &[("contract_name", "counter"), ("code", "counter")],
    )
    .unwrap();
    assert!(response.is_error());
}

#[test]
fn test_get_missing_key_is_not_found() {
    let (manager, sandbox) = setup(Vec::new());
    deploy(&manager, &sandbox, "counter", "counter");

    let response = call(&manager, context(&sandbox, NATIVE_MODULE, "counter"), "Get", &[("key", "x")]).unwrap();
    assert_eq!(response.status, 404);
}

#[test]
fn test_context_errors() {
    let (manager, sandbox) = setup(Vec::new());

    let missing = manager.new_context(context(&sandbox, NATIVE_MODULE, "nothing"));
    assert!(matches!(missing.err(), Some(BlockchainError::ContractNotFound(_))));

    let missing_kernel = manager.new_context(context(&sandbox, KERNEL_MODULE, "$timer_task"));
    assert!(matches!(missing_kernel.err(), Some(BlockchainError::ContractNotFound(_))));

    let unknown = manager.new_context(context(&sandbox, "wasm", "counter"));
    assert!(matches!(unknown.err(), Some(BlockchainError::InvalidParameter(_))));
}

#[test]
fn test_resource_limits_enforced() {
    let (manager, sandbox) = setup(Vec::new());
    deploy(&manager, &sandbox, "counter", "counter");

    let mut config = context(&sandbox, NATIVE_MODULE, "counter");
    config.resource_limits = ResourceLimits { cpu: 1, ..ResourceLimits::MAX };
    let result = call(&manager, config, "Increase", &[("key", "n")]);
    assert!(matches!(result, Err(BlockchainError::ResourceExhausted(_))));

    let mut ctx = manager.new_context(context(&sandbox, NATIVE_MODULE, "counter")).unwrap();
    ctx.invoke("Increase", &args(&[("key", "n")])).unwrap();
    let used = ctx.resource_used();
    assert!(used.cpu > 0 && used.disk > 0);
    ctx.release().unwrap();
    assert!(ctx.invoke("Increase", &args(&[("key", "n")])).is_err(), "released context");
}

#[test]
fn test_vault_deposit_and_withdraw() {
    let utxo = TxInput { ref_txid: vec![1], ref_offset: 0, from_addr: "alice".into(), amount: Amount::from_u64(100) };
    let (manager, sandbox) = setup(vec![utxo.clone()]);
    deploy(&manager, &sandbox, "vault", "vault");

    let mut config = context(&sandbox, NATIVE_MODULE, "vault");
    config.transfer_amount = Some(Amount::from_u64(40));
    let response = call(&manager, config, "Deposit", &[]).unwrap();
    assert_eq!(response.body, b"40".to_vec());

    let response = call(&manager, context(&sandbox, NATIVE_MODULE, "vault"), "Withdraw", &[("amount", "50")]).unwrap();
    assert!(response.is_error(), "more than deposited");

    sandbox.flush().unwrap();
    let utxo_rw_set = sandbox.utxo_rw_set();
    assert_eq!(utxo_rw_set.rset, vec![utxo]);
    assert_eq!(
        utxo_rw_set.wset,
        vec![
            TxOutput { to_addr: "vault".into(), amount: Amount::from_u64(40) },
            TxOutput { to_addr: "alice".into(), amount: Amount::from_u64(60) },
        ]
    );
}

struct Intruder;

impl Contract for Intruder {
    fn invoke(&self, ctx: &mut dyn ContractContext, _method: &str) -> BlockchainResult<ContractResponse> {
        ctx.put_object("other", b"k", b"v".to_vec())?;
        Ok(ContractResponse::ok(Vec::new()))
    }
}

#[test]
fn test_kernel_contracts_may_write_any_bucket() {
    let (manager, sandbox) = setup(Vec::new());
    manager.register_kernel_contract("$intruder", Arc::new(Intruder)).unwrap();
    assert!(manager.register_kernel_contract("$intruder", Arc::new(Intruder)).is_err());
    assert!(manager.register_kernel_contract("intruder", Arc::new(Intruder)).is_err());

    call(&manager, context(&sandbox, KERNEL_MODULE, "$intruder"), "Run", &[]).unwrap();
    assert_eq!(manager.kernel_contracts(), vec!["$contract".to_string(), "$intruder".to_string()]);
}

#[test]
fn test_native_code_cannot_write_foreign_bucket() {
    let state = Arc::new(EmptyState { utxos: Vec::new() });
    let mut registry = smart_contracts::NativeRegistry::new();
    registry.register("intruder", Arc::new(Intruder));
    let manager =
        NativeContractManager::with_registry(state.clone(), registry, smart_contracts::ResourceConfig::default())
            .unwrap();
    let sandbox = manager
        .new_state_sandbox(&SandboxConfig { xm_reader: state.clone(), utxo_reader: state })
        .unwrap();
    deploy(&manager, &sandbox, "intruder", "intruder");

    let result = call(&manager, context(&sandbox, NATIVE_MODULE, "intruder"), "Run", &[]);
    assert!(matches!(result, Err(BlockchainError::Forbidden(_))));
}
