// engine/tests/executor_test.rs

mod common;

use blockchain_core::{Amount, InvokeRequest, InvokeResponse, ResourceLimits, KERNEL_MODULE, NATIVE_MODULE};
use common::*;
use engine::{CallContext, Chain, EngineError};
use std::sync::atomic::Ordering;

struct Fixture {
    node: Node,
    agent: MockAgent,
    chain: Chain,
}

impl Fixture {
    fn new() -> Self {
        let node = Node::new();
        let agent = node.agent(false);
        let chain = Chain::load_with_agent(node.engine.clone(), CHAIN, &agent).unwrap();
        for name in ["counter", "vault", BROKEN_CONTRACT] {
            agent.state.deploy(name, NATIVE_MODULE);
        }
        Self { node, agent, chain }
    }

    fn reserve(&self, requests: Vec<InvokeRequest>) {
        *self.agent.state.reserved.lock() = requests;
    }

    fn pre_exec(&self, requests: Vec<InvokeRequest>) -> Result<InvokeResponse, EngineError> {
        self.chain.pre_exec(&CallContext::new("pre-exec"), requests, "alice", &[])
    }

    fn flushes(&self) -> usize {
        count(&self.agent.contract.flushes)
    }

    fn releases(&self) -> usize {
        count(&self.agent.contract.releases)
    }
}

fn user(contract: &str, method: &str) -> InvokeRequest {
    InvokeRequest::new(contract, method)
}

fn reserved(contract: &str, method: &str) -> InvokeRequest {
    InvokeRequest::new(contract, method).with_module(KERNEL_MODULE)
}

/// Gas of one mock call at a rate of one unit per gas
const CALL_GAS: u64 = 15;

#[test]
fn test_reserved_requests_are_free() {
    let fx = Fixture::new();
    fx.reserve(vec![reserved("$timer_task", METHOD_OK), reserved("$acl", METHOD_OK)]);

    let response = fx
        .pre_exec(vec![user("counter", METHOD_OK), user("vault", METHOD_OK)])
        .unwrap();

    assert_eq!(response.gas_used, 2 * CALL_GAS);
    assert_eq!(response.requests.len(), 4);
    assert_eq!(response.responses.len(), 4);
    assert_eq!(response.requests[0].contract_name, "$timer_task");
    assert!(response
        .requests
        .iter()
        .all(|r| r.resource_limits == Some(CALL_USAGE)));
    assert_eq!(response.response[2], b"counter".to_vec());

    assert_eq!(fx.agent.contract.sandboxes.load(Ordering::SeqCst), 1, "one sandbox per batch");
    assert_eq!(fx.flushes(), 1);
    assert_eq!(fx.releases(), 4);
    assert_eq!(response.outputs.len(), 4);
}

#[test]
fn test_missing_reserved_contract_is_skipped() {
    let fx = Fixture::new();
    fx.agent.contract.missing.lock().insert("$timer_task".into());
    fx.reserve(vec![reserved("$timer_task", METHOD_OK)]);

    let response = fx.pre_exec(vec![user("counter", METHOD_OK)]).unwrap();

    assert_eq!(response.requests.len(), 2);
    assert_eq!(response.requests[0], reserved("$timer_task", METHOD_OK), "kept unchanged");
    assert_eq!(response.responses.len(), 1);
    assert_eq!(response.gas_used, CALL_GAS);
    assert_eq!(fx.releases(), 1);
}

#[test]
fn test_missing_user_contract_fails() {
    let fx = Fixture::new();
    fx.agent.contract.missing.lock().insert("counter".into());

    let err = fx.pre_exec(vec![user("counter", METHOD_OK)]).unwrap_err();
    assert!(matches!(err, EngineError::ExecutionContext { .. }));

    let err = fx.pre_exec(vec![user(BROKEN_CONTRACT, METHOD_OK)]).unwrap_err();
    assert!(matches!(err, EngineError::ExecutionContext { .. }));
    assert_eq!(err.label(), "NewContextFailed");
    assert_eq!(fx.flushes(), 0);
}

#[test]
fn test_failed_invoke_discards_batch() {
    let fx = Fixture::new();
    fx.reserve(vec![reserved("$timer_task", METHOD_OK)]);

    let err = fx
        .pre_exec(vec![user("counter", METHOD_OK), user("vault", METHOD_FAIL), user("counter", METHOD_OK)])
        .unwrap_err();

    match err {
        EngineError::Invocation { contract, method, .. } => {
            assert_eq!(contract, "vault");
            assert_eq!(method, METHOD_FAIL);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(fx.flushes(), 0, "sandbox never flushed");
    assert_eq!(fx.releases(), 3, "every created context released");
    assert_eq!(fx.node.metrics.invoke_count(CHAIN, NATIVE_MODULE, "vault", METHOD_FAIL, "InvokeError"), 1);
}

#[test]
fn test_reserved_client_error_is_fatal() {
    let fx = Fixture::new();
    fx.reserve(vec![reserved("$acl", METHOD_REJECT)]);

    let err = fx.pre_exec(vec![user("counter", METHOD_OK)]).unwrap_err();
    assert!(matches!(err, EngineError::Invocation { .. }));
    assert_eq!(fx.releases(), 1);
    assert_eq!(fx.flushes(), 0);
}

#[test]
fn test_user_client_error_is_returned() {
    let fx = Fixture::new();

    let response = fx.pre_exec(vec![user("counter", METHOD_REJECT)]).unwrap();
    assert_eq!(response.responses[0].status, 403);
    assert_eq!(response.gas_used, CALL_GAS);
}

#[test]
fn test_empty_batch() {
    let fx = Fixture::new();

    assert_eq!(fx.pre_exec(Vec::new()).unwrap(), InvokeResponse::default());
    assert_eq!(fx.pre_exec(vec![InvokeRequest::default()]).unwrap(), InvokeResponse::default());
    assert_eq!(fx.agent.contract.sandboxes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_placeholders_are_skipped() {
    let fx = Fixture::new();

    let response = fx
        .pre_exec(vec![
            InvokeRequest::default(),
            user("counter", METHOD_OK),
            InvokeRequest::default().with_arg("key", "stray"),
        ])
        .unwrap();
    assert_eq!(response.requests.len(), 1);
    assert_eq!(fx.releases(), 1);
}

#[test]
fn test_unknown_contract_module() {
    let fx = Fixture::new();

    let err = fx.pre_exec(vec![user("ghost", METHOD_OK)]).unwrap_err();
    assert!(matches!(err, EngineError::Parameter(_)));
    assert_eq!(fx.flushes(), 0);
    assert_eq!(fx.releases(), 0);
}

#[test]
fn test_sandbox_failure() {
    let fx = Fixture::new();
    fx.agent.contract.fail_sandbox.store(true, Ordering::SeqCst);

    let err = fx.pre_exec(vec![user("counter", METHOD_OK)]).unwrap_err();
    assert!(matches!(err, EngineError::SandboxCreation(_)));
}

#[test]
fn test_transfer_goes_to_target_only() {
    let fx = Fixture::new();

    fx.pre_exec(vec![user("counter", METHOD_OK), user("vault", METHOD_OK).with_amount("5")])
        .unwrap();

    let transfers = fx.agent.contract.transfers.lock().clone();
    assert_eq!(
        transfers,
        vec![("counter".to_string(), None), ("vault".to_string(), Some(Amount::from_u64(5)))]
    );
}

#[test]
fn test_bad_transfers() {
    let fx = Fixture::new();

    let err = fx
        .pre_exec(vec![user("counter", METHOD_OK).with_amount("1"), user("vault", METHOD_OK).with_amount("2")])
        .unwrap_err();
    assert!(matches!(err, EngineError::Parameter(_)));

    let err = fx.pre_exec(vec![user("vault", METHOD_OK).with_amount("-3")]).unwrap_err();
    assert!(matches!(err, EngineError::Parameter(_)));
    assert_eq!(fx.agent.contract.sandboxes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_invoke_metrics() {
    let fx = Fixture::new();

    fx.pre_exec(vec![user("counter", METHOD_OK), user("counter", METHOD_OK)]).unwrap();
    assert_eq!(fx.node.metrics.invoke_count(CHAIN, NATIVE_MODULE, "counter", METHOD_OK, "OK"), 2);
    assert_eq!(fx.node.metrics.latency_samples(CHAIN, NATIVE_MODULE, "counter", METHOD_OK), 2);
}

#[test]
fn test_missing_logger() {
    let fx = Fixture::new();

    let err = fx
        .chain
        .pre_exec(&CallContext::without_log("r1"), vec![user("counter", METHOD_OK)], "alice", &[])
        .unwrap_err();
    assert!(matches!(err, EngineError::Parameter(_)));
    assert_eq!(fx.agent.contract.sandboxes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_explicit_module_skips_lookup() {
    let fx = Fixture::new();

    let response = fx
        .pre_exec(vec![user("undeployed", METHOD_OK).with_module(NATIVE_MODULE)])
        .unwrap();
    assert_eq!(response.requests[0].resource_limits, Some(CALL_USAGE));
    assert_ne!(CALL_USAGE, ResourceLimits::MAX);
}
