// engine/src/context.rs

use crate::agent::ChainRelyAgent;
use crate::config::{EngineConfig, EnvConfig};
use crate::error::{BringUpStep, EngineError, EngineResult};
use crate::metrics::{MetricsSink, NoopMetrics};
use blockchain_core::{
    AclManager, BlockchainError, ConsensusEngine, ContractManager, GovernTokenManager, Ledger,
    ProposalManager, StateMachine, TimerTaskManager, XTokenManager,
};
use blockchain_crypto::{load_addr_info, AddressInfo, CryptoClient};
use std::sync::Arc;
use tracing::{trace, Span};

/// Settings and process-wide sinks shared by every chain of a node
pub struct EngineCtx {
    pub env: EnvConfig,
    pub config: EngineConfig,
    pub metrics: Arc<dyn MetricsSink>,
}

impl EngineCtx {
    pub fn new(env: EnvConfig, config: EngineConfig) -> Self {
        Self::with_metrics(env, config, Arc::new(NoopMetrics))
    }

    pub fn with_metrics(env: EnvConfig, config: EngineConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { env, config, metrics }
    }
}

/// Caller-supplied scope of one chain call
#[derive(Debug, Clone)]
pub struct CallContext {
    pub request_id: String,
    pub log: Option<Span>,
}

impl CallContext {
    /// Context logging into a `call{request_id}` span
    pub fn new(request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        let log = tracing::debug_span!("call", request_id = %request_id);
        Self {
            request_id,
            log: Some(log),
        }
    }

    pub fn without_log(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            log: None,
        }
    }

    pub fn log(&self) -> EngineResult<&Span> {
        self.log
            .as_ref()
            .ok_or_else(|| EngineError::Parameter(format!("call {} has no logger", self.request_id)))
    }
}

/// Every subsystem of one running chain.
///
/// The state machine holds the managers weakly, so this is what keeps
/// them alive.
pub struct ChainCtx {
    pub engine: Arc<EngineCtx>,
    pub bcname: String,
    pub ledger: Arc<dyn Ledger>,
    pub crypto: Arc<dyn CryptoClient>,
    pub state: Arc<dyn StateMachine>,
    pub address: AddressInfo,
    pub contract: Arc<dyn ContractManager>,
    pub acl: Arc<dyn AclManager>,
    pub consensus: Arc<dyn ConsensusEngine>,
    pub govern_token: Arc<dyn GovernTokenManager>,
    pub proposal: Arc<dyn ProposalManager>,
    pub timer_task: Arc<dyn TimerTaskManager>,
    pub xtoken: Arc<dyn XTokenManager>,
    pub log: Span,
}

fn step_failed(step: BringUpStep) -> impl FnOnce(BlockchainError) -> EngineError {
    move |source| EngineError::Configuration { step, source }
}

impl ChainCtx {
    /// Build every subsystem of `bcname` in dependency order. The first
    /// failing step aborts the bring-up.
    pub fn bring_up(
        engine: Arc<EngineCtx>,
        bcname: &str,
        agent: &dyn ChainRelyAgent,
        log: Span,
    ) -> EngineResult<Self> {
        let enter = log.enter();

        let ledger = agent
            .create_ledger(bcname)
            .map_err(step_failed(BringUpStep::Ledger))?;
        trace!(chain = bcname, "Ledger ready");

        let meta = ledger.meta();
        if meta.root_blockid.is_empty() {
            return Err(EngineError::Configuration {
                step: BringUpStep::CryptoType,
                source: BlockchainError::LedgerError(format!("ledger of {} has no root block", bcname)),
            });
        }
        let mut crypto_type = ledger.crypto_type();
        if crypto_type.is_empty() {
            crypto_type = "default".to_string();
        }

        let crypto = agent
            .create_crypto(&crypto_type)
            .map_err(step_failed(BringUpStep::Crypto))?;
        trace!(chain = bcname, crypto = %crypto_type, "Crypto ready");

        let state = agent
            .create_state(bcname, ledger.clone(), crypto.clone())
            .map_err(step_failed(BringUpStep::State))?;
        trace!(chain = bcname, height = state.meta().height, "State ready");

        let key_path = engine.env.key_path();
        let address = load_addr_info(&key_path, crypto.as_ref())
            .map_err(BlockchainError::from)
            .map_err(step_failed(BringUpStep::NodeAddress))?;
        trace!(chain = bcname, address = %address.address, "Node address loaded");

        let contract = agent
            .create_contract(state.create_xm_reader())
            .map_err(step_failed(BringUpStep::Contract))?;
        state.set_contract_manager(Arc::downgrade(&contract));
        trace!(chain = bcname, "Contract manager ready");

        let acl = agent
            .create_acl(contract.as_ref(), state.create_xm_reader())
            .map_err(step_failed(BringUpStep::Acl))?;
        state.set_acl_manager(Arc::downgrade(&acl));
        trace!(chain = bcname, "Acl manager ready");

        let consensus = agent
            .create_consensus(ledger.as_ref(), crypto.clone())
            .map_err(step_failed(BringUpStep::Consensus))?;
        trace!(chain = bcname, consensus = consensus.name(), "Consensus ready");

        let govern_token = agent
            .create_govern_token(contract.as_ref(), state.create_xm_reader())
            .map_err(step_failed(BringUpStep::GovernToken))?;
        state.set_govern_token_manager(Arc::downgrade(&govern_token));
        trace!(chain = bcname, "Govern token manager ready");

        let proposal = agent
            .create_proposal(contract.as_ref(), state.create_xm_reader())
            .map_err(step_failed(BringUpStep::Proposal))?;
        state.set_proposal_manager(Arc::downgrade(&proposal));
        trace!(chain = bcname, "Proposal manager ready");

        let timer_task = agent
            .create_timer_task(contract.as_ref(), state.create_confirmed_xm_reader())
            .map_err(step_failed(BringUpStep::TimerTask))?;
        state.set_timer_task_manager(Arc::downgrade(&timer_task));
        trace!(chain = bcname, "Timer task manager ready");

        let xtoken = agent
            .create_xtoken(contract.as_ref(), state.create_xm_reader())
            .map_err(step_failed(BringUpStep::XToken))?;
        trace!(chain = bcname, "Xtoken manager ready");

        drop(enter);
        Ok(Self {
            engine,
            bcname: bcname.to_string(),
            ledger,
            crypto,
            state,
            address,
            contract,
            acl,
            consensus,
            govern_token,
            proposal,
            timer_task,
            xtoken,
            log,
        })
    }

    pub fn metrics(&self) -> &dyn MetricsSink {
        self.engine.metrics.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.engine.config
    }
}
