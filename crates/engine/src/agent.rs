// engine/src/agent.rs

use crate::context::EngineCtx;
use blockchain_core::{
    AclManager, BlockchainError, BlockchainResult, ConsensusEngine, ContractManager,
    GovernTokenManager, Ledger, ProposalManager, StateMachine, TimerTaskManager, XMReader,
    XTokenManager,
};
use blockchain_crypto::{new_crypto_client, CryptoClient};
use governance::{AclKernel, GovernTokenKernel, ProposalKernel, TimerTaskKernel, XTokenKernel};
use smart_contracts::NativeContractManager;
use state::State;
use std::sync::Arc;
use tracing::debug;

/// Builds the subsystems of a chain. Tests swap in their own doubles.
pub trait ChainRelyAgent: Send + Sync {
    fn create_ledger(&self, bcname: &str) -> BlockchainResult<Arc<dyn Ledger>>;

    fn create_crypto(&self, crypto_type: &str) -> BlockchainResult<Arc<dyn CryptoClient>>;

    fn create_state(
        &self,
        bcname: &str,
        ledger: Arc<dyn Ledger>,
        crypto: Arc<dyn CryptoClient>,
    ) -> BlockchainResult<Arc<dyn StateMachine>>;

    fn create_contract(&self, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<dyn ContractManager>>;

    fn create_acl(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn AclManager>>;

    fn create_consensus(
        &self,
        ledger: &dyn Ledger,
        crypto: Arc<dyn CryptoClient>,
    ) -> BlockchainResult<Arc<dyn ConsensusEngine>>;

    fn create_govern_token(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn GovernTokenManager>>;

    fn create_proposal(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn ProposalManager>>;

    fn create_timer_task(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn TimerTaskManager>>;

    fn create_xtoken(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn XTokenManager>>;
}

/// Production agent: RocksDB ledger under the data dir, reference state,
/// native contracts, proof-of-authority and the kernel governance contracts
pub struct DefaultRelyAgent {
    engine: Arc<EngineCtx>,
}

impl DefaultRelyAgent {
    pub fn new(engine: Arc<EngineCtx>) -> Self {
        Self { engine }
    }
}

impl ChainRelyAgent for DefaultRelyAgent {
    fn create_ledger(&self, bcname: &str) -> BlockchainResult<Arc<dyn Ledger>> {
        let data_path = self.engine.env.data_path();
        let ledger = storage::open_ledger(&data_path, bcname)
            .map_err(|e| BlockchainError::LedgerError(format!("open ledger {}: {}", bcname, e)))?;
        debug!(chain = bcname, path = %data_path.display(), "Ledger opened");
        Ok(Arc::new(ledger))
    }

    fn create_crypto(&self, crypto_type: &str) -> BlockchainResult<Arc<dyn CryptoClient>> {
        Ok(new_crypto_client(crypto_type)?)
    }

    fn create_state(
        &self,
        bcname: &str,
        ledger: Arc<dyn Ledger>,
        crypto: Arc<dyn CryptoClient>,
    ) -> BlockchainResult<Arc<dyn StateMachine>> {
        Ok(Arc::new(State::new(bcname, ledger, crypto)?))
    }

    fn create_contract(&self, xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<dyn ContractManager>> {
        Ok(Arc::new(NativeContractManager::new(xm_reader)?))
    }

    fn create_acl(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn AclManager>> {
        Ok(AclKernel::new(contract, xm_reader)?)
    }

    fn create_consensus(
        &self,
        ledger: &dyn Ledger,
        crypto: Arc<dyn CryptoClient>,
    ) -> BlockchainResult<Arc<dyn ConsensusEngine>> {
        Ok(consensus::new_consensus(&ledger.genesis().consensus, crypto)?)
    }

    fn create_govern_token(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn GovernTokenManager>> {
        Ok(GovernTokenKernel::new(contract, xm_reader)?)
    }

    fn create_proposal(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn ProposalManager>> {
        Ok(ProposalKernel::new(contract, xm_reader)?)
    }

    fn create_timer_task(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn TimerTaskManager>> {
        Ok(TimerTaskKernel::new(contract, xm_reader)?)
    }

    fn create_xtoken(
        &self,
        contract: &dyn ContractManager,
        xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn XTokenManager>> {
        Ok(XTokenKernel::new(contract, xm_reader)?)
    }
}
