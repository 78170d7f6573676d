// engine/tests/common/mod.rs

//! Test doubles for every chain collaborator.
//!
//! They count the calls the engine makes (sandbox flushes, context
//! releases, state machine calls) and can fail any bring-up step.

#![allow(dead_code)]

use blockchain_core::{
    Acl, AclManager, Amount, Block, BlockNumber, BlockchainError, BlockchainResult, ConsensusEngine,
    Contract, ContractDesc, ContractManager, ContractResponse, ContextConfig, ExecutionContext,
    GasPrice, GenesisConfig, GovernTokenManager, InvokeRequest, Ledger, LedgerMeta, Proposal,
    ProposalManager, PureData, ResourceLimits, RwSet, SandboxConfig, StateMachine, StateMeta,
    StateSandbox, TimerTaskManager, Transaction, TxInput, TxStatus, UtxoReader, UtxoRwSet,
    VersionedData, XMReader, XTokenManager,
};
use blockchain_crypto::{new_crypto_client, save_addr_info, CryptoClient, KeyPair};
use engine::{BringUpStep, ChainRelyAgent, EngineConfig, EngineCtx, EnvConfig, InMemoryMetrics};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tempfile::TempDir;

pub const CHAIN: &str = "xuper";

/// Methods understood by [`MockContractManager`] contexts
pub const METHOD_OK: &str = "Ok";
pub const METHOD_FAIL: &str = "Fail";
pub const METHOD_REJECT: &str = "Reject";

/// Contract whose context cannot be built for a reason other than absence
pub const BROKEN_CONTRACT: &str = "broken";

/// Resources every successful mock call reports
pub const CALL_USAGE: ResourceLimits = ResourceLimits {
    cpu: 10,
    memory: 0,
    disk: 5,
    xfee: 0,
};

pub fn gas_price() -> GasPrice {
    GasPrice {
        cpu_rate: 1,
        mem_rate: 1,
        disk_rate: 1,
        xfee_rate: 1,
    }
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub struct MockLedger {
    genesis: GenesisConfig,
    meta: Mutex<LedgerMeta>,
    blocks: Mutex<HashMap<Vec<u8>, Block>>,
    pub closed: AtomicBool,
}

impl MockLedger {
    pub fn new(no_fee: bool) -> Self {
        Self {
            genesis: GenesisConfig {
                crypto: String::new(),
                no_fee,
                gas_price: gas_price(),
                ..Default::default()
            },
            meta: Mutex::new(LedgerMeta {
                root_blockid: vec![1],
                tip_blockid: vec![1],
                trunk_height: 0,
            }),
            blocks: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// A ledger without a root block
    pub fn empty() -> Self {
        let ledger = Self::new(false);
        *ledger.meta.lock() = LedgerMeta::default();
        ledger
    }
}

impl Ledger for MockLedger {
    fn genesis(&self) -> &GenesisConfig {
        &self.genesis
    }

    fn meta(&self) -> LedgerMeta {
        self.meta.lock().clone()
    }

    fn exist_block(&self, blockid: &[u8]) -> BlockchainResult<bool> {
        Ok(self.blocks.lock().contains_key(blockid))
    }

    fn query_block(&self, blockid: &[u8]) -> BlockchainResult<Block> {
        self.blocks
            .lock()
            .get(blockid)
            .cloned()
            .ok_or_else(|| BlockchainError::BlockNotFound(hex::encode(blockid)))
    }

    fn query_block_by_height(&self, height: BlockNumber) -> BlockchainResult<Block> {
        self.blocks
            .lock()
            .values()
            .find(|b| b.height() == height)
            .cloned()
            .ok_or_else(|| BlockchainError::BlockNotFound(height.to_string()))
    }

    fn query_transaction(&self, _txid: &[u8]) -> BlockchainResult<Option<Transaction>> {
        Ok(None)
    }

    fn confirm_block(&self, block: &Block) -> BlockchainResult<()> {
        let mut meta = self.meta.lock();
        meta.tip_blockid = block.blockid.clone();
        meta.trunk_height = block.height();
        self.blocks.lock().insert(block.blockid.clone(), block.clone());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Nothing stored, nothing spendable
pub struct EmptyReader;

impl XMReader for EmptyReader {
    fn get(&self, _bucket: &str, _key: &[u8]) -> BlockchainResult<Option<VersionedData>> {
        Ok(None)
    }
}

impl UtxoReader for EmptyReader {
    fn list_utxos(&self, _address: &str) -> BlockchainResult<Vec<TxInput>> {
        Ok(Vec::new())
    }
}

/// How [`MockState::do_tx`] answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Conflict,
    /// Report the transaction as already pending
    Duplicate,
}

/// How [`MockState::play_block`] answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Play {
    Apply,
    Fail,
}

pub struct MockState {
    pub ledger: Arc<MockLedger>,
    pub reserved: Mutex<Vec<InvokeRequest>>,
    pub descs: Mutex<HashMap<String, ContractDesc>>,
    pub verify_error: Mutex<Option<String>>,
    pub admission: Mutex<Admission>,
    pub play: Mutex<Play>,
    pending: Mutex<Vec<Transaction>>,
    meta: Mutex<StateMeta>,
    pub query_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub do_tx_calls: AtomicUsize,
    pub play_calls: AtomicUsize,
    pub closed: AtomicBool,
    contract: Mutex<Option<Weak<dyn ContractManager>>>,
    pub registrations: Mutex<Vec<&'static str>>,
}

impl MockState {
    pub fn new(ledger: Arc<MockLedger>) -> Self {
        let ledger_meta = ledger.meta();
        Self {
            reserved: Mutex::new(Vec::new()),
            descs: Mutex::new(HashMap::new()),
            verify_error: Mutex::new(None),
            admission: Mutex::new(Admission::Accept),
            play: Mutex::new(Play::Apply),
            pending: Mutex::new(Vec::new()),
            meta: Mutex::new(StateMeta {
                gas_price: ledger.genesis().gas_price,
                no_fee: ledger.no_fee(),
                height: ledger_meta.trunk_height,
                tip_blockid: ledger_meta.tip_blockid,
            }),
            query_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            do_tx_calls: AtomicUsize::new(0),
            play_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            contract: Mutex::new(None),
            registrations: Mutex::new(Vec::new()),
            ledger,
        }
    }

    /// Declare `contract_name` as deployed under `module`
    pub fn deploy(&self, contract_name: &str, module: &str) {
        self.descs.lock().insert(
            contract_name.to_string(),
            ContractDesc {
                contract_name: contract_name.to_string(),
                module: module.to_string(),
                code: contract_name.to_string(),
                initiator: "alice".into(),
            },
        );
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn state_calls(&self) -> usize {
        count(&self.query_calls) + count(&self.verify_calls) + count(&self.do_tx_calls)
    }

    /// The registered contract manager, if it is still alive
    pub fn contract_manager(&self) -> Option<Arc<dyn ContractManager>> {
        self.contract.lock().as_ref().and_then(Weak::upgrade)
    }
}

impl StateMachine for MockState {
    fn create_xm_reader(&self) -> Arc<dyn XMReader> {
        Arc::new(EmptyReader)
    }

    fn create_utxo_reader(&self) -> Arc<dyn UtxoReader> {
        Arc::new(EmptyReader)
    }

    fn get_reserved_contract_requests(&self, _requests: &[InvokeRequest]) -> BlockchainResult<Vec<InvokeRequest>> {
        Ok(self.reserved.lock().clone())
    }

    fn get_contract_desc(&self, contract_name: &str) -> BlockchainResult<ContractDesc> {
        self.descs
            .lock()
            .get(contract_name)
            .cloned()
            .ok_or_else(|| BlockchainError::ContractNotFound(contract_name.to_string()))
    }

    fn verify_tx(&self, _tx: &Transaction) -> BlockchainResult<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match self.verify_error.lock().clone() {
            Some(reason) => Err(BlockchainError::InvalidTransaction(reason)),
            None => Ok(()),
        }
    }

    fn do_tx(&self, tx: &Transaction) -> BlockchainResult<()> {
        self.do_tx_calls.fetch_add(1, Ordering::SeqCst);
        match *self.admission.lock() {
            Admission::Accept => {}
            Admission::Conflict => return Err(BlockchainError::Conflict(tx.txid_hex())),
            Admission::Duplicate => return Err(BlockchainError::AlreadyInUnconfirmed(tx.txid_hex())),
        }
        let mut pending = self.pending.lock();
        if pending.iter().any(|p| p.txid == tx.txid) {
            return Err(BlockchainError::AlreadyInUnconfirmed(tx.txid_hex()));
        }
        pending.push(tx.clone());
        Ok(())
    }

    fn query_tx(&self, txid: &[u8]) -> BlockchainResult<Option<(Transaction, TxStatus)>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pending
            .lock()
            .iter()
            .find(|tx| tx.txid == txid)
            .map(|tx| (tx.clone(), TxStatus::Unconfirmed)))
    }

    fn unconfirmed_txs(&self, limit: usize) -> Vec<Transaction> {
        self.pending.lock().iter().take(limit).cloned().collect()
    }

    fn play_block(&self, block: &Block) -> BlockchainResult<()> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if *self.play.lock() == Play::Fail {
            return Err(BlockchainError::StateError("disk full".into()));
        }
        self.ledger.confirm_block(block)?;
        self.pending.lock().retain(|tx| !block.transactions.contains(tx));
        let mut meta = self.meta.lock();
        meta.height = block.height();
        meta.tip_blockid = block.blockid.clone();
        Ok(())
    }

    fn meta(&self) -> StateMeta {
        self.meta.lock().clone()
    }

    fn set_contract_manager(&self, manager: Weak<dyn ContractManager>) {
        *self.contract.lock() = Some(manager);
        self.registrations.lock().push("contract");
    }

    fn set_acl_manager(&self, _manager: Weak<dyn AclManager>) {
        self.registrations.lock().push("acl");
    }

    fn set_govern_token_manager(&self, _manager: Weak<dyn GovernTokenManager>) {
        self.registrations.lock().push("govern_token");
    }

    fn set_proposal_manager(&self, _manager: Weak<dyn ProposalManager>) {
        self.registrations.lock().push("proposal");
    }

    fn set_timer_task_manager(&self, _manager: Weak<dyn TimerTaskManager>) {
        self.registrations.lock().push("timer_task");
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Sandbox that records the keys mock calls write
pub struct MockSandbox {
    writes: Mutex<Vec<PureData>>,
    flushed: Mutex<RwSet>,
    flushes: Arc<AtomicUsize>,
}

impl StateSandbox for MockSandbox {
    fn get(&self, _bucket: &str, _key: &[u8]) -> BlockchainResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn put(&self, bucket: &str, key: &[u8], value: Vec<u8>) -> BlockchainResult<()> {
        self.writes.lock().push(PureData {
            bucket: bucket.to_string(),
            key: key.to_vec(),
            value,
        });
        Ok(())
    }

    fn transfer(&self, _from: &str, _to: &str, _amount: &Amount) -> BlockchainResult<()> {
        Ok(())
    }

    fn flush(&self) -> BlockchainResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        *self.flushed.lock() = RwSet {
            rset: Vec::new(),
            wset: self.writes.lock().clone(),
        };
        Ok(())
    }

    fn rw_set(&self) -> RwSet {
        self.flushed.lock().clone()
    }

    fn utxo_rw_set(&self) -> UtxoRwSet {
        UtxoRwSet::default()
    }
}

/// Context whose behavior is picked by the method name
pub struct MockContext {
    config: ContextConfig,
    releases: Arc<AtomicUsize>,
    transfers: Arc<Mutex<Vec<(String, Option<Amount>)>>>,
}

impl ExecutionContext for MockContext {
    fn invoke(&mut self, method: &str, _args: &BTreeMap<String, Vec<u8>>) -> BlockchainResult<ContractResponse> {
        self.transfers
            .lock()
            .push((self.config.contract_name.clone(), self.config.transfer_amount.clone()));
        match method {
            METHOD_OK => {
                self.config
                    .state
                    .put(&self.config.contract_name, method.as_bytes(), b"done".to_vec())?;
                Ok(ContractResponse::ok(self.config.contract_name.clone()))
            }
            METHOD_REJECT => Ok(ContractResponse::error(403, "rejected")),
            _ => Err(BlockchainError::ContractError(format!("{} failed", method))),
        }
    }

    fn resource_used(&self) -> ResourceLimits {
        CALL_USAGE
    }

    fn release(&mut self) -> BlockchainResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockContractManager {
    /// Contracts whose contexts fail with `ContractNotFound`
    pub missing: Mutex<HashSet<String>>,
    pub sandboxes: AtomicUsize,
    pub flushes: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
    /// Contract name and transfer amount seen by each invoke
    pub transfers: Arc<Mutex<Vec<(String, Option<Amount>)>>>,
    pub fail_sandbox: AtomicBool,
}

impl ContractManager for MockContractManager {
    fn new_state_sandbox(&self, _config: &SandboxConfig) -> BlockchainResult<Arc<dyn StateSandbox>> {
        if self.fail_sandbox.load(Ordering::SeqCst) {
            return Err(BlockchainError::StateError("no sandbox".into()));
        }
        self.sandboxes.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockSandbox {
            writes: Mutex::new(Vec::new()),
            flushed: Mutex::new(RwSet::default()),
            flushes: self.flushes.clone(),
        }))
    }

    fn new_context(&self, config: ContextConfig) -> BlockchainResult<Box<dyn ExecutionContext>> {
        if self.missing.lock().contains(&config.contract_name) {
            return Err(BlockchainError::ContractNotFound(config.contract_name));
        }
        if config.contract_name == BROKEN_CONTRACT {
            return Err(BlockchainError::StateError("corrupted contract".into()));
        }
        Ok(Box::new(MockContext {
            config,
            releases: self.releases.clone(),
            transfers: self.transfers.clone(),
        }))
    }

    fn register_kernel_contract(&self, _name: &str, _contract: Arc<dyn Contract>) -> BlockchainResult<()> {
        Ok(())
    }
}

/// Single proposer consensus that can be told to forbid every block
pub struct MockConsensus {
    pub proposer: String,
    pub forbid: AtomicBool,
}

impl ConsensusEngine for MockConsensus {
    fn name(&self) -> &str {
        "mock"
    }

    fn proposer_at(&self, height: BlockNumber) -> Option<String> {
        (height > 0).then(|| self.proposer.clone())
    }

    fn check_block(&self, block: &Block) -> BlockchainResult<()> {
        if self.forbid.load(Ordering::SeqCst) {
            return Err(BlockchainError::Forbidden(format!("block {} not allowed", block.blockid_hex())));
        }
        Ok(())
    }
}

/// Governance managers with nothing in them
pub struct NullManagers;

impl AclManager for NullManagers {
    fn get_account_acl(&self, _account: &str) -> BlockchainResult<Option<Acl>> {
        Ok(None)
    }
}

impl GovernTokenManager for NullManagers {
    fn get_balance(&self, _address: &str) -> BlockchainResult<Amount> {
        Ok(Amount::zero())
    }

    fn total_supply(&self) -> BlockchainResult<Amount> {
        Ok(Amount::zero())
    }
}

impl ProposalManager for NullManagers {
    fn get_proposal(&self, _id: u64) -> BlockchainResult<Option<Proposal>> {
        Ok(None)
    }
}

impl TimerTaskManager for NullManagers {
    fn tasks_at(&self, _height: BlockNumber) -> BlockchainResult<Vec<InvokeRequest>> {
        Ok(Vec::new())
    }
}

impl XTokenManager for NullManagers {
    fn balance(&self, _token: &str, _address: &str) -> BlockchainResult<Amount> {
        Ok(Amount::zero())
    }
}

/// Agent handing out shared doubles, failing at `fail_at` if set
pub struct MockAgent {
    pub ledger: Arc<MockLedger>,
    pub state: Arc<MockState>,
    pub contract: Arc<MockContractManager>,
    pub consensus: Arc<MockConsensus>,
    pub fail_at: Option<BringUpStep>,
    /// Steps in the order they were asked for
    pub steps: Mutex<Vec<BringUpStep>>,
}

impl MockAgent {
    pub fn new(ledger: MockLedger, proposer: String) -> Self {
        let ledger = Arc::new(ledger);
        Self {
            state: Arc::new(MockState::new(ledger.clone())),
            contract: Arc::new(MockContractManager::default()),
            consensus: Arc::new(MockConsensus {
                proposer,
                forbid: AtomicBool::new(false),
            }),
            ledger,
            fail_at: None,
            steps: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, step: BringUpStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    fn step(&self, step: BringUpStep) -> BlockchainResult<()> {
        self.steps.lock().push(step);
        if self.fail_at == Some(step) {
            return Err(BlockchainError::StateError(format!("{} unavailable", step)));
        }
        Ok(())
    }
}

impl ChainRelyAgent for MockAgent {
    fn create_ledger(&self, _bcname: &str) -> BlockchainResult<Arc<dyn Ledger>> {
        self.step(BringUpStep::Ledger)?;
        Ok(self.ledger.clone())
    }

    fn create_crypto(&self, crypto_type: &str) -> BlockchainResult<Arc<dyn CryptoClient>> {
        self.step(BringUpStep::Crypto)?;
        Ok(new_crypto_client(crypto_type)?)
    }

    fn create_state(
        &self,
        _bcname: &str,
        _ledger: Arc<dyn Ledger>,
        _crypto: Arc<dyn CryptoClient>,
    ) -> BlockchainResult<Arc<dyn StateMachine>> {
        self.step(BringUpStep::State)?;
        Ok(self.state.clone())
    }

    fn create_contract(&self, _xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<dyn ContractManager>> {
        self.step(BringUpStep::Contract)?;
        Ok(self.contract.clone())
    }

    fn create_acl(&self, _contract: &dyn ContractManager, _xm_reader: Arc<dyn XMReader>) -> BlockchainResult<Arc<dyn AclManager>> {
        self.step(BringUpStep::Acl)?;
        Ok(Arc::new(NullManagers))
    }

    fn create_consensus(&self, _ledger: &dyn Ledger, _crypto: Arc<dyn CryptoClient>) -> BlockchainResult<Arc<dyn ConsensusEngine>> {
        self.step(BringUpStep::Consensus)?;
        Ok(self.consensus.clone())
    }

    fn create_govern_token(
        &self,
        _contract: &dyn ContractManager,
        _xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn GovernTokenManager>> {
        self.step(BringUpStep::GovernToken)?;
        Ok(Arc::new(NullManagers))
    }

    fn create_proposal(
        &self,
        _contract: &dyn ContractManager,
        _xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn ProposalManager>> {
        self.step(BringUpStep::Proposal)?;
        Ok(Arc::new(NullManagers))
    }

    fn create_timer_task(
        &self,
        _contract: &dyn ContractManager,
        _xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn TimerTaskManager>> {
        self.step(BringUpStep::TimerTask)?;
        Ok(Arc::new(NullManagers))
    }

    fn create_xtoken(
        &self,
        _contract: &dyn ContractManager,
        _xm_reader: Arc<dyn XMReader>,
    ) -> BlockchainResult<Arc<dyn XTokenManager>> {
        self.step(BringUpStep::XToken)?;
        Ok(Arc::new(NullManagers))
    }
}

/// A root directory holding a node key, plus the engine context using it
pub struct Node {
    pub dir: TempDir,
    pub engine: Arc<EngineCtx>,
    pub metrics: Arc<InMemoryMetrics>,
    pub keypair: KeyPair,
    pub address: String,
}

impl Node {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvConfig::with_root(dir.path());
        let keypair = new_crypto_client("default").unwrap().generate_key_pair().unwrap();
        let address = save_addr_info(env.key_path(), &keypair).unwrap().to_string();

        let metrics = Arc::new(InMemoryMetrics::new());
        let engine = Arc::new(EngineCtx::with_metrics(env, config, metrics.clone()));
        Self {
            dir,
            engine,
            metrics,
            keypair,
            address,
        }
    }

    /// Agent whose consensus schedules this node for every height
    pub fn agent(&self, no_fee: bool) -> MockAgent {
        MockAgent::new(MockLedger::new(no_fee), self.address.clone())
    }
}

/// A sealed transaction with one input unless `no_inputs`
pub fn transaction(keypair: &KeyPair, no_inputs: bool) -> Transaction {
    let mut tx = Transaction::new(keypair.address().to_string());
    if !no_inputs {
        tx.tx_inputs.push(TxInput {
            ref_txid: vec![7],
            ref_offset: 0,
            from_addr: tx.initiator.clone(),
            amount: Amount::from_u64(10),
        });
    }
    tx.seal().unwrap();
    tx
}
