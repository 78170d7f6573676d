// blockchain-core/src/state.rs

use crate::block::Block;
use crate::contract::ContractManager;
use crate::governance::{AclManager, GovernTokenManager, ProposalManager, TimerTaskManager};
use crate::invoke::InvokeRequest;
use crate::rwset::VersionedData;
use crate::transaction::{Transaction, TxInput};
use crate::types::{Amount, BlockNumber, GasPrice};
use crate::{BlockchainError, BlockchainResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Weak};

/// Bucket holding contract descriptors
pub const CONTRACT_BUCKET: &str = "contract";

/// Descriptor key of a contract inside [`CONTRACT_BUCKET`]
pub fn contract_desc_key(contract_name: &str) -> Vec<u8> {
    format!("{}.desc", contract_name).into_bytes()
}

/// Read access to the versioned contract state
pub trait XMReader: Send + Sync {
    fn get(&self, bucket: &str, key: &[u8]) -> BlockchainResult<Option<VersionedData>>;
}

/// Read access to unspent outputs
pub trait UtxoReader: Send + Sync {
    /// Unspent outputs owned by `address`, as inputs spending them, in a
    /// stable order
    fn list_utxos(&self, address: &str) -> BlockchainResult<Vec<TxInput>>;

    fn balance(&self, address: &str) -> BlockchainResult<Amount> {
        Ok(self.list_utxos(address)?.into_iter().map(|input| input.amount).sum())
    }

    /// Pick unspent outputs of `address` worth at least `amount`, skipping
    /// the keys in `exclude`; returns the inputs and their total
    fn select_utxos(
        &self,
        address: &str,
        amount: &Amount,
        exclude: &HashSet<String>,
    ) -> BlockchainResult<(Vec<TxInput>, Amount)> {
        let mut selected = Vec::new();
        let mut total = Amount::zero();

        for input in self.list_utxos(address)? {
            if &total >= amount {
                break;
            }
            if exclude.contains(&input.utxo_key()) {
                continue;
            }
            total = &total + &input.amount;
            selected.push(input);
        }

        if &total < amount {
            return Err(BlockchainError::InsufficientBalance);
        }
        Ok((selected, total))
    }
}

/// Declared type of a deployed contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDesc {
    pub contract_name: String,
    pub module: String,
    /// Which native implementation backs the contract
    pub code: String,
    pub initiator: String,
}

/// Where a transaction currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Unconfirmed,
    Confirmed,
}

/// Chain parameters and position as seen by the state machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMeta {
    pub gas_price: GasPrice,
    pub no_fee: bool,
    pub height: BlockNumber,
    pub tip_blockid: Vec<u8>,
}

/// Canonical account/contract/UTXO view of a chain plus its pending pool.
///
/// Managers registered with the `set_*` hooks are held weakly: the state
/// calls back into them but never keeps them alive.
pub trait StateMachine: Send + Sync {
    fn create_xm_reader(&self) -> Arc<dyn XMReader>;

    fn create_utxo_reader(&self) -> Arc<dyn UtxoReader>;

    /// Reader over the trunk tip only, without pending writes
    fn create_confirmed_xm_reader(&self) -> Arc<dyn XMReader> {
        self.create_xm_reader()
    }

    fn create_confirmed_utxo_reader(&self) -> Arc<dyn UtxoReader> {
        self.create_utxo_reader()
    }

    /// System requests that run ahead of `requests`
    fn get_reserved_contract_requests(&self, requests: &[InvokeRequest]) -> BlockchainResult<Vec<InvokeRequest>>;

    /// Descriptor of a deployed contract, `ContractNotFound` if there is none
    fn get_contract_desc(&self, contract_name: &str) -> BlockchainResult<ContractDesc>;

    /// Full verification of a signed transaction against current state
    fn verify_tx(&self, tx: &Transaction) -> BlockchainResult<()>;

    /// Admit a verified transaction into the pending pool
    fn do_tx(&self, tx: &Transaction) -> BlockchainResult<()>;

    /// A pending or confirmed transaction
    fn query_tx(&self, txid: &[u8]) -> BlockchainResult<Option<(Transaction, TxStatus)>>;

    /// Pending transactions in admission order
    fn unconfirmed_txs(&self, limit: usize) -> Vec<Transaction>;

    /// Confirm `block` into the ledger and apply it
    fn play_block(&self, block: &Block) -> BlockchainResult<()>;

    fn meta(&self) -> StateMeta;

    fn set_contract_manager(&self, manager: Weak<dyn ContractManager>);

    fn set_acl_manager(&self, manager: Weak<dyn AclManager>);

    fn set_govern_token_manager(&self, manager: Weak<dyn GovernTokenManager>);

    fn set_proposal_manager(&self, manager: Weak<dyn ProposalManager>);

    fn set_timer_task_manager(&self, manager: Weak<dyn TimerTaskManager>);

    fn close(&self);
}
