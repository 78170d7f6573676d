// blockchain-core/src/governance.rs

//! Governance manager interfaces.
//!
//! Each manager is backed by a kernel contract; the traits here are the read
//! side the state machine and other subsystems call into.

use crate::invoke::InvokeRequest;
use crate::types::{Amount, BlockNumber};
use crate::BlockchainResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of contract account names, e.g. `XC1111111111111111@xuper`
pub const ACCOUNT_PREFIX: &str = "XC";

/// True for names of the form `XC<16 digits>@<chain>`
pub fn is_account_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(ACCOUNT_PREFIX) else {
        return false;
    };
    match rest.split_once('@') {
        Some((number, chain)) => {
            number.len() == 16 && number.bytes().all(|b| b.is_ascii_digit()) && !chain.is_empty()
        }
        None => false,
    }
}

/// Weighted signer set of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Sum of signer weights needed to act for the account
    pub threshold: u64,
    pub aks_weight: BTreeMap<String, u64>,
}

impl Acl {
    /// Whether the given signer addresses reach the threshold
    pub fn is_satisfied_by<'a>(&self, signers: impl IntoIterator<Item = &'a str>) -> bool {
        let mut seen = std::collections::BTreeSet::new();
        let weight: u64 = signers
            .into_iter()
            .filter(|s| seen.insert(*s))
            .filter_map(|s| self.aks_weight.get(s))
            .sum();
        self.threshold > 0 && weight >= self.threshold
    }
}

pub trait AclManager: Send + Sync {
    fn get_account_acl(&self, account: &str) -> BlockchainResult<Option<Acl>>;
}

pub trait GovernTokenManager: Send + Sync {
    fn get_balance(&self, address: &str) -> BlockchainResult<Amount>;

    fn total_supply(&self) -> BlockchainResult<Amount>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Voting,
    Passed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: String,
    pub description: String,
    /// Govern tokens voted in favour
    pub votes: Amount,
    pub voters: Vec<String>,
    pub status: ProposalStatus,
    /// Scheduled once the proposal passes
    #[serde(default)]
    pub task: Option<TimerTask>,
}

pub trait ProposalManager: Send + Sync {
    fn get_proposal(&self, id: u64) -> BlockchainResult<Option<Proposal>>;
}

/// Initiator of the transaction running due timer tasks. It signs nothing;
/// only the proposer may put one first in a block.
pub const TIMER_TX_INITIATOR: &str = "$timer_task";

/// A request scheduled to run at a block height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTask {
    pub trigger_height: BlockNumber,
    pub request: InvokeRequest,
}

pub trait TimerTaskManager: Send + Sync {
    /// Requests scheduled for `height`, as of the confirmed state
    fn tasks_at(&self, height: BlockNumber) -> BlockchainResult<Vec<InvokeRequest>>;
}

pub trait XTokenManager: Send + Sync {
    fn balance(&self, token: &str, address: &str) -> BlockchainResult<Amount>;
}
