// governance/src/lib.rs

//! Governance managers
//!
//! Each manager registers a kernel contract that owns the writes and reads
//! the committed result back through the state's read view:
//! - `$acl`: weighted signer sets of contract accounts
//! - `$govern_token`: the governance token
//! - `$proposal`: proposals voted with governance tokens
//! - `$timer_task`: requests scheduled for a block height
//! - `$xtoken`: auxiliary tokens

pub mod acl;
pub mod govern_token;
pub mod proposal;
pub mod timer_task;
pub mod xtoken;

mod store;

pub use acl::{AclContract, AclKernel, ACL_CONTRACT};
pub use govern_token::{GovernTokenContract, GovernTokenKernel, GOVERN_TOKEN_CONTRACT};
pub use proposal::{ProposalContract, ProposalKernel, PROPOSAL_CONTRACT};
pub use timer_task::{TimerTaskContract, TimerTaskKernel, TIMER_TASK_CONTRACT};
pub use xtoken::{XTokenContract, XTokenKernel, XTOKEN_CONTRACT};
