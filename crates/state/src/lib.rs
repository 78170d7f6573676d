// state/src/lib.rs

//! Reference state machine of a chain
//!
//! This crate provides:
//! - A versioned key/value contract state and a UTXO set, rebuilt by replaying the ledger
//! - The pending pool of admitted transactions
//! - Transaction verification (signatures, ACL thresholds, fees, contract replay)
//! - Block application with pending-pool reconciliation
//! - Late-bound, non-owning registration of contract and governance managers

pub mod machine;
pub mod pool;
pub mod reader;
pub mod verify;
pub mod world;

pub use machine::State;
pub use pool::{PendingPool, PoolConfig, PoolMetrics};
pub use reader::{LiveReader, TxInputsReader};
pub use world::WorldState;
