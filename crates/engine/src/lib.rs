// engine/src/lib.rs

//! Per-chain orchestration
//!
//! This crate wires a chain together and serves its calls:
//! - Ordered, all-or-nothing bring-up of every chain subsystem through a replaceable rely agent
//! - Sandboxed pre-execution of contract request batches with gas accounting
//! - Transaction submission guarded by a time-bounded admission cache
//! - Block processing and single-leader block production
//! - A fixed error taxonomy with metrics result codes

pub mod admission;
pub mod agent;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod miner;

pub use admission::TxIdCache;
pub use agent::{ChainRelyAgent, DefaultRelyAgent};
pub use chain::Chain;
pub use config::{EngineConfig, EnvConfig};
pub use context::{CallContext, ChainCtx, EngineCtx};
pub use error::{BringUpStep, EngineError, EngineResult};
pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};
pub use miner::Miner;
