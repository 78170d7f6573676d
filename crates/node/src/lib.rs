// node/src/lib.rs
pub mod config;
pub mod runtime;
pub mod setup;

pub use config::{NodeConfig, NODE_CONFIG_FILE};
pub use runtime::Node;
pub use setup::{init_node, keygen, InitOptions};
