// node/src/main.rs
use clap::{Parser, Subcommand};
use node::{init_node, keygen, InitOptions, Node, NodeConfig, NODE_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chain-node")]
#[command(about = "Chain node", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a node directory with keys, config and a chain genesis
    Init {
        /// Node root directory
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Name of the root chain
        #[arg(long, default_value = "xuper")]
        chain: String,

        /// Crypto type of keys and chain
        #[arg(long, default_value = "default")]
        crypto: String,

        /// Transactions need no fee inputs
        #[arg(long)]
        no_fee: bool,
    },

    /// Generate a node key pair
    Keygen {
        /// Key directory
        #[arg(short, long, default_value = "./data/keys")]
        output: PathBuf,

        #[arg(long, default_value = "default")]
        crypto: String,
    },

    /// Start the node and run until Ctrl-C
    Start {
        /// Configuration file path
        #[arg(short, long, default_value = "./conf/node.toml")]
        config: PathBuf,

        /// Override the node root directory
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={},engine={},storage={}", env!("CARGO_PKG_NAME"), log_level, log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { root, chain, crypto, no_fee } => {
            let config = init_node(&InitOptions { root, chain, crypto, no_fee })?;
            tracing::info!(
                config = %config.env.gen_conf_abs_path(NODE_CONFIG_FILE).display(),
                "Node initialized"
            );
        }
        Commands::Keygen { output, crypto } => {
            let address = keygen(&output, &crypto)?;
            tracing::info!(%address, path = %output.display(), "Key pair saved");
            tracing::warn!("Keep the key directory secure!");
        }
        Commands::Start { config, root } => {
            start_node(config, root).await?;
        }
    }

    Ok(())
}

async fn start_node(config_path: PathBuf, root: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from {}", config_path.display());
    let mut config = NodeConfig::from_file(&config_path)?;
    if let Some(root) = root {
        config.env.root_path = root;
    }

    let node = Node::new(config)?;
    node.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    node.stop().await?;
    tracing::info!("Node stopped gracefully");
    Ok(())
}
