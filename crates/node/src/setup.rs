// node/src/setup.rs
use crate::config::{NodeConfig, NODE_CONFIG_FILE};
use blockchain_core::{Amount, ConsensusConfig, GasPrice, GenesisConfig, Predistribution};
use blockchain_crypto::{load_addr_info, new_crypto_client, save_addr_info, Address};
use std::path::{Path, PathBuf};

/// Coins minted to the node address at genesis
const GENESIS_QUOTA: u64 = 100_000_000;

/// Options of `chain-node init`
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub root: PathBuf,
    pub chain: String,
    pub crypto: String,
    pub no_fee: bool,
}

/// Generate a key pair of `crypto` type into `dir`
pub fn keygen(dir: impl AsRef<Path>, crypto: &str) -> anyhow::Result<Address> {
    let keypair = new_crypto_client(crypto)?.generate_key_pair()?;
    let address = save_addr_info(dir, &keypair)?;
    Ok(address)
}

/// Lay out a node under `options.root`: config file, node keys and the
/// genesis of `options.chain` with this node as sole validator.
///
/// Existing keys are reused; an existing genesis is an error.
pub fn init_node(options: &InitOptions) -> anyhow::Result<NodeConfig> {
    let mut config = NodeConfig::with_root(&options.root);
    config.engine.root_chain = options.chain.clone();
    let env = &config.env;

    let crypto = new_crypto_client(&options.crypto)?;
    let key_path = env.key_path();
    let address = match load_addr_info(&key_path, crypto.as_ref()) {
        Ok(info) => {
            tracing::info!(address = %info.address, "Reusing node keys");
            info.address
        }
        Err(_) => {
            let address = keygen(&key_path, &options.crypto)?;
            tracing::info!(%address, path = %key_path.display(), "Node keys generated");
            address
        }
    };

    let chain_dir = env.data_path().join("blockchain").join(&options.chain);
    let genesis_path = chain_dir.join(storage::GENESIS_FILE);
    if genesis_path.exists() {
        anyhow::bail!("chain {} already initialized at {}", options.chain, chain_dir.display());
    }
    std::fs::create_dir_all(&chain_dir)?;
    genesis(options, &address.to_string()).to_file(&genesis_path)?;
    tracing::info!(chain = %options.chain, path = %genesis_path.display(), "Genesis written");

    let conf_path = env.gen_conf_abs_path(NODE_CONFIG_FILE);
    if let Some(parent) = conf_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.to_file(&conf_path)?;
    tracing::info!(path = %conf_path.display(), "Node config written");

    Ok(config)
}

fn genesis(options: &InitOptions, address: &str) -> GenesisConfig {
    GenesisConfig {
        crypto: options.crypto.clone(),
        no_fee: options.no_fee,
        gas_price: GasPrice {
            cpu_rate: 1000,
            mem_rate: 1_000_000,
            disk_rate: 1,
            xfee_rate: 1,
        },
        consensus: ConsensusConfig {
            validators: vec![address.to_string()],
            ..Default::default()
        },
        predistribution: vec![Predistribution {
            address: address.to_string(),
            quota: Amount::from_u64(GENESIS_QUOTA),
        }],
        ..Default::default()
    }
}
