// blockchain-crypto/src/address.rs

//! Node identity stored in a key directory.
//!
//! The directory holds three text files: `address`, `public.key` and
//! `private.key` (keys hex-encoded). The address must derive from the public
//! key, otherwise the directory is rejected.

use crate::{Address, CryptoClient, CryptoError, CryptoResult, KeyPair, SecretKey};
use std::fs;
use std::path::Path;

pub const ADDRESS_FILE: &str = "address";
pub const PUBLIC_KEY_FILE: &str = "public.key";
pub const PRIVATE_KEY_FILE: &str = "private.key";

/// This node's address and key pair
#[derive(Debug)]
pub struct AddressInfo {
    pub address: Address,
    pub keypair: KeyPair,
}

impl AddressInfo {
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }
}

fn read_key_file(dir: &Path, name: &str) -> CryptoResult<String> {
    let path = dir.join(name);
    let contents = fs::read_to_string(&path)
        .map_err(|e| CryptoError::KeyFile(format!("{}: {}", path.display(), e)))?;
    Ok(contents.trim().to_string())
}

/// Load the node identity from `dir` using the chain's crypto client
pub fn load_addr_info(dir: impl AsRef<Path>, crypto: &dyn CryptoClient) -> CryptoResult<AddressInfo> {
    let dir = dir.as_ref();

    let address: Address = read_key_file(dir, ADDRESS_FILE)?.parse()?;
    let public_key = crypto.public_key_from_hex(&read_key_file(dir, PUBLIC_KEY_FILE)?)?;
    let secret_key = SecretKey::from_hex(crypto.scheme(), &read_key_file(dir, PRIVATE_KEY_FILE)?)?;

    if crypto.address_of(&public_key) != address {
        return Err(CryptoError::InvalidAddress(format!(
            "{} does not match public key in {}",
            address,
            dir.display()
        )));
    }

    let keypair = KeyPair::from_keys(public_key, secret_key)?;
    tracing::debug!(address = %address, dir = %dir.display(), "loaded node address info");

    Ok(AddressInfo { address, keypair })
}

/// Write `keypair` into `dir` in the layout `load_addr_info` expects
pub fn save_addr_info(dir: impl AsRef<Path>, keypair: &KeyPair) -> CryptoResult<Address> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let address = keypair.address();
    fs::write(dir.join(ADDRESS_FILE), address.to_string())?;
    fs::write(dir.join(PUBLIC_KEY_FILE), keypair.public_key().to_hex())?;
    fs::write(dir.join(PRIVATE_KEY_FILE), keypair.secret_key().to_hex())?;

    Ok(address)
}
