// blockchain-crypto/src/lib.rs

//! Cryptographic primitives used by a chain instance
//!
//! This crate provides:
//! - Hashing (SHA256, double SHA256)
//! - Digital signatures (Ed25519, SECP256k1)
//! - Key pairs and base58 addresses
//! - Transaction merkle roots
//! - The algorithm-typed crypto client a chain instantiates from its ledger meta
//! - Loading a node identity from a key directory

pub mod address;
pub mod client;
pub mod hash;
pub mod keypair;
pub mod merkle;
pub mod signature;

pub use address::{load_addr_info, save_addr_info, AddressInfo};
pub use client::{new_crypto_client, CryptoClient, SchemeClient};
pub use hash::{double_sha256, Hash, HashAlgorithm, Hashable};
pub use keypair::{Address, KeyPair, PublicKey, SecretKey};
pub use merkle::merkle_root;
pub use signature::{Signature, SignatureScheme};

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Invalid hash")]
    InvalidHash,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unsupported crypto type: {0}")]
    UnsupportedCryptoType(String),

    #[error("Key file error: {0}")]
    KeyFile(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
