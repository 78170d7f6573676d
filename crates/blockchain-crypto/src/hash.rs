// blockchain-crypto/src/hash.rs

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash output size in bytes
pub const HASH_SIZE: usize = 32;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha256,
    /// SHA256 applied twice; used for transaction and block identifiers
    DoubleSha256,
}

/// A 32-byte digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, crate::CryptoError> {
        let bytes: [u8; HASH_SIZE] = slice
            .try_into()
            .map_err(|_| crate::CryptoError::InvalidHash)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn zero() -> Self {
        Self([0u8; HASH_SIZE])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, crate::CryptoError> {
        let bytes = hex::decode(s)
            .map_err(|e| crate::CryptoError::DeserializationError(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

/// Types that can be digested
pub trait Hashable {
    fn hash(&self) -> Hash {
        self.hash_with(HashAlgorithm::Sha256)
    }

    fn hash_with(&self, algorithm: HashAlgorithm) -> Hash;
}

impl Hashable for [u8] {
    fn hash_with(&self, algorithm: HashAlgorithm) -> Hash {
        match algorithm {
            HashAlgorithm::Sha256 => Hash::new(Sha256::digest(self).into()),
            HashAlgorithm::DoubleSha256 => double_sha256(self),
        }
    }
}

impl Hashable for Vec<u8> {
    fn hash_with(&self, algorithm: HashAlgorithm) -> Hash {
        self.as_slice().hash_with(algorithm)
    }
}

impl Hashable for str {
    fn hash_with(&self, algorithm: HashAlgorithm) -> Hash {
        self.as_bytes().hash_with(algorithm)
    }
}

/// SHA256(SHA256(data))
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    Hash::new(Sha256::digest(first).into())
}
