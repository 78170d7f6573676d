// blockchain-crypto/src/client.rs

use crate::{Address, CryptoResult, KeyPair, PublicKey, Signature, SignatureScheme};
use std::sync::Arc;

/// Algorithm-bound crypto operations a chain needs.
///
/// A chain picks its client from the crypto type stored in its ledger meta,
/// so every signature on that chain is produced and checked under one scheme.
pub trait CryptoClient: Send + Sync {
    fn scheme(&self) -> SignatureScheme;

    fn generate_key_pair(&self) -> CryptoResult<KeyPair>;

    fn sign(&self, keypair: &KeyPair, message: &[u8]) -> CryptoResult<Signature>;

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> CryptoResult<bool>;

    /// Parse a hex-encoded public key under this client's scheme
    fn public_key_from_hex(&self, s: &str) -> CryptoResult<PublicKey> {
        PublicKey::from_hex(self.scheme(), s)
    }

    /// Parse a hex-encoded signature under this client's scheme
    fn signature_from_hex(&self, s: &str) -> CryptoResult<Signature> {
        Signature::from_hex(self.scheme(), s)
    }

    fn address_of(&self, public_key: &PublicKey) -> Address {
        public_key.to_address()
    }
}

/// Client backed by one of the built-in signature schemes
#[derive(Debug, Clone, Copy)]
pub struct SchemeClient {
    scheme: SignatureScheme,
}

impl SchemeClient {
    pub fn new(scheme: SignatureScheme) -> Self {
        Self { scheme }
    }
}

impl CryptoClient for SchemeClient {
    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    fn generate_key_pair(&self) -> CryptoResult<KeyPair> {
        KeyPair::generate(self.scheme)
    }

    fn sign(&self, keypair: &KeyPair, message: &[u8]) -> CryptoResult<Signature> {
        if keypair.scheme() != self.scheme {
            return Err(crate::CryptoError::InvalidSecretKey);
        }
        keypair.sign(message)
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> CryptoResult<bool> {
        if public_key.scheme() != self.scheme {
            return Ok(false);
        }
        signature.verify(message, public_key)
    }
}

/// Instantiate the client for a crypto type name (`default`, `ed25519`, `secp256k1`)
pub fn new_crypto_client(crypto_type: &str) -> CryptoResult<Arc<dyn CryptoClient>> {
    let scheme = SignatureScheme::from_name(crypto_type)?;
    Ok(Arc::new(SchemeClient::new(scheme)))
}
