// blockchain-crypto/src/signature.rs

use crate::{CryptoError, CryptoResult, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signature schemes a chain can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    /// Ed25519 (default)
    Ed25519,
    /// SECP256k1
    Secp256k1,
}

impl SignatureScheme {
    /// Resolve the crypto type string recorded in ledger meta
    pub fn from_name(name: &str) -> CryptoResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "ed25519" => Ok(Self::Ed25519),
            "secp256k1" => Ok(Self::Secp256k1),
            other => Err(CryptoError::UnsupportedCryptoType(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Secp256k1 => "secp256k1",
        }
    }
}

/// Digital signature bytes tagged with their scheme
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    scheme: SignatureScheme,
    bytes: Vec<u8>,
}

impl Signature {
    pub fn new(scheme: SignatureScheme, bytes: Vec<u8>) -> Self {
        Self { scheme, bytes }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(scheme: SignatureScheme, s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        Ok(Self::new(scheme, bytes))
    }

    /// Check this signature over `message` against `public_key`.
    ///
    /// A scheme mismatch is reported as `Ok(false)`; malformed key or
    /// signature bytes are errors.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> CryptoResult<bool> {
        if self.scheme != public_key.scheme() {
            return Ok(false);
        }

        match self.scheme {
            SignatureScheme::Ed25519 => self.verify_ed25519(message, public_key),
            SignatureScheme::Secp256k1 => self.verify_secp256k1(message, public_key),
        }
    }

    fn verify_ed25519(&self, message: &[u8], public_key: &PublicKey) -> CryptoResult<bool> {
        use ed25519_dalek::{Signature as Ed25519Sig, Verifier, VerifyingKey};

        let sig = Ed25519Sig::from_slice(&self.bytes).map_err(|_| CryptoError::InvalidSignature)?;
        let key_bytes: &[u8; 32] = public_key
            .as_bytes()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        let pk = VerifyingKey::from_bytes(key_bytes).map_err(|_| CryptoError::InvalidPublicKey)?;

        Ok(pk.verify(message, &sig).is_ok())
    }

    fn verify_secp256k1(&self, message: &[u8], public_key: &PublicKey) -> CryptoResult<bool> {
        use secp256k1::{ecdsa::Signature as Secp256k1Sig, Message, PublicKey as Secp256k1Pk, Secp256k1};

        let secp = Secp256k1::verification_only();
        let sig = Secp256k1Sig::from_compact(&self.bytes).map_err(|_| CryptoError::InvalidSignature)?;
        let pk = Secp256k1Pk::from_slice(public_key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;

        // ECDSA signs the SHA256 digest of the message
        let digest = crate::hash::Hashable::hash(message);
        let msg = Message::from_digest_slice(digest.as_bytes()).map_err(|_| CryptoError::InvalidSignature)?;

        Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature({:?}, {}..)",
            self.scheme,
            hex::encode(&self.bytes[..8.min(self.bytes.len())])
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_scheme_names() {
        assert_eq!(SignatureScheme::from_name("default").unwrap(), SignatureScheme::Ed25519);
        assert_eq!(SignatureScheme::from_name("SECP256K1").unwrap(), SignatureScheme::Secp256k1);
        assert!(matches!(
            SignatureScheme::from_name("gm"),
            Err(CryptoError::UnsupportedCryptoType(_))
        ));
    }

    #[test]
    fn test_signature_ed25519() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let signature = keypair.sign(b"Test message").unwrap();
        assert!(signature.verify(b"Test message", keypair.public_key()).unwrap());
        assert!(!signature.verify(b"Wrong message", keypair.public_key()).unwrap());
    }

    #[test]
    fn test_signature_secp256k1() {
        let keypair = KeyPair::generate(SignatureScheme::Secp256k1).unwrap();
        let signature = keypair.sign(b"Test message").unwrap();
        assert!(signature.verify(b"Test message", keypair.public_key()).unwrap());
    }

    #[test]
    fn test_scheme_mismatch_is_not_an_error() {
        let ed = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let secp = KeyPair::generate(SignatureScheme::Secp256k1).unwrap();
        let signature = ed.sign(b"m").unwrap();
        assert!(!signature.verify(b"m", secp.public_key()).unwrap());
    }
}
