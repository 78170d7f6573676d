// blockchain-crypto/src/keypair.rs

use crate::{hash::Hashable, CryptoError, CryptoResult, Signature, SignatureScheme};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public key bytes tagged with their scheme
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    scheme: SignatureScheme,
    bytes: Vec<u8>,
}

impl PublicKey {
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
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self::new(scheme, bytes))
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<bool> {
        signature.verify(message, self)
    }

    pub fn to_address(&self) -> Address {
        Address::from_public_key(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicKey({:?}, {}..)",
            self.scheme,
            hex::encode(&self.bytes[..8.min(self.bytes.len())])
        )
    }
}

/// Secret key material, zeroed on drop
pub struct SecretKey {
    scheme: SignatureScheme,
    bytes: Vec<u8>,
}

impl SecretKey {
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
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self::new(scheme, bytes))
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({:?}, [REDACTED])", self.scheme)
    }
}

/// Public and secret key of one identity
pub struct KeyPair {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl KeyPair {
    pub fn generate(scheme: SignatureScheme) -> CryptoResult<Self> {
        use rand::rngs::OsRng;

        match scheme {
            SignatureScheme::Ed25519 => {
                let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
                let verifying_key = signing_key.verifying_key();
                Ok(Self {
                    public_key: PublicKey::new(scheme, verifying_key.to_bytes().to_vec()),
                    secret_key: SecretKey::new(scheme, signing_key.to_bytes().to_vec()),
                })
            }
            SignatureScheme::Secp256k1 => {
                let secp = secp256k1::Secp256k1::new();
                let (secret, public) = secp.generate_keypair(&mut OsRng);
                Ok(Self {
                    public_key: PublicKey::new(scheme, public.serialize().to_vec()),
                    secret_key: SecretKey::new(scheme, secret.secret_bytes().to_vec()),
                })
            }
        }
    }

    /// Pair up keys loaded from storage
    pub fn from_keys(public_key: PublicKey, secret_key: SecretKey) -> CryptoResult<Self> {
        if public_key.scheme() != secret_key.scheme() {
            return Err(CryptoError::InvalidSecretKey);
        }
        Ok(Self { public_key, secret_key })
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.public_key.scheme()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn address(&self) -> Address {
        self.public_key.to_address()
    }

    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        match self.scheme() {
            SignatureScheme::Ed25519 => {
                use ed25519_dalek::Signer;

                let bytes: &[u8; 32] = self
                    .secret_key
                    .as_bytes()
                    .try_into()
                    .map_err(|_| CryptoError::InvalidSecretKey)?;
                let signing_key = ed25519_dalek::SigningKey::from_bytes(bytes);
                let signature = signing_key.sign(message);
                Ok(Signature::new(SignatureScheme::Ed25519, signature.to_bytes().to_vec()))
            }
            SignatureScheme::Secp256k1 => {
                use secp256k1::{Message, Secp256k1, SecretKey as Secp256k1Sk};

                let secp = Secp256k1::signing_only();
                let secret = Secp256k1Sk::from_slice(self.secret_key.as_bytes())
                    .map_err(|_| CryptoError::InvalidSecretKey)?;
                let digest = message.hash();
                let msg = Message::from_digest_slice(digest.as_bytes())
                    .map_err(|_| CryptoError::InvalidSignature)?;
                let signature = secp.sign_ecdsa(&msg, &secret);
                Ok(Signature::new(
                    SignatureScheme::Secp256k1,
                    signature.serialize_compact().to_vec(),
                ))
            }
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Account address: 20 bytes of the public key digest, rendered as base58
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = public_key.as_bytes().hash();
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest.as_bytes()[12..32]);
        Self(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidAddress(format!("bad length: {}", s)))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}
