// blockchain-core/src/transaction.rs

use crate::governance::TIMER_TX_INITIATOR;
use crate::invoke::{InvokeRequest, InvokeResponse};
use crate::rwset::{TxInputExt, TxOutputExt};
use crate::types::{now_nanos, Amount, Timestamp};
use crate::{BlockchainError, BlockchainResult};
use blockchain_crypto::{double_sha256, Hash, KeyPair};
use serde::{Deserialize, Serialize};

/// Outputs paid to this address are transaction fees
pub const FEE_ADDRESS: &str = "$";

/// Spends output `ref_offset` of transaction `ref_txid`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub ref_txid: Vec<u8>,
    pub ref_offset: u32,
    pub from_addr: String,
    pub amount: Amount,
}

impl TxInput {
    /// Key of the spent output in the UTXO set
    pub fn utxo_key(&self) -> String {
        utxo_key(&self.ref_txid, self.ref_offset)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub to_addr: String,
    pub amount: Amount,
}

/// `<txid hex>_<offset>`
pub fn utxo_key(txid: &[u8], offset: u32) -> String {
    format!("{}_{}", hex::encode(txid), offset)
}

/// A hex-encoded public key and the signature it made over the txid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub public_key: String,
    pub sign: String,
}

/// A transaction: UTXO transfers plus the contract calls and read/write sets
/// that pre-execution produced for them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Double SHA256 of the unsigned content; empty until sealed
    pub txid: Vec<u8>,
    pub tx_inputs: Vec<TxInput>,
    pub tx_outputs: Vec<TxOutput>,
    pub inputs_ext: Vec<TxInputExt>,
    pub outputs_ext: Vec<TxOutputExt>,
    pub contract_requests: Vec<InvokeRequest>,
    pub initiator: String,
    pub auth_require: Vec<String>,
    pub initiator_signs: Vec<SignatureInfo>,
    pub auth_require_signs: Vec<SignatureInfo>,
    pub nonce: String,
    pub timestamp: Timestamp,
    pub desc: Vec<u8>,
    /// Only the genesis allocation mints coins
    pub coinbase: bool,
}

/// Everything covered by the txid, i.e. the transaction without its signatures
#[derive(Serialize)]
struct SigningContent<'a> {
    tx_inputs: &'a [TxInput],
    tx_outputs: &'a [TxOutput],
    inputs_ext: &'a [TxInputExt],
    outputs_ext: &'a [TxOutputExt],
    contract_requests: &'a [InvokeRequest],
    initiator: &'a str,
    auth_require: &'a [String],
    nonce: &'a str,
    timestamp: Timestamp,
    desc: &'a [u8],
    coinbase: bool,
}

impl Transaction {
    /// Create an empty transaction for `initiator` with a fresh nonce
    pub fn new(initiator: impl Into<String>) -> Self {
        Self {
            initiator: initiator.into(),
            nonce: format!("{:016x}", rand::random::<u64>()),
            timestamp: now_nanos(),
            ..Default::default()
        }
    }

    /// Build a transaction carrying the requests and read/write sets of a
    /// pre-execution result
    pub fn from_invoke_response(
        initiator: impl Into<String>,
        auth_require: Vec<String>,
        response: &InvokeResponse,
    ) -> Self {
        let mut tx = Self::new(initiator);
        tx.auth_require = auth_require;
        tx.contract_requests = response.requests.clone();
        tx.inputs_ext = response.inputs.clone();
        tx.outputs_ext = response.outputs.clone();
        tx.tx_inputs.extend(response.utxo_inputs.iter().cloned());
        tx.tx_outputs.extend(response.utxo_outputs.iter().cloned());
        tx
    }

    /// Unsigned transaction carrying the timer tasks due at `height`
    pub fn timer(height: u64, response: &InvokeResponse) -> BlockchainResult<Self> {
        let mut tx = Self::from_invoke_response(TIMER_TX_INITIATOR, Vec::new(), response);
        tx.desc = format!("timer tasks at {}", height).into_bytes();
        tx.seal()?;
        Ok(tx)
    }

    pub fn is_timer_tx(&self) -> bool {
        !self.coinbase && self.initiator == TIMER_TX_INITIATOR
    }

    /// Genesis allocation of `(address, amount)` pairs
    pub fn coinbase(allocations: &[(String, Amount)], desc: &[u8]) -> BlockchainResult<Self> {
        let mut tx = Self {
            tx_outputs: allocations
                .iter()
                .map(|(to_addr, amount)| TxOutput { to_addr: to_addr.clone(), amount: amount.clone() })
                .collect(),
            desc: desc.to_vec(),
            coinbase: true,
            ..Default::default()
        };
        tx.seal()?;
        Ok(tx)
    }

    /// Digest of the unsigned content
    pub fn digest(&self) -> BlockchainResult<Hash> {
        let content = SigningContent {
            tx_inputs: &self.tx_inputs,
            tx_outputs: &self.tx_outputs,
            inputs_ext: &self.inputs_ext,
            outputs_ext: &self.outputs_ext,
            contract_requests: &self.contract_requests,
            initiator: &self.initiator,
            auth_require: &self.auth_require,
            nonce: &self.nonce,
            timestamp: self.timestamp,
            desc: &self.desc,
            coinbase: self.coinbase,
        };
        let bytes = bincode::serialize(&content)?;
        Ok(double_sha256(&bytes))
    }

    /// Compute and store the txid
    pub fn seal(&mut self) -> BlockchainResult<()> {
        self.txid = self.digest()?.to_vec();
        Ok(())
    }

    /// Seal the transaction and add the initiator's signature
    pub fn sign_initiator(&mut self, keypair: &KeyPair) -> BlockchainResult<()> {
        let info = self.signature_info(keypair)?;
        self.initiator_signs.push(info);
        Ok(())
    }

    /// Seal the transaction and add one auth-require signature
    pub fn sign_auth_require(&mut self, keypair: &KeyPair) -> BlockchainResult<()> {
        let info = self.signature_info(keypair)?;
        self.auth_require_signs.push(info);
        Ok(())
    }

    fn signature_info(&mut self, keypair: &KeyPair) -> BlockchainResult<SignatureInfo> {
        self.seal()?;
        let signature = keypair.sign(&self.txid)?;
        Ok(SignatureInfo {
            public_key: keypair.public_key().to_hex(),
            sign: signature.to_hex(),
        })
    }

    pub fn txid_hex(&self) -> String {
        hex::encode(&self.txid)
    }

    /// Sum of all spent inputs
    pub fn input_total(&self) -> Amount {
        self.tx_inputs.iter().map(|i| i.amount.clone()).sum()
    }

    /// Sum of all outputs, fee included
    pub fn output_total(&self) -> Amount {
        self.tx_outputs.iter().map(|o| o.amount.clone()).sum()
    }

    /// Sum of the outputs paid to the fee address
    pub fn fee_amount(&self) -> Amount {
        self.tx_outputs
            .iter()
            .filter(|o| o.to_addr == FEE_ADDRESS)
            .map(|o| o.amount.clone())
            .sum()
    }

    /// Checks that need no chain state
    pub fn validate_basic(&self) -> BlockchainResult<()> {
        if self.txid.is_empty() {
            return Err(BlockchainError::InvalidTransaction("empty txid".into()));
        }
        if self.coinbase {
            return Ok(());
        }
        if self.initiator.is_empty() {
            return Err(BlockchainError::InvalidTransaction("missing initiator".into()));
        }
        if self.is_timer_tx() {
            if !self.initiator_signs.is_empty() || !self.auth_require.is_empty() {
                return Err(BlockchainError::InvalidTransaction("timer transactions carry no signatures".into()));
            }
        } else if self.initiator_signs.is_empty() {
            return Err(BlockchainError::InvalidTransaction("missing initiator signature".into()));
        }
        if self.auth_require.len() != self.auth_require_signs.len() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "{} auth_require entries but {} signatures",
                self.auth_require.len(),
                self.auth_require_signs.len()
            )));
        }
        if self.tx_outputs.iter().any(|o| o.amount.is_zero()) {
            return Err(BlockchainError::InvalidTransaction("zero amount output".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rwset::TxOutputExt;
    use blockchain_crypto::{PublicKey, Signature, SignatureScheme};

    fn signed_tx(keypair: &KeyPair) -> Transaction {
        let mut tx = Transaction::new(keypair.address().to_string());
        tx.tx_outputs.push(TxOutput { to_addr: FEE_ADDRESS.into(), amount: Amount::from_u64(10) });
        tx.outputs_ext.push(TxOutputExt { bucket: "counter".into(), key: b"n".to_vec(), value: b"1".to_vec() });
        tx.sign_initiator(keypair).unwrap();
        tx
    }

    #[test]
    fn test_txid_excludes_signatures() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let mut tx = signed_tx(&keypair);
        let txid = tx.txid.clone();

        tx.auth_require_signs.push(SignatureInfo::default());
        assert_eq!(tx.digest().unwrap().to_vec(), txid);
    }

    #[test]
    fn test_txid_covers_content() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let mut tx = signed_tx(&keypair);
        let txid = tx.txid.clone();

        tx.outputs_ext[0].value = b"2".to_vec();
        assert_ne!(tx.digest().unwrap().to_vec(), txid);
    }

    #[test]
    fn test_initiator_signature_verifies() {
        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        let tx = signed_tx(&keypair);

        let info = &tx.initiator_signs[0];
        let public_key = PublicKey::from_hex(SignatureScheme::Ed25519, &info.public_key).unwrap();
        let signature = Signature::from_hex(SignatureScheme::Ed25519, &info.sign).unwrap();
        assert!(public_key.verify(&tx.txid, &signature).unwrap());
        assert!(tx.validate_basic().is_ok());
    }

    #[test]
    fn test_validate_basic() {
        let mut tx = Transaction::new("alice");
        assert!(tx.validate_basic().is_err());

        tx.seal().unwrap();
        assert!(tx.validate_basic().is_err(), "unsigned transaction");

        let coinbase = Transaction::coinbase(&[("alice".into(), Amount::from_u64(5))], b"genesis").unwrap();
        assert!(coinbase.validate_basic().is_ok());
    }

    #[test]
    fn test_timer_tx_is_unsigned() {
        let mut tx = Transaction::timer(4, &InvokeResponse::default()).unwrap();
        assert!(tx.is_timer_tx());
        assert_eq!(tx.initiator, TIMER_TX_INITIATOR);
        assert!(tx.validate_basic().is_ok());

        let keypair = KeyPair::generate(SignatureScheme::Ed25519).unwrap();
        tx.sign_initiator(&keypair).unwrap();
        assert!(tx.validate_basic().is_err(), "signed timer transaction");
        assert!(!signed_tx(&keypair).is_timer_tx());
    }

    #[test]
    fn test_fee_amount() {
        let mut tx = Transaction::new("alice");
        tx.tx_inputs.push(TxInput { ref_txid: vec![1], ref_offset: 0, from_addr: "alice".into(), amount: Amount::from_u64(100) });
        tx.tx_outputs.push(TxOutput { to_addr: "bob".into(), amount: Amount::from_u64(60) });
        tx.tx_outputs.push(TxOutput { to_addr: FEE_ADDRESS.into(), amount: Amount::from_u64(15) });

        assert_eq!(tx.fee_amount(), Amount::from_u64(15));
        assert_eq!(tx.output_total(), Amount::from_u64(75));
        assert_eq!(tx.input_total(), Amount::from_u64(100));
        assert_eq!(tx.tx_inputs[0].utxo_key(), "01_0");
    }
}
