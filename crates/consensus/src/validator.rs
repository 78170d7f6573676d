// consensus/src/validator.rs

use crate::{ConsensusError, ConsensusResult};
use blockchain_core::BlockNumber;
use serde::{Deserialize, Serialize};

/// Ordered proposer list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    validators: Vec<String>,
}

impl ValidatorSet {
    /// Rejects an empty list and duplicate addresses
    pub fn new(validators: Vec<String>) -> ConsensusResult<Self> {
        if validators.is_empty() {
            return Err(ConsensusError::ValidatorError("no validators configured".into()));
        }
        for (i, address) in validators.iter().enumerate() {
            if address.is_empty() {
                return Err(ConsensusError::ValidatorError("empty validator address".into()));
            }
            if validators[..i].contains(address) {
                return Err(ConsensusError::ValidatorError(format!(
                    "duplicate validator {}",
                    address
                )));
            }
        }
        Ok(Self { validators })
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.validators.iter().any(|v| v == address)
    }

    pub fn addresses(&self) -> &[String] {
        &self.validators
    }

    /// Proposer of `height`; genesis has none
    pub fn proposer_at(&self, height: BlockNumber) -> Option<&str> {
        if height == 0 {
            return None;
        }
        let slot = ((height - 1) % self.validators.len() as u64) as usize;
        self.validators.get(slot).map(String::as_str)
    }
}
