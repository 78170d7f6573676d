// state/src/verify.rs

//! Transaction verification against the current chain state.
//!
//! A transaction is checked for txid integrity, signatures and ACL
//! thresholds, UTXO ownership and balance, the fee it pays against the gas
//! its recorded resource usage implies, and finally by replaying its contract
//! calls over exactly the reads it declared.

use crate::machine::State;
use crate::reader::TxInputsReader;
use blockchain_core::{
    contract_desc_key, is_account_name, parse_contract_transfer_request, Amount, BlockchainError,
    BlockchainResult, ContextConfig, ContractDesc, Gas, InvokeRequest,
    PureData, ResourceLimits, SandboxConfig, SignatureInfo, StateMachine, Transaction, TxInput,
    VersionedData, XMReader, CONTRACT_BUCKET,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// Where a transaction is being verified
#[derive(Debug, Clone, Copy)]
pub(crate) enum VerifyScope<'a> {
    /// Admission into the pending pool; inputs must be unspent in the live view
    Admission,
    /// Inside the block at `height`, after the given earlier transactions of
    /// that block
    Block { height: u64, earlier: &'a [Transaction] },
}

/// Number of leading `requests` matching the reserved list call for call,
/// or 0 if they do not all match
pub(crate) fn reserved_prefix_len(reserved: &[InvokeRequest], requests: &[InvokeRequest]) -> usize {
    let matches = requests.len() >= reserved.len()
        && reserved
            .iter()
            .zip(requests)
            .all(|(r, q)| r.contract_name == q.contract_name && r.method_name == q.method_name);
    if matches {
        reserved.len()
    } else {
        0
    }
}

fn invalid(message: impl Into<String>) -> BlockchainError {
    BlockchainError::InvalidTransaction(message.into())
}

impl State {
    pub(crate) fn verify(&self, tx: &Transaction, scope: VerifyScope<'_>) -> BlockchainResult<()> {
        tx.validate_basic()?;
        if tx.coinbase {
            return Err(invalid("coinbase is only allowed in genesis"));
        }
        if tx.digest()?.as_bytes() != tx.txid.as_slice() {
            return Err(invalid(format!("txid {} does not match content", tx.txid_hex())));
        }

        let authorized = if tx.is_timer_tx() {
            self.check_timer_tx(tx, scope)?;
            HashSet::from([tx.initiator.clone()])
        } else {
            self.check_authorization(tx)?
        };
        let contract_inputs = self.check_utxo(tx, &authorized, scope)?;
        if !tx.is_timer_tx() {
            self.check_fee(tx)?;
        }
        self.replay_contracts(tx, scope, &contract_inputs)?;

        trace!(chain = %self.name(), txid = %tx.txid_hex(), "Transaction verified");
        Ok(())
    }

    /// A timer transaction leads its block and runs exactly the tasks due at
    /// the block height; it never enters the pending pool
    fn check_timer_tx(&self, tx: &Transaction, scope: VerifyScope<'_>) -> BlockchainResult<()> {
        let VerifyScope::Block { height, earlier } = scope else {
            return Err(BlockchainError::Forbidden(format!(
                "timer transaction {} outside a block",
                tx.txid_hex()
            )));
        };
        if !earlier.is_empty() {
            return Err(BlockchainError::Forbidden("timer transaction must lead its block".into()));
        }
        let manager = self
            .timer_task_manager()
            .ok_or_else(|| BlockchainError::Forbidden("no timer task manager".into()))?;

        let due = manager.tasks_at(height)?;
        let ran: Vec<InvokeRequest> = tx
            .contract_requests
            .iter()
            .cloned()
            .map(|mut request| {
                request.resource_limits = None;
                request
            })
            .collect();
        if due.is_empty() || ran != due {
            return Err(BlockchainError::Forbidden(format!(
                "timer transaction does not run the tasks due at {}",
                height
            )));
        }
        Ok(())
    }

    /// Address of a valid signature over the txid
    fn signer_address(&self, tx: &Transaction, info: &SignatureInfo) -> BlockchainResult<String> {
        let public_key = self.crypto.public_key_from_hex(&info.public_key)?;
        let signature = self.crypto.signature_from_hex(&info.sign)?;
        if !self.crypto.verify(&public_key, &tx.txid, &signature)? {
            return Err(invalid(format!("bad signature from {}", info.public_key)));
        }
        Ok(self.crypto.address_of(&public_key).to_string())
    }

    fn check_account<'a>(&self, account: &str, signers: impl IntoIterator<Item = &'a str>) -> BlockchainResult<()> {
        let acl_manager = self
            .acl_manager()
            .ok_or_else(|| BlockchainError::Forbidden(format!("no acl manager to check {}", account)))?;
        let acl = acl_manager
            .get_account_acl(account)?
            .ok_or_else(|| BlockchainError::Forbidden(format!("account {} not found", account)))?;

        if !acl.is_satisfied_by(signers) {
            return Err(BlockchainError::Forbidden(format!("acl threshold of {} not met", account)));
        }
        Ok(())
    }

    /// Identities the signatures authorize: the initiator, every auth-require
    /// address and every account whose threshold is met
    fn check_authorization(&self, tx: &Transaction) -> BlockchainResult<HashSet<String>> {
        let initiator_signers = tx
            .initiator_signs
            .iter()
            .map(|info| self.signer_address(tx, info))
            .collect::<BlockchainResult<Vec<_>>>()?;

        if is_account_name(&tx.initiator) {
            self.check_account(&tx.initiator, initiator_signers.iter().map(String::as_str))?;
        } else if !initiator_signers.iter().any(|signer| signer == &tx.initiator) {
            return Err(invalid(format!("initiator {} did not sign", tx.initiator)));
        }

        let mut authorized = HashSet::from([tx.initiator.clone()]);
        let mut account_signers: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for (entry, info) in tx.auth_require.iter().zip(&tx.auth_require_signs) {
            let signer = self.signer_address(tx, info)?;
            let (account, address) = match entry.split_once('/') {
                Some((account, address)) => (Some(account), address),
                None => (None, entry.as_str()),
            };
            if signer != address {
                return Err(invalid(format!("auth_require {} signed by {}", entry, signer)));
            }
            authorized.insert(address.to_string());
            if let Some(account) = account {
                account_signers.entry(account).or_default().push(signer);
            }
        }

        for (account, signers) in account_signers {
            self.check_account(account, signers.iter().map(String::as_str))?;
            authorized.insert(account.to_string());
        }

        Ok(authorized)
    }

    /// Returns the inputs owned by called contracts rather than by a signer;
    /// only the replay can justify those
    fn check_utxo(
        &self,
        tx: &Transaction,
        authorized: &HashSet<String>,
        scope: VerifyScope<'_>,
    ) -> BlockchainResult<Vec<TxInput>> {
        let contracts: HashSet<&str> = tx
            .contract_requests
            .iter()
            .map(|r| r.contract_name.as_str())
            .collect();

        let mut contract_inputs = Vec::new();
        for input in &tx.tx_inputs {
            if authorized.contains(&input.from_addr) {
                continue;
            }
            if !contracts.contains(input.from_addr.as_str()) {
                return Err(BlockchainError::Forbidden(format!(
                    "input {} of {} is not authorized",
                    input.utxo_key(),
                    input.from_addr
                )));
            }
            contract_inputs.push(input.clone());
        }

        // Inside a block the sequential apply checks existence
        if let VerifyScope::Admission = scope {
            let inner = self.inner.read();
            for input in &tx.tx_inputs {
                let key = input.utxo_key();
                match inner.live.utxo(&key) {
                    Some(utxo) if utxo.from_addr == input.from_addr && utxo.amount == input.amount => {}
                    Some(_) => return Err(invalid(format!("input {} does not match the referenced output", key))),
                    None => return Err(BlockchainError::DoubleSpend(key)),
                }
            }
        }

        let (input_total, output_total) = (tx.input_total(), tx.output_total());
        if input_total != output_total {
            return Err(invalid(format!(
                "inputs total {} but outputs total {}",
                input_total, output_total
            )));
        }
        Ok(contract_inputs)
    }

    fn check_fee(&self, tx: &Transaction) -> BlockchainResult<()> {
        let meta = self.meta();
        if meta.no_fee {
            return Ok(());
        }

        let reserved = self.get_reserved_contract_requests(&[])?;
        let skip = reserved_prefix_len(&reserved, &tx.contract_requests);
        let gas: Gas = tx.contract_requests[skip..]
            .iter()
            .filter_map(|r| r.resource_limits)
            .map(|limits| limits.total_gas(&meta.gas_price))
            .fold(0, Gas::saturating_add);

        let fee = tx.fee_amount();
        if fee < Amount::from_u64(gas) {
            return Err(invalid(format!("fee {} is less than gas {}", fee, gas)));
        }
        Ok(())
    }

    /// The reads `tx` declared, resolved to the values written at those versions
    fn tx_inputs_reader(&self, tx: &Transaction, scope: VerifyScope<'_>) -> BlockchainResult<TxInputsReader> {
        let earlier = match scope {
            VerifyScope::Admission => &[][..],
            VerifyScope::Block { earlier, .. } => earlier,
        };
        let mut declared = HashMap::new();

        for input in &tx.inputs_ext {
            let data = if input.ref_txid.is_empty() {
                None
            } else {
                let writer = match earlier.iter().find(|t| t.txid == input.ref_txid) {
                    Some(writer) => Some(writer.clone()),
                    None => self.query_tx(&input.ref_txid)?.map(|(writer, _)| writer),
                };
                let output = writer
                    .as_ref()
                    .and_then(|w| w.outputs_ext.get(input.ref_offset as usize))
                    .filter(|o| o.bucket == input.bucket && o.key == input.key)
                    .ok_or_else(|| {
                        BlockchainError::Conflict(format!(
                            "{}/{} has no version {}_{}",
                            input.bucket,
                            hex::encode(&input.key),
                            hex::encode(&input.ref_txid),
                            input.ref_offset
                        ))
                    })?;
                Some(VersionedData {
                    pure_data: PureData {
                        bucket: output.bucket.clone(),
                        key: output.key.clone(),
                        value: output.value.clone(),
                    },
                    ref_txid: input.ref_txid.clone(),
                    ref_offset: input.ref_offset,
                })
            };
            declared.insert((input.bucket.clone(), input.key.clone()), data);
        }

        Ok(TxInputsReader::new(declared, tx.tx_inputs.clone()))
    }

    /// Re-run the contract calls and require the same write set
    fn replay_contracts(
        &self,
        tx: &Transaction,
        scope: VerifyScope<'_>,
        contract_inputs: &[TxInput],
    ) -> BlockchainResult<()> {
        if tx.contract_requests.is_empty() {
            return Ok(());
        }
        let Some(manager) = self.contract_manager() else {
            if contract_inputs.is_empty() {
                return Ok(());
            }
            return Err(BlockchainError::Forbidden("contract inputs need a contract manager".into()));
        };

        let reader = Arc::new(self.tx_inputs_reader(tx, scope)?);
        let sandbox = manager.new_state_sandbox(&SandboxConfig {
            xm_reader: reader.clone(),
            utxo_reader: reader.clone(),
        })?;

        let reserved_len = if tx.is_timer_tx() {
            0
        } else {
            reserved_prefix_len(&self.get_reserved_contract_requests(&[])?, &tx.contract_requests)
        };
        let transfer = parse_contract_transfer_request(&tx.contract_requests)?;

        for (index, request) in tx.contract_requests.iter().enumerate() {
            if request.is_empty() {
                continue;
            }
            let is_reserved = index < reserved_len;

            let module = if request.module_name.is_empty() {
                declared_module(reader.as_ref(), &request.contract_name)?
            } else {
                request.module_name.clone()
            };
            let config = ContextConfig {
                state: sandbox.clone(),
                initiator: tx.initiator.clone(),
                auth_require: tx.auth_require.clone(),
                module,
                contract_name: request.contract_name.clone(),
                resource_limits: request.resource_limits.unwrap_or(ResourceLimits::MAX),
                transfer_amount: transfer
                    .as_ref()
                    .filter(|t| t.contract_name == request.contract_name)
                    .map(|t| t.amount.clone()),
            };

            let mut context = match manager.new_context(config) {
                Ok(context) => context,
                Err(BlockchainError::ContractNotFound(_)) if is_reserved => continue,
                Err(err) => return Err(err),
            };
            let result = context.invoke(&request.method_name, &request.args);
            let released = context.release();
            let response = result?;
            released?;

            if is_reserved && response.is_error() {
                return Err(BlockchainError::ContractError(format!(
                    "reserved {}.{} failed: {}",
                    request.contract_name, request.method_name, response.message
                )));
            }
        }

        sandbox.flush()?;
        if sandbox.rw_set().tx_outputs_ext() != tx.outputs_ext {
            return Err(invalid("contract write set does not match outputs_ext"));
        }
        let utxo = sandbox.utxo_rw_set();
        if contract_inputs.iter().any(|input| !utxo.rset.contains(input)) {
            return Err(BlockchainError::Forbidden("contract inputs not spent by the contract".into()));
        }
        if utxo.rset.iter().any(|input| !tx.tx_inputs.contains(input))
            || utxo.wset.iter().any(|output| !tx.tx_outputs.contains(output))
        {
            return Err(invalid("contract transfers do not match the utxo inputs and outputs"));
        }
        Ok(())
    }
}

/// Module of a deployed contract as seen through `reader`
fn declared_module(reader: &dyn XMReader, contract_name: &str) -> BlockchainResult<String> {
    let data = reader
        .get(CONTRACT_BUCKET, &contract_desc_key(contract_name))?
        .ok_or_else(|| BlockchainError::ContractNotFound(contract_name.to_string()))?;
    let desc: ContractDesc = serde_json::from_slice(&data.pure_data.value)?;
    Ok(desc.module)
}
