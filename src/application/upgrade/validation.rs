//! Code hash validation, including the advisory on-chain existence check

use serde::Serialize;

use crate::domain::errors::UpgradeError;
use crate::domain::models::{CodeHash, ContractRegistryEntry};
use crate::infrastructure::ledger::{xdr, LedgerRpc, LedgerRpcError};
use crate::utils::logging;

pub const IDENTICAL_TO_CURRENT: &str = "identical to current";
pub const CODE_NOT_FOUND: &str = "code not found on-chain";

/// Result of looking a code hash up on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CodeCheck {
    /// The code entry exists on-chain
    Found,
    /// The ledger answered and the code entry is absent
    Missing,
    /// The ledger could not be consulted
    Skipped { reason: String },
    /// No lookup was attempted because an earlier check already failed
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub on_chain: CodeCheck,
}

impl HashValidation {
    fn rejected(reason: &str, on_chain: CodeCheck) -> Self {
        Self {
            valid: false,
            reason: Some(reason.to_string()),
            on_chain,
        }
    }
}

/// Parse a caller-supplied hash, mapping format problems to `Validation`
pub fn parse_code_hash(value: &str) -> Result<CodeHash, UpgradeError> {
    CodeHash::parse(value).map_err(|e| UpgradeError::Validation(e.to_string()))
}

/// Look up the contract-code ledger entry for `hash`
pub async fn check_code_on_chain(
    ledger: &dyn LedgerRpc,
    hash: &CodeHash,
) -> Result<bool, LedgerRpcError> {
    let key = xdr::contract_code_key(hash)?;
    let entries = ledger.get_ledger_entries(std::slice::from_ref(&key)).await?;
    Ok(!entries.is_empty())
}

/// Validate `new_hash` against the registry entry and, when reachable, the ledger
pub async fn validate_code_hash(
    ledger: &dyn LedgerRpc,
    contract: &ContractRegistryEntry,
    new_hash: &CodeHash,
) -> HashValidation {
    if *new_hash == contract.current_code_hash {
        return HashValidation::rejected(IDENTICAL_TO_CURRENT, CodeCheck::NotAttempted);
    }

    match check_code_on_chain(ledger, new_hash).await {
        Ok(true) => HashValidation {
            valid: true,
            reason: None,
            on_chain: CodeCheck::Found,
        },
        Ok(false) => HashValidation::rejected(CODE_NOT_FOUND, CodeCheck::Missing),
        Err(e) => {
            logging::log_warning(&format!(
                "[UPGRADE] ⚠️ On-chain check for code {} skipped: {}",
                new_hash, e
            ));
            HashValidation {
                valid: true,
                reason: None,
                on_chain: CodeCheck::Skipped {
                    reason: e.to_string(),
                },
            }
        }
    }
}
