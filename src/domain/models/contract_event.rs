use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A ledger-emitted contract event as stored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub event_id: String,
    pub contract_id: String,
    pub event_type: String,
    pub payload: Value,
    pub ledger_sequence: i64,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An event ready to be inserted; (event_id, contract_id) is its identity
#[derive(Debug, Clone, PartialEq)]
pub struct NewContractEvent {
    pub event_id: String,
    pub contract_id: String,
    pub event_type: String,
    pub payload: Value,
    pub ledger_sequence: i64,
    pub tx_hash: Option<String>,
}

impl NewContractEvent {
    /// Stable identity for events the ledger delivered without an id
    pub fn fallback_id(contract_id: &str, ledger_sequence: i64, tx_hash: Option<&str>) -> String {
        format!("{}-{}-{}", contract_id, ledger_sequence, tx_hash.unwrap_or(""))
    }
}

/// Indexing watermark for one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCheckpoint {
    pub stream_key: String,
    pub last_ledger_sequence: i64,
    pub updated_at: DateTime<Utc>,
}
