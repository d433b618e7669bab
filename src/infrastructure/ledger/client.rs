use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::ResourceCost;
use crate::infrastructure::ledger::error::LedgerRpcError;

/// Base64 XDR transaction envelope, opaque to this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope(pub String);

impl TransactionEnvelope {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Dry-run answer for a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResponse {
    /// Resource fee in stroops the transaction must carry
    pub min_resource_fee: u64,
    pub cost: Option<ResourceCost>,
    /// Soroban transaction data (footprint) to attach before signing
    pub transaction_data: Option<String>,
    /// Archived entries must be restored before the transaction can succeed
    pub restore_required: bool,
    /// Set when the ledger rejected the dry run
    pub error: Option<String>,
    pub latest_ledger: u32,
}

impl SimulationResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTransactionResponse {
    pub hash: String,
    pub status: SendStatus,
    pub error: Option<String>,
}

impl SendTransactionResponse {
    /// Whether the ledger accepted the transaction for inclusion
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, SendStatus::Pending | SendStatus::Duplicate)
    }
}

/// Ledger view of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    NotFound,
    Pending,
    Success { ledger: u32 },
    Failed { ledger: Option<u32>, reason: String },
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Success { .. } | TransactionStatus::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: String,
    pub xdr: String,
    pub last_modified_ledger: u32,
}

/// Inclusion fee distribution over recent ledgers, in stroops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeStats {
    pub min: u64,
    pub mode: u64,
    pub p50: u64,
    pub p90: u64,
    pub max: u64,
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub contract_ids: Vec<String>,
    pub start_ledger: i64,
    pub limit: u32,
}

/// A contract event as returned by the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEvent {
    pub id: Option<String>,
    pub event_type: String,
    pub contract_id: Option<String>,
    pub ledger: i64,
    pub ledger_closed_at: Option<String>,
    pub tx_hash: Option<String>,
    pub topic: Vec<String>,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventsPage {
    pub events: Vec<LedgerEvent>,
    pub latest_ledger: u32,
}

/// Simulation/submission surface of the ledger RPC
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Dry-run a transaction against current ledger state
    async fn simulate_transaction(
        &self,
        transaction: &TransactionEnvelope,
    ) -> Result<SimulationResponse, LedgerRpcError>;

    /// Submit a signed transaction
    async fn send_transaction(
        &self,
        transaction: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, LedgerRpcError>;

    async fn get_transaction(&self, hash: &str) -> Result<TransactionStatus, LedgerRpcError>;

    /// Fetch ledger entries by base64 XDR key; missing keys are simply absent
    async fn get_ledger_entries(&self, keys: &[String]) -> Result<Vec<LedgerEntry>, LedgerRpcError>;

    async fn get_fee_stats(&self) -> Result<FeeStats, LedgerRpcError>;

    async fn get_events(&self, filter: &EventFilter) -> Result<EventsPage, LedgerRpcError>;
}
