use std::error::Error;
use std::fmt;
use thiserror::Error;

use crate::domain::models::UpgradeStatus;
use crate::infrastructure::ledger::{LedgerRpcError, SignerError};
use crate::infrastructure::persistence::error::DbError;

/// Errors surfaced by upgrade orchestrator operations
#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: upgrade log {log_id} is {status}")]
    InvalidState { log_id: i32, status: UpgradeStatus },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Simulation error: {0}")]
    Simulation(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Timeout: transaction {tx_hash} not confirmed after {attempts} attempts; status unknown, check explorer")]
    Timeout { tx_hash: String, attempts: u32 },
    #[error("Migration step '{step}' failed: {message}")]
    MigrationStep { step: String, message: String },
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerRpcError),
}

pub type UpgradeResult<T> = Result<T, UpgradeError>;

impl UpgradeError {
    /// HTTP status the presentation layer answers with
    pub fn status_code(&self) -> u16 {
        match self {
            UpgradeError::Validation(_) => 400,
            UpgradeError::NotFound(_) => 404,
            UpgradeError::InvalidState { .. } | UpgradeError::Conflict(_) => 409,
            _ => 500,
        }
    }
}

impl From<SignerError> for UpgradeError {
    fn from(error: SignerError) -> Self {
        match error {
            SignerError::InvalidSecret(msg) => UpgradeError::Validation(msg),
            other => UpgradeError::Execution(other.to_string()),
        }
    }
}

/// Error type for a single indexer poll cycle
#[derive(Debug)]
pub enum IndexerError {
    LedgerError(LedgerRpcError),
    DbError(DbError),
}

impl fmt::Display for IndexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexerError::LedgerError(e) => write!(f, "Ledger RPC error: {}", e),
            IndexerError::DbError(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl Error for IndexerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IndexerError::LedgerError(e) => Some(e),
            IndexerError::DbError(e) => Some(e),
        }
    }
}

impl From<LedgerRpcError> for IndexerError {
    fn from(error: LedgerRpcError) -> Self {
        IndexerError::LedgerError(error)
    }
}

impl From<DbError> for IndexerError {
    fn from(error: DbError) -> Self {
        IndexerError::DbError(error)
    }
}
