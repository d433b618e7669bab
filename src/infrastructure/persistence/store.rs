//! Storage seams used by the orchestrator and the indexer.
//!
//! The SeaORM repositories implement these for Postgres; anything else that
//! honours the same row-level atomicity can stand in for them.

use async_trait::async_trait;

use crate::domain::models::{
    ConfirmedUpgrade, ContractEvent, ContractRegistryEntry, IndexCheckpoint, MigrationStep,
    Network, NewContractEvent, NewUpgradeLog, SimulationResult, UpgradeLog, UpgradeStatus,
};
use crate::infrastructure::persistence::error::DbError;

#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn list_contracts(&self) -> Result<Vec<ContractRegistryEntry>, DbError>;

    async fn get_contract(&self, id: i32) -> Result<Option<ContractRegistryEntry>, DbError>;

    /// Contract addresses registered on a network
    async fn contract_addresses(&self, network: Network) -> Result<Vec<String>, DbError>;
}

#[async_trait]
pub trait UpgradeLogStore: Send + Sync {
    /// Insert a new log in `pending`
    async fn create_log(&self, log: NewUpgradeLog) -> Result<UpgradeLog, DbError>;

    async fn get_log(&self, id: i32) -> Result<Option<UpgradeLog>, DbError>;

    /// Logs for a contract, newest first, with the total count
    async fn list_logs(
        &self,
        registry_id: i32,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<UpgradeLog>, u64), DbError>;

    /// Move a log to `to` only if its current status is one of `from`.
    /// Returns false when the row was not in an allowed status.
    /// `completed_at` is stamped when `to` is terminal.
    async fn transition(
        &self,
        id: i32,
        from: &[UpgradeStatus],
        to: UpgradeStatus,
        error_message: Option<String>,
    ) -> Result<bool, DbError>;

    /// Store the dry-run outcome together with the status it leads to.
    /// Only a `pending` row is updated; false means the row moved on first.
    async fn record_simulation(
        &self,
        id: i32,
        result: &SimulationResult,
        status: UpgradeStatus,
        error_message: Option<String>,
    ) -> Result<bool, DbError>;

    async fn set_tx_hash(&self, id: i32, tx_hash: &str) -> Result<(), DbError>;

    /// Overwrite the whole step list
    async fn save_migration_steps(&self, id: i32, steps: &[MigrationStep]) -> Result<(), DbError>;

    /// Write the confirmed transaction hash and move the registry entry to the
    /// new code hash in one unit of work
    async fn record_confirmed_upgrade(&self, upgrade: &ConfirmedUpgrade) -> Result<(), DbError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create backing tables and the checkpoint row if missing
    async fn initialize(&self, stream_key: &str) -> Result<(), DbError>;

    async fn get_checkpoint(&self, stream_key: &str) -> Result<Option<IndexCheckpoint>, DbError>;

    /// Insert all events atomically, ignoring ones already stored.
    /// Returns the number of new rows.
    async fn insert_events(&self, events: &[NewContractEvent]) -> Result<u64, DbError>;

    /// Move the checkpoint to `ledger_sequence` if that is ahead of it
    async fn advance_checkpoint(&self, stream_key: &str, ledger_sequence: i64)
        -> Result<(), DbError>;

    async fn list_events(
        &self,
        contract_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Vec<ContractEvent>, DbError>;

    async fn count_events(&self) -> Result<u64, DbError>;
}
