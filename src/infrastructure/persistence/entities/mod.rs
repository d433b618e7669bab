pub mod contract_events;
pub mod contract_registry;
pub mod index_checkpoints;
pub mod upgrade_logs;
