pub mod code_hash;
pub mod contract;
pub mod contract_event;
pub mod simulation;
pub mod upgrade_log;

pub use code_hash::{CodeHash, CodeHashError};
pub use contract::{ContractRegistryEntry, Network};
pub use contract_event::{ContractEvent, IndexCheckpoint, NewContractEvent};
pub use simulation::{ResourceCost, SimulationMode, SimulationResult};
pub use upgrade_log::{
    pending_steps, ConfirmedUpgrade, MigrationStep, NewUpgradeLog, StepStatus, UpgradeLog,
    UpgradeLogPage, UpgradeStatus,
};
