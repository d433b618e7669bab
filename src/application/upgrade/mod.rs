pub mod migration;
pub mod orchestrator;
pub mod simulation;
pub mod steps;
pub mod validation;

pub use migration::{MigrationAction, MigrationContext, MigrationRunner};
pub use orchestrator::{ExecutionReceipt, SimulationOutcome, UpgradeOrchestrator};
pub use steps::default_actions;
pub use validation::{CodeCheck, HashValidation};
