pub mod event_repository;
pub mod registry_repository;
pub mod upgrade_log_repository;

pub use event_repository::EventRepository;
pub use registry_repository::RegistryRepository;
pub use upgrade_log_repository::UpgradeLogRepository;

/// Collection of all repositories
pub struct Repositories {
    /// Repository for contract registry operations
    pub registry: RegistryRepository,
    /// Repository for upgrade log operations
    pub upgrade_logs: UpgradeLogRepository,
    /// Repository for contract event and checkpoint operations
    pub events: EventRepository,
}

impl Repositories {
    /// Create a new Repositories instance
    pub fn new(
        registry: RegistryRepository,
        upgrade_logs: UpgradeLogRepository,
        events: EventRepository,
    ) -> Self {
        Self {
            registry,
            upgrade_logs,
            events,
        }
    }
}
