use sea_orm::DatabaseConnection;

use crate::infrastructure::persistence::connection::DbPool;
use crate::infrastructure::persistence::repositories::{
    EventRepository, RegistryRepository, Repositories, UpgradeLogRepository,
};

/// Factory for creating repositories
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create all repositories
    pub fn create_repositories(db_pool: &DbPool) -> Repositories {
        let conn = db_pool.get_connection().clone();

        Repositories::new(
            Self::create_registry_repository(conn.clone()),
            Self::create_upgrade_log_repository(conn.clone()),
            Self::create_event_repository(conn),
        )
    }

    /// Create a registry repository
    pub fn create_registry_repository(conn: DatabaseConnection) -> RegistryRepository {
        RegistryRepository::new(conn)
    }

    /// Create an upgrade log repository
    pub fn create_upgrade_log_repository(conn: DatabaseConnection) -> UpgradeLogRepository {
        UpgradeLogRepository::new(conn)
    }

    /// Create an event repository
    pub fn create_event_repository(conn: DatabaseConnection) -> EventRepository {
        EventRepository::new(conn)
    }
}
