pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_contract_registry;
mod m20250601_000002_create_upgrade_logs;
mod m20250601_000003_create_contract_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_contract_registry::Migration),
            Box::new(m20250601_000002_create_upgrade_logs::Migration),
            Box::new(m20250601_000003_create_contract_events::Migration),
        ]
    }
}
