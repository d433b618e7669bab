//! Repository for upgrade_logs operations

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::fmt;

use crate::domain::models::{
    CodeHash, ConfirmedUpgrade, MigrationStep, NewUpgradeLog, SimulationResult, UpgradeLog,
    UpgradeStatus,
};
use crate::infrastructure::persistence::entities::{contract_registry, upgrade_logs};
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::store::UpgradeLogStore;

/// Repository for upgrade_logs operations
#[derive(Clone)]
pub struct UpgradeLogRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for UpgradeLogRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeLogRepository").finish_non_exhaustive()
    }
}

impl UpgradeLogRepository {
    /// Create a new UpgradeLogRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn status_values(statuses: &[UpgradeStatus]) -> Vec<&'static str> {
        statuses.iter().map(UpgradeStatus::as_str).collect()
    }

    /// Refuse updates that are not edges of the status state machine
    fn ensure_edges(from: &[UpgradeStatus], to: UpgradeStatus) -> Result<(), DbError> {
        match from.iter().find(|status| !status.can_transition_to(to)) {
            Some(status) => Err(DbError::QueryError(format!(
                "illegal upgrade status change {} -> {}",
                status, to
            ))),
            None => Ok(()),
        }
    }

    /// Convert a database entity to a domain model
    fn to_domain_model(entity: upgrade_logs::Model) -> Result<UpgradeLog, DbError> {
        let decode_hash = |value: &str, field: &str| {
            CodeHash::parse(value).map_err(|e| {
                DbError::DecodeError(format!("upgrade log {} {}: {}", entity.id, field, e))
            })
        };

        let previous_code_hash = decode_hash(&entity.previous_code_hash, "previous_code_hash")?;
        let new_code_hash = decode_hash(&entity.new_code_hash, "new_code_hash")?;
        let status = entity
            .status
            .parse::<UpgradeStatus>()
            .map_err(DbError::DecodeError)?;
        let simulation_result = entity
            .simulation_result
            .map(serde_json::from_value::<SimulationResult>)
            .transpose()?;
        let migration_steps: Vec<MigrationStep> = serde_json::from_value(entity.migration_steps)?;

        Ok(UpgradeLog {
            id: entity.id,
            registry_id: entity.registry_id,
            previous_code_hash,
            new_code_hash,
            status,
            simulation_result,
            tx_hash: entity.tx_hash,
            migration_steps,
            initiated_by: entity.initiated_by,
            notes: entity.notes,
            error_message: entity.error_message,
            created_at: entity.created_at.into(),
            completed_at: entity.completed_at.map(Into::into),
        })
    }
}

#[async_trait]
impl UpgradeLogStore for UpgradeLogRepository {
    async fn create_log(&self, log: NewUpgradeLog) -> Result<UpgradeLog, DbError> {
        let now = Utc::now();

        let model = upgrade_logs::ActiveModel {
            registry_id: Set(log.registry_id),
            previous_code_hash: Set(log.previous_code_hash.to_string()),
            new_code_hash: Set(log.new_code_hash.to_string()),
            status: Set(UpgradeStatus::Pending.as_str().to_string()),
            simulation_result: Set(None),
            tx_hash: Set(None),
            migration_steps: Set(serde_json::to_value(&log.migration_steps)?),
            initiated_by: Set(log.initiated_by),
            notes: Set(log.notes),
            error_message: Set(None),
            created_at: Set(now.into()),
            completed_at: Set(None),
            ..Default::default()
        };

        let inserted = model.insert(&self.conn).await?;
        Self::to_domain_model(inserted)
    }

    async fn get_log(&self, id: i32) -> Result<Option<UpgradeLog>, DbError> {
        upgrade_logs::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(Self::to_domain_model)
            .transpose()
    }

    async fn list_logs(
        &self,
        registry_id: i32,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<UpgradeLog>, u64), DbError> {
        let paginator = upgrade_logs::Entity::find()
            .filter(upgrade_logs::Column::RegistryId.eq(registry_id))
            .order_by_desc(upgrade_logs::Column::CreatedAt)
            .order_by_desc(upgrade_logs::Column::Id)
            .paginate(&self.conn, limit.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page).await?;

        let logs = rows
            .into_iter()
            .map(Self::to_domain_model)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((logs, total))
    }

    async fn transition(
        &self,
        id: i32,
        from: &[UpgradeStatus],
        to: UpgradeStatus,
        error_message: Option<String>,
    ) -> Result<bool, DbError> {
        Self::ensure_edges(from, to)?;

        let mut update = upgrade_logs::Entity::update_many()
            .col_expr(upgrade_logs::Column::Status, Expr::value(to.as_str()));

        if to.is_terminal() {
            update = update.col_expr(
                upgrade_logs::Column::CompletedAt,
                Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now()))),
            );
        }
        if let Some(message) = error_message {
            update = update.col_expr(upgrade_logs::Column::ErrorMessage, Expr::value(message));
        }

        let result = update
            .filter(upgrade_logs::Column::Id.eq(id))
            .filter(upgrade_logs::Column::Status.is_in(Self::status_values(from)))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn record_simulation(
        &self,
        id: i32,
        result: &SimulationResult,
        status: UpgradeStatus,
        error_message: Option<String>,
    ) -> Result<bool, DbError> {
        Self::ensure_edges(&[UpgradeStatus::Pending], status)?;

        let mut update = upgrade_logs::Entity::update_many()
            .col_expr(
                upgrade_logs::Column::SimulationResult,
                Expr::value(serde_json::to_value(result)?),
            )
            .col_expr(upgrade_logs::Column::Status, Expr::value(status.as_str()))
            .col_expr(upgrade_logs::Column::ErrorMessage, Expr::value(error_message));

        if status.is_terminal() {
            update = update.col_expr(
                upgrade_logs::Column::CompletedAt,
                Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now()))),
            );
        }

        let result = update
            .filter(upgrade_logs::Column::Id.eq(id))
            .filter(upgrade_logs::Column::Status.eq(UpgradeStatus::Pending.as_str()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn set_tx_hash(&self, id: i32, tx_hash: &str) -> Result<(), DbError> {
        upgrade_logs::Entity::update_many()
            .col_expr(upgrade_logs::Column::TxHash, Expr::value(tx_hash))
            .filter(upgrade_logs::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    async fn save_migration_steps(&self, id: i32, steps: &[MigrationStep]) -> Result<(), DbError> {
        let value = serde_json::to_value(steps)?;

        upgrade_logs::Entity::update_many()
            .col_expr(upgrade_logs::Column::MigrationSteps, Expr::value(value))
            .filter(upgrade_logs::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    async fn record_confirmed_upgrade(&self, upgrade: &ConfirmedUpgrade) -> Result<(), DbError> {
        let upgrade = upgrade.clone();

        self.conn
            .transaction::<_, (), DbError>(|txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let log_update = upgrade_logs::Entity::update_many()
                        .col_expr(upgrade_logs::Column::TxHash, Expr::value(upgrade.tx_hash.clone()))
                        .filter(upgrade_logs::Column::Id.eq(upgrade.log_id))
                        .filter(upgrade_logs::Column::RegistryId.eq(upgrade.registry_id))
                        .exec(txn)
                        .await?;
                    if log_update.rows_affected != 1 {
                        return Err(DbError::QueryError(format!(
                            "upgrade log {} not found for contract {}",
                            upgrade.log_id, upgrade.registry_id
                        )));
                    }

                    let registry_update = contract_registry::Entity::update_many()
                        .col_expr(
                            contract_registry::Column::CurrentCodeHash,
                            Expr::value(upgrade.new_code_hash.to_string()),
                        )
                        .col_expr(
                            contract_registry::Column::LastUpgradedAt,
                            Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(now))),
                        )
                        .col_expr(
                            contract_registry::Column::LastUpgradedBy,
                            Expr::value(Some(upgrade.upgraded_by.clone())),
                        )
                        .filter(contract_registry::Column::Id.eq(upgrade.registry_id))
                        .exec(txn)
                        .await?;
                    if registry_update.rows_affected != 1 {
                        return Err(DbError::QueryError(format!(
                            "contract {} not found",
                            upgrade.registry_id
                        )));
                    }

                    Ok(())
                })
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn affected(rows: &[u64]) -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(
                rows.iter()
                    .map(|n| MockExecResult {
                        last_insert_id: 0,
                        rows_affected: *n,
                    })
                    .collect::<Vec<_>>(),
            )
            .into_connection()
    }

    fn statements(conn: DatabaseConnection) -> String {
        format!("{:?}", conn.into_transaction_log())
    }

    fn confirmed() -> ConfirmedUpgrade {
        ConfirmedUpgrade {
            log_id: 7,
            registry_id: 1,
            tx_hash: "feedbeef".to_string(),
            new_code_hash: CodeHash::parse(&"b".repeat(64)).unwrap(),
            upgraded_by: "ops@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn transition_is_guarded_by_current_status() {
        let conn = affected(&[1, 0]);
        let repo = UpgradeLogRepository::new(conn.clone());

        let moved = repo
            .transition(7, &UpgradeStatus::CANCELLABLE, UpgradeStatus::Cancelled, None)
            .await
            .unwrap();
        let lost_race = repo
            .transition(7, &UpgradeStatus::CANCELLABLE, UpgradeStatus::Cancelled, None)
            .await
            .unwrap();

        assert!(moved);
        assert!(!lost_race);
        let sql = statements(conn);
        assert!(sql.contains("UPDATE"), "{}", sql);
        assert!(sql.contains("IN ($"), "{}", sql);
        assert!(sql.contains("completed_at"), "{}", sql);
    }

    #[tokio::test]
    async fn illegal_transition_never_reaches_the_database() {
        let conn = affected(&[]);
        let repo = UpgradeLogRepository::new(conn.clone());

        let result = repo
            .transition(7, &[UpgradeStatus::Completed], UpgradeStatus::Pending, None)
            .await;

        assert!(matches!(result, Err(DbError::QueryError(_))));
        assert_eq!(statements(conn), "[]");
    }

    #[tokio::test]
    async fn simulation_result_only_lands_on_pending_rows() {
        let conn = affected(&[0]);
        let repo = UpgradeLogRepository::new(conn.clone());

        let recorded = repo
            .record_simulation(
                7,
                &SimulationResult::failed("late"),
                UpgradeStatus::Failed,
                Some("late".to_string()),
            )
            .await
            .unwrap();

        assert!(!recorded);
        let sql = statements(conn);
        assert!(sql.contains("simulation_result"), "{}", sql);
        assert!(sql.contains("Some(\"pending\")"), "{}", sql);
    }

    #[tokio::test]
    async fn confirmed_upgrade_updates_log_and_registry_together() {
        let conn = affected(&[1, 1]);
        let repo = UpgradeLogRepository::new(conn.clone());

        repo.record_confirmed_upgrade(&confirmed()).await.unwrap();

        let sql = statements(conn);
        assert!(sql.contains("BEGIN"), "{}", sql);
        assert!(sql.contains("upgrade_logs"), "{}", sql);
        assert!(sql.contains("contract_registry"), "{}", sql);
        assert!(sql.contains("COMMIT"), "{}", sql);
    }

    #[tokio::test]
    async fn confirmed_upgrade_for_missing_log_leaves_registry_alone() {
        let conn = affected(&[0]);
        let repo = UpgradeLogRepository::new(conn.clone());

        let result = repo.record_confirmed_upgrade(&confirmed()).await;

        assert!(result.is_err());
        let sql = statements(conn);
        assert!(!sql.contains("contract_registry"), "{}", sql);
        assert!(!sql.contains("COMMIT"), "{}", sql);
    }
}
