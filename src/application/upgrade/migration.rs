use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::{UpgradeError, UpgradeResult};
use crate::domain::models::{ContractRegistryEntry, MigrationStep, StepStatus, UpgradeLog, UpgradeStatus};
use crate::infrastructure::persistence::{RegistryStore, UpgradeLogStore};
use crate::utils::logging;

/// State a migration step can inspect
#[derive(Debug, Clone)]
pub struct MigrationContext {
    pub log: UpgradeLog,
    pub contract: ContractRegistryEntry,
}

/// One post-upgrade step. The returned text is stored as the step message.
#[async_trait]
pub trait MigrationAction: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &MigrationContext) -> anyhow::Result<String>;
}

/// Runs the steps recorded on an upgrade log, in order, persisting progress
/// after every state change
pub struct MigrationRunner {
    logs: Arc<dyn UpgradeLogStore>,
    registry: Arc<dyn RegistryStore>,
    actions: Vec<Arc<dyn MigrationAction>>,
}

impl fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("steps", &self.step_names())
            .finish_non_exhaustive()
    }
}

impl MigrationRunner {
    pub fn new(
        logs: Arc<dyn UpgradeLogStore>,
        registry: Arc<dyn RegistryStore>,
        actions: Vec<Arc<dyn MigrationAction>>,
    ) -> Self {
        Self {
            logs,
            registry,
            actions,
        }
    }

    /// Names recorded on every new upgrade log
    pub fn step_names(&self) -> Vec<&str> {
        self.actions.iter().map(|action| action.name()).collect()
    }

    fn action(&self, name: &str) -> Option<&Arc<dyn MigrationAction>> {
        self.actions.iter().find(|action| action.name() == name)
    }

    /// Run every step not yet completed. Any failure after the status check
    /// leaves the log `failed`.
    pub async fn run(&self, log_id: i32) -> UpgradeResult<()> {
        let log = self
            .logs
            .get_log(log_id)
            .await?
            .ok_or_else(|| UpgradeError::NotFound(format!("upgrade log {}", log_id)))?;

        if log.status != UpgradeStatus::Executing {
            return Err(UpgradeError::InvalidState {
                log_id,
                status: log.status,
            });
        }

        let result = self.run_steps(log).await;
        if let Err(e) = &result {
            self.abort(log_id, e).await;
        }
        result
    }

    async fn run_steps(&self, log: UpgradeLog) -> UpgradeResult<()> {
        let log_id = log.id;
        let contract = self
            .registry
            .get_contract(log.registry_id)
            .await?
            .ok_or_else(|| UpgradeError::NotFound(format!("contract {}", log.registry_id)))?;

        let mut steps: Vec<MigrationStep> = log.migration_steps.clone();
        let ctx = MigrationContext { log, contract };

        for index in 0..steps.len() {
            if steps[index].status == StepStatus::Completed {
                continue;
            }

            let name = steps[index].name.clone();
            steps[index].status = StepStatus::Running;
            steps[index].message = None;
            self.logs.save_migration_steps(log_id, &steps).await?;

            logging::log_info(&format!(
                "[MIGRATION] ▶️ Upgrade {} step {}/{}: {}",
                log_id,
                index + 1,
                steps.len(),
                name
            ));

            let outcome = match self.action(&name) {
                Some(action) => action.run(&ctx).await,
                None => Err(anyhow::anyhow!("no handler registered for step '{}'", name)),
            };

            match outcome {
                Ok(message) => {
                    steps[index].status = StepStatus::Completed;
                    steps[index].message = Some(message);
                    self.logs.save_migration_steps(log_id, &steps).await?;
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    steps[index].status = StepStatus::Failed;
                    steps[index].message = Some(message.clone());
                    if let Err(e) = self.logs.save_migration_steps(log_id, &steps).await {
                        logging::log_error(&format!(
                            "[MIGRATION] Could not record failed step '{}' of upgrade {}: {}",
                            name, log_id, e
                        ));
                    }
                    return Err(UpgradeError::MigrationStep {
                        step: name,
                        message,
                    });
                }
            }
        }

        let moved = self
            .logs
            .transition(log_id, &[UpgradeStatus::Executing], UpgradeStatus::Completed, None)
            .await?;
        if !moved {
            return Err(UpgradeError::Conflict(format!(
                "upgrade log {} left executing while migrating",
                log_id
            )));
        }

        logging::log_info(&format!(
            "[MIGRATION] ✅ Upgrade {} completed {} steps",
            log_id,
            steps.len()
        ));
        Ok(())
    }

    /// Best-effort `executing -> failed`; a row that already moved on is left alone
    async fn abort(&self, log_id: i32, error: &UpgradeError) {
        let message = match error {
            UpgradeError::MigrationStep { step, message } => {
                format!("migration step '{}' failed: {}", step, message)
            }
            other => format!("migration aborted: {}", other),
        };
        logging::log_error(&format!("[MIGRATION] ❌ Upgrade {} stopped: {}", log_id, message));

        if let Err(e) = self
            .logs
            .transition(
                log_id,
                &[UpgradeStatus::Executing],
                UpgradeStatus::Failed,
                Some(message),
            )
            .await
        {
            logging::log_error(&format!(
                "[MIGRATION] Could not record failure of upgrade {}: {}",
                log_id, e
            ));
        }
    }
}
