use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::sleep;

use super::migration::MigrationRunner;
use super::simulation;
use super::validation::{self, HashValidation, IDENTICAL_TO_CURRENT};
use crate::config::UpgradeConfig;
use crate::domain::errors::{UpgradeError, UpgradeResult};
use crate::domain::models::{
    pending_steps, CodeHash, ConfirmedUpgrade, ContractRegistryEntry, NewUpgradeLog,
    SimulationResult, UpgradeLog, UpgradeLogPage, UpgradeStatus,
};
use crate::infrastructure::ledger::{
    LedgerRpc, SigningSecret, TransactionStatus, UpgradeInvocation, UpgradeSigner,
};
use crate::infrastructure::persistence::{RegistryStore, UpgradeLogStore};
use crate::utils::logging;

pub const MAX_PAGE_SIZE: u64 = 100;

/// Returned by a simulation; the log exists whether or not the dry run passed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub upgrade_log_id: i32,
    pub simulation_result: SimulationResult,
}

/// Returned once the upgrade transaction is confirmed and migration has been
/// handed to the background
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
    pub upgrade_log_id: i32,
    pub tx_hash: String,
    pub status: UpgradeStatus,
}

/// Drives upgrade attempts through validation, simulation, execution and
/// migration. Cheap to clone; all state lives in the stores.
#[derive(Clone)]
pub struct UpgradeOrchestrator {
    registry: Arc<dyn RegistryStore>,
    logs: Arc<dyn UpgradeLogStore>,
    ledger: Arc<dyn LedgerRpc>,
    signer: Arc<dyn UpgradeSigner>,
    migrations: Arc<MigrationRunner>,
    config: UpgradeConfig,
}

impl fmt::Debug for UpgradeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeOrchestrator")
            .field("migrations", &self.migrations)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UpgradeOrchestrator {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        logs: Arc<dyn UpgradeLogStore>,
        ledger: Arc<dyn LedgerRpc>,
        signer: Arc<dyn UpgradeSigner>,
        migrations: Arc<MigrationRunner>,
        config: UpgradeConfig,
    ) -> Self {
        Self {
            registry,
            logs,
            ledger,
            signer,
            migrations,
            config,
        }
    }

    pub async fn list_contracts(&self) -> UpgradeResult<Vec<ContractRegistryEntry>> {
        Ok(self.registry.list_contracts().await?)
    }

    pub async fn get_contract(&self, registry_id: i32) -> UpgradeResult<ContractRegistryEntry> {
        self.registry
            .get_contract(registry_id)
            .await?
            .ok_or_else(|| UpgradeError::NotFound(format!("contract {}", registry_id)))
    }

    pub async fn validate_code_hash(
        &self,
        registry_id: i32,
        new_hash: &str,
    ) -> UpgradeResult<HashValidation> {
        let new_hash = validation::parse_code_hash(new_hash)?;
        let contract = self.get_contract(registry_id).await?;
        Ok(validation::validate_code_hash(self.ledger.as_ref(), &contract, &new_hash).await)
    }

    /// Record a new upgrade attempt and dry-run it.
    ///
    /// Exactly one log row is created for every call that passes input
    /// validation, including calls whose simulation fails.
    pub async fn simulate_upgrade(
        &self,
        registry_id: i32,
        new_hash: &str,
        initiated_by: &str,
        notes: Option<String>,
    ) -> UpgradeResult<SimulationOutcome> {
        let new_hash = validation::parse_code_hash(new_hash)?;
        let contract = self.get_contract(registry_id).await?;
        if new_hash == contract.current_code_hash {
            return Err(UpgradeError::Validation(format!(
                "code hash {}",
                IDENTICAL_TO_CURRENT
            )));
        }

        let log = self
            .logs
            .create_log(NewUpgradeLog {
                registry_id,
                previous_code_hash: contract.current_code_hash.clone(),
                new_code_hash: new_hash.clone(),
                initiated_by: initiated_by.to_string(),
                notes,
                migration_steps: pending_steps(self.migrations.step_names()),
            })
            .await?;

        logging::log_info(&format!(
            "[UPGRADE] 🧪 Simulating upgrade {} of {} to {}",
            log.id, contract.name, new_hash
        ));

        let invocation = invocation_for(&contract, &new_hash);
        match simulation::simulate_upgrade(self.ledger.as_ref(), self.signer.as_ref(), &invocation)
            .await
        {
            Ok(result) if result.success => {
                self.record_simulation(log.id, &result, UpgradeStatus::Simulated, None)
                    .await?;
                Ok(SimulationOutcome {
                    upgrade_log_id: log.id,
                    simulation_result: result,
                })
            }
            Ok(result) => {
                logging::log_warning(&format!(
                    "[UPGRADE] Simulation of upgrade {} rejected: {}",
                    log.id,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
                self.record_simulation(log.id, &result, UpgradeStatus::Failed, result.error.clone())
                    .await?;
                Ok(SimulationOutcome {
                    upgrade_log_id: log.id,
                    simulation_result: result,
                })
            }
            Err(e) => {
                let message = e.to_string();
                logging::log_error(&format!(
                    "[UPGRADE] ❌ Simulation of upgrade {} failed: {}",
                    log.id, message
                ));
                self.record_simulation(
                    log.id,
                    &SimulationResult::failed(message.clone()),
                    UpgradeStatus::Failed,
                    Some(message),
                )
                .await?;
                Err(e)
            }
        }
    }

    /// Operator sign-off on a simulated upgrade
    pub async fn confirm_upgrade(&self, log_id: i32) -> UpgradeResult<UpgradeLog> {
        self.require_log(log_id).await?;
        let moved = self
            .logs
            .transition(
                log_id,
                &[UpgradeStatus::Simulated],
                UpgradeStatus::Confirmed,
                None,
            )
            .await?;
        if !moved {
            return Err(self.invalid_state(log_id).await);
        }
        self.require_log(log_id).await
    }

    /// Sign, submit and confirm the upgrade transaction, then start migration
    /// in the background
    pub async fn execute_upgrade(
        &self,
        log_id: i32,
        secret: &SigningSecret,
    ) -> UpgradeResult<ExecutionReceipt> {
        let log = self.require_log(log_id).await?;
        if !log.status.can_execute() {
            return Err(UpgradeError::InvalidState {
                log_id,
                status: log.status,
            });
        }
        let contract = self.get_contract(log.registry_id).await?;

        let claimed = self
            .logs
            .transition(
                log_id,
                &UpgradeStatus::EXECUTABLE,
                UpgradeStatus::Executing,
                None,
            )
            .await?;
        if !claimed {
            return Err(self.invalid_state(log_id).await);
        }

        logging::log_info(&format!(
            "[UPGRADE] 🚀 Executing upgrade {} of {} ({} -> {})",
            log_id, contract.name, log.previous_code_hash, log.new_code_hash
        ));

        let tx_hash = match self.submit(&log, &contract, secret).await {
            Ok(hash) => hash,
            Err(e) => {
                self.fail(log_id, &e.to_string()).await;
                return Err(e);
            }
        };
        if let Err(e) = self.logs.set_tx_hash(log_id, &tx_hash).await {
            let message = format!("transaction {} submitted but not recorded: {}", tx_hash, e);
            self.fail(log_id, &message).await;
            return Err(e.into());
        }

        self.await_confirmation(log_id, &tx_hash).await?;

        let confirmed = ConfirmedUpgrade {
            log_id,
            registry_id: contract.id,
            tx_hash: tx_hash.clone(),
            new_code_hash: log.new_code_hash.clone(),
            upgraded_by: log.initiated_by.clone(),
        };
        if let Err(e) = self.logs.record_confirmed_upgrade(&confirmed).await {
            let message = format!(
                "transaction {} confirmed but registry not updated: {}",
                tx_hash, e
            );
            self.fail(log_id, &message).await;
            return Err(e.into());
        }

        logging::log_info(&format!(
            "[UPGRADE] ✅ Upgrade {} confirmed in {}, running migration steps",
            log_id, tx_hash
        ));

        let orchestrator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.migrations.run(log_id).await {
                // no-op when the runner already recorded the failure
                orchestrator
                    .fail(log_id, &format!("migration ended with error: {}", e))
                    .await;
            }
        });

        Ok(ExecutionReceipt {
            upgrade_log_id: log_id,
            tx_hash,
            status: UpgradeStatus::Executing,
        })
    }

    pub async fn run_migration_steps(&self, log_id: i32) -> UpgradeResult<()> {
        self.migrations.run(log_id).await
    }

    pub async fn get_upgrade_status(&self, log_id: i32) -> UpgradeResult<UpgradeLog> {
        self.require_log(log_id).await
    }

    /// Upgrade history of a contract, newest first. `page` starts at 1.
    pub async fn list_upgrade_logs(
        &self,
        registry_id: i32,
        page: u64,
        limit: u64,
    ) -> UpgradeResult<UpgradeLogPage> {
        if page == 0 {
            return Err(UpgradeError::Validation("page starts at 1".to_string()));
        }
        if limit == 0 {
            return Err(UpgradeError::Validation("limit must be positive".to_string()));
        }
        let limit = limit.min(MAX_PAGE_SIZE);
        self.get_contract(registry_id).await?;

        let (logs, total) = self.logs.list_logs(registry_id, page - 1, limit).await?;
        Ok(UpgradeLogPage {
            logs,
            page,
            limit,
            total,
        })
    }

    pub async fn cancel_upgrade(&self, log_id: i32) -> UpgradeResult<UpgradeLog> {
        let log = self.require_log(log_id).await?;
        let moved = log.status.can_cancel()
            && self
                .logs
                .transition(
                    log_id,
                    &UpgradeStatus::CANCELLABLE,
                    UpgradeStatus::Cancelled,
                    None,
                )
                .await?;
        if !moved {
            let status = self.require_log(log_id).await?.status;
            return Err(UpgradeError::Conflict(format!(
                "upgrade log {} is {} and can no longer be cancelled",
                log_id, status
            )));
        }
        logging::log_info(&format!("[UPGRADE] 🛑 Upgrade {} cancelled", log_id));
        self.require_log(log_id).await
    }

    async fn require_log(&self, log_id: i32) -> UpgradeResult<UpgradeLog> {
        self.logs
            .get_log(log_id)
            .await?
            .ok_or_else(|| UpgradeError::NotFound(format!("upgrade log {}", log_id)))
    }

    /// InvalidState carrying the status the row holds right now
    async fn invalid_state(&self, log_id: i32) -> UpgradeError {
        match self.require_log(log_id).await {
            Ok(log) => UpgradeError::InvalidState {
                log_id,
                status: log.status,
            },
            Err(e) => e,
        }
    }

    /// Store a dry-run outcome; a log cancelled meanwhile keeps its status
    async fn record_simulation(
        &self,
        log_id: i32,
        result: &SimulationResult,
        status: UpgradeStatus,
        error_message: Option<String>,
    ) -> UpgradeResult<()> {
        let recorded = self
            .logs
            .record_simulation(log_id, result, status, error_message)
            .await?;
        if !recorded {
            let current = self.require_log(log_id).await?.status;
            logging::log_warning(&format!(
                "[UPGRADE] Simulation of upgrade {} discarded, log is already {}",
                log_id, current
            ));
            return Err(UpgradeError::Conflict(format!(
                "upgrade log {} became {} while simulating",
                log_id, current
            )));
        }
        Ok(())
    }

    async fn fail(&self, log_id: i32, message: &str) {
        logging::log_error(&format!("[UPGRADE] ❌ Upgrade {} failed: {}", log_id, message));
        if let Err(e) = self
            .logs
            .transition(
                log_id,
                &[UpgradeStatus::Executing],
                UpgradeStatus::Failed,
                Some(message.to_string()),
            )
            .await
        {
            logging::log_error(&format!(
                "[UPGRADE] Could not record failure of upgrade {}: {}",
                log_id, e
            ));
        }
    }

    /// Build, dry-run for the footprint, sign and submit. Returns the tx hash.
    async fn submit(
        &self,
        log: &UpgradeLog,
        contract: &ContractRegistryEntry,
        secret: &SigningSecret,
    ) -> UpgradeResult<String> {
        let source = self.signer.public_key(secret).await?;
        let invocation = invocation_for(contract, &log.new_code_hash);
        let transaction = self.signer.build_upgrade(&source, &invocation).await?;

        let footprint = self
            .ledger
            .simulate_transaction(&transaction)
            .await
            .map_err(|e| UpgradeError::Execution(format!("footprint simulation failed: {}", e)))?;
        if let Some(error) = &footprint.error {
            return Err(UpgradeError::Execution(format!(
                "footprint simulation rejected: {}",
                error
            )));
        }

        let assembled = self.signer.assemble(&transaction, &footprint).await?;
        let signed = self.signer.sign(&assembled, secret, contract.network).await?;

        let sent = self
            .ledger
            .send_transaction(&signed)
            .await
            .map_err(|e| UpgradeError::Execution(format!("submission failed: {}", e)))?;
        if !sent.is_accepted() {
            return Err(UpgradeError::Execution(format!(
                "submission rejected ({:?}): {}",
                sent.status,
                sent.error.as_deref().unwrap_or("no detail")
            )));
        }

        logging::log_debug(&format!("[UPGRADE] Submitted {} for upgrade {}", sent.hash, log.id));
        Ok(sent.hash)
    }

    /// Poll the transaction a bounded number of times. Running out of attempts
    /// fails the log with the tx hash kept for manual follow-up.
    async fn await_confirmation(&self, log_id: i32, tx_hash: &str) -> UpgradeResult<u32> {
        let attempts = self.config.confirm_attempts;

        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(self.config.confirm_interval()).await;
            }

            match self.ledger.get_transaction(tx_hash).await {
                Ok(TransactionStatus::Success { ledger }) => return Ok(ledger),
                Ok(TransactionStatus::Failed { reason, .. }) => {
                    let message = format!("transaction {} failed on-chain: {}", tx_hash, reason);
                    self.fail(log_id, &message).await;
                    return Err(UpgradeError::Execution(message));
                }
                Ok(status) => logging::log_debug(&format!(
                    "[UPGRADE] {} is {:?} (attempt {}/{})",
                    tx_hash, status, attempt, attempts
                )),
                Err(e) => logging::log_warning(&format!(
                    "[UPGRADE] Status poll for {} failed (attempt {}/{}): {}",
                    tx_hash, attempt, attempts, e
                )),
            }
        }

        let timeout = UpgradeError::Timeout {
            tx_hash: tx_hash.to_string(),
            attempts,
        };
        logging::log_warning(&format!("[UPGRADE] ⏱️ Upgrade {}: {}", log_id, timeout));
        self.fail(log_id, &timeout.to_string()).await;
        Err(timeout)
    }
}

fn invocation_for(contract: &ContractRegistryEntry, new_hash: &CodeHash) -> UpgradeInvocation {
    UpgradeInvocation {
        contract_address: contract.contract_address.clone(),
        new_code_hash: new_hash.clone(),
        network: contract.network,
    }
}
