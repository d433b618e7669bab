//! Dry runs of upgrade transactions, with a fee-statistics fallback when no
//! funded source account is available

use crate::domain::errors::UpgradeError;
use crate::domain::models::simulation::{ESTIMATE_WARNING, RESTORE_WARNING};
use crate::domain::models::{SimulationMode, SimulationResult};
use crate::infrastructure::ledger::{
    xdr, LedgerRpc, SimulationResponse, UpgradeInvocation, UpgradeSigner,
};
use crate::utils::logging;

/// Minimum inclusion fee per operation, in stroops
pub const BASE_INCLUSION_FEE: u64 = 100;

/// The configured simulation source, if it exists on the ledger
pub async fn resolve_funded_source(
    ledger: &dyn LedgerRpc,
    signer: &dyn UpgradeSigner,
) -> Option<String> {
    let source = signer.simulation_source()?;

    let key = match xdr::account_key(&source) {
        Ok(key) => key,
        Err(e) => {
            logging::log_warning(&format!("[UPGRADE] Simulation source unusable: {}", e));
            return None;
        }
    };

    match ledger.get_ledger_entries(&[key]).await {
        Ok(entries) if !entries.is_empty() => Some(source),
        Ok(_) => {
            logging::log_warning(&format!(
                "[UPGRADE] Simulation source {} is not funded",
                source
            ));
            None
        }
        Err(e) => {
            logging::log_warning(&format!(
                "[UPGRADE] Could not look up simulation source {}: {}",
                source, e
            ));
            None
        }
    }
}

/// Map a ledger dry run onto the persisted result shape
pub fn to_simulation_result(response: &SimulationResponse) -> SimulationResult {
    let mut warnings = Vec::new();
    if response.restore_required {
        warnings.push(RESTORE_WARNING.to_string());
    }

    SimulationResult {
        success: response.is_success(),
        mode: SimulationMode::Simulated,
        estimated_fee: (response.min_resource_fee + BASE_INCLUSION_FEE).to_string(),
        resource_cost: response.cost.clone(),
        warnings,
        error: response.error.clone(),
        latest_ledger: Some(response.latest_ledger),
    }
}

/// Dry-run the upgrade, or estimate its fee when it cannot be dry-run.
///
/// `Ok` with `success == false` means the ledger rejected the transaction;
/// `Err` means the ledger or the key holder could not be consulted.
pub async fn simulate_upgrade(
    ledger: &dyn LedgerRpc,
    signer: &dyn UpgradeSigner,
    invocation: &UpgradeInvocation,
) -> Result<SimulationResult, UpgradeError> {
    match resolve_funded_source(ledger, signer).await {
        Some(source) => {
            let transaction = signer
                .build_upgrade(&source, invocation)
                .await
                .map_err(|e| UpgradeError::Simulation(e.to_string()))?;
            let response = ledger
                .simulate_transaction(&transaction)
                .await
                .map_err(|e| UpgradeError::Simulation(e.to_string()))?;
            Ok(to_simulation_result(&response))
        }
        None => {
            let stats = ledger
                .get_fee_stats()
                .await
                .map_err(|e| UpgradeError::Simulation(e.to_string()))?;
            Ok(SimulationResult {
                success: true,
                mode: SimulationMode::Estimated,
                estimated_fee: stats.p90.max(BASE_INCLUSION_FEE).to_string(),
                resource_cost: None,
                warnings: vec![ESTIMATE_WARNING.to_string()],
                error: None,
                latest_ledger: Some(stats.latest_ledger),
            })
        }
    }
}
