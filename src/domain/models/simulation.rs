use serde::{Deserialize, Serialize};

pub const RESTORE_WARNING: &str = "ledger entry restoration required";
pub const ESTIMATE_WARNING: &str =
    "no funded source account available; fee estimated from network fee statistics";

/// How a simulation result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Dry run of the real upgrade transaction
    Simulated,
    /// Degraded estimate from generic fee statistics
    Estimated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCost {
    pub cpu_instructions: u64,
    pub memory_bytes: u64,
    #[serde(default)]
    pub read_bytes: u64,
    #[serde(default)]
    pub write_bytes: u64,
}

/// Outcome of a dry run, persisted on the upgrade log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub success: bool,
    pub mode: SimulationMode,
    /// Fee in stroops, as a decimal string
    pub estimated_fee: String,
    #[serde(default)]
    pub resource_cost: Option<ResourceCost>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub latest_ledger: Option<u32>,
}

impl SimulationResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            mode: SimulationMode::Simulated,
            estimated_fee: "0".to_string(),
            resource_cost: None,
            warnings: Vec::new(),
            error: Some(error.into()),
            latest_ledger: None,
        }
    }

    pub fn is_estimate(&self) -> bool {
        self.mode == SimulationMode::Estimated
    }
}
