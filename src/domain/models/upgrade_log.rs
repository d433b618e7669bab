use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CodeHash, SimulationResult};

/// Position of an upgrade in its lifecycle
///
/// ```text
/// pending -> simulated -> confirmed -> executing -> completed | failed
/// pending | simulated | confirmed -> cancelled
/// pending -> failed (simulation error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeStatus {
    Pending,
    Simulated,
    Confirmed,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl UpgradeStatus {
    pub const EXECUTABLE: [UpgradeStatus; 2] = [UpgradeStatus::Simulated, UpgradeStatus::Confirmed];
    pub const CANCELLABLE: [UpgradeStatus; 3] = [
        UpgradeStatus::Pending,
        UpgradeStatus::Simulated,
        UpgradeStatus::Confirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeStatus::Pending => "pending",
            UpgradeStatus::Simulated => "simulated",
            UpgradeStatus::Confirmed => "confirmed",
            UpgradeStatus::Executing => "executing",
            UpgradeStatus::Completed => "completed",
            UpgradeStatus::Failed => "failed",
            UpgradeStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, failed and cancelled rows never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UpgradeStatus::Completed | UpgradeStatus::Failed | UpgradeStatus::Cancelled
        )
    }

    pub fn can_execute(&self) -> bool {
        Self::EXECUTABLE.contains(self)
    }

    pub fn can_cancel(&self) -> bool {
        Self::CANCELLABLE.contains(self)
    }

    /// Whether `next` is an edge of the state machine starting at `self`
    pub fn can_transition_to(&self, next: UpgradeStatus) -> bool {
        use UpgradeStatus::*;
        matches!(
            (self, next),
            (Pending, Simulated)
                | (Pending, Failed)
                | (Simulated, Confirmed)
                | (Simulated, Executing)
                | (Confirmed, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Pending, Cancelled)
                | (Simulated, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for UpgradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UpgradeStatus::Pending),
            "simulated" => Ok(UpgradeStatus::Simulated),
            "confirmed" => Ok(UpgradeStatus::Confirmed),
            "executing" => Ok(UpgradeStatus::Executing),
            "completed" => Ok(UpgradeStatus::Completed),
            "failed" => Ok(UpgradeStatus::Failed),
            "cancelled" => Ok(UpgradeStatus::Cancelled),
            other => Err(format!("unknown upgrade status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One post-upgrade step, stored positionally inside its upgrade log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub id: u32,
    pub name: String,
    pub status: StepStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl MigrationStep {
    pub fn pending(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: StepStatus::Pending,
            message: None,
        }
    }
}

/// Build the initial, all-pending step list for the given step names
pub fn pending_steps<'a, I>(names: I) -> Vec<MigrationStep>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .enumerate()
        .map(|(position, name)| MigrationStep::pending(position as u32, name))
        .collect()
}

/// An upgrade attempt and its progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeLog {
    pub id: i32,
    pub registry_id: i32,
    pub previous_code_hash: CodeHash,
    pub new_code_hash: CodeHash,
    pub status: UpgradeStatus,
    pub simulation_result: Option<SimulationResult>,
    pub tx_hash: Option<String>,
    pub migration_steps: Vec<MigrationStep>,
    pub initiated_by: String,
    pub notes: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when an upgrade attempt is first recorded
#[derive(Debug, Clone)]
pub struct NewUpgradeLog {
    pub registry_id: i32,
    pub previous_code_hash: CodeHash,
    pub new_code_hash: CodeHash,
    pub initiated_by: String,
    pub notes: Option<String>,
    pub migration_steps: Vec<MigrationStep>,
}

/// Everything written when the ledger confirms an upgrade transaction
#[derive(Debug, Clone)]
pub struct ConfirmedUpgrade {
    pub log_id: i32,
    pub registry_id: i32,
    pub tx_hash: String,
    pub new_code_hash: CodeHash,
    pub upgraded_by: String,
}

/// One page of upgrade logs, newest first
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeLogPage {
    pub logs: Vec<UpgradeLog>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}
