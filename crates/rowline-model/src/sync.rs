//! Sync status, sync logs, and the data source record that owns them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::column::ColumnConfig;
use crate::error::ModelError;
use crate::mapping::FieldMapping;
use crate::schedule::ScheduleConfiguration;

/// Identifier of a configured data source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSourceId(pub String);

impl DataSourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DataSourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sync state machine owned by the data source record.
///
/// Legal transitions: `idle -> syncing`, `syncing -> success|failed`,
/// `failed -> syncing` (retry), and `success|failed -> idle` once the
/// outcome has been surfaced. Transitions are the only legal mutation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }

    /// Whether moving to `next` is a legal state machine edge.
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Idle, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Success)
                | (SyncStatus::Syncing, SyncStatus::Failed)
                | (SyncStatus::Failed, SyncStatus::Syncing)
                | (SyncStatus::Success, SyncStatus::Idle)
                | (SyncStatus::Failed, SyncStatus::Idle)
        )
    }

    /// Validate and return the next status, or an error for illegal edges.
    pub fn transition_to(self, next: SyncStatus) -> Result<SyncStatus, ModelError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ModelError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one recorded sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLogStatus {
    Running,
    Success,
    Failed,
}

/// Cap on how many row error messages a log carries.
pub const ERROR_SAMPLE_CAP: usize = 20;

/// Append-only record of one sync attempt.
///
/// Created with `status = running` when the attempt starts; finalized once,
/// never mutated after `completed_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    pub data_source_id: DataSourceId,
    pub status: SyncLogStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Rows emitted to the destination, clean or flagged.
    pub records_processed: u64,
    /// Rows kept but flagged with one or more field errors.
    pub records_failed: u64,
    /// Rows intentionally excluded by a rule; not failures.
    pub records_dropped: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Capped sample of row-level error messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_sample: Vec<String>,
}

impl SyncLog {
    /// Start a new attempt log in the `running` state.
    pub fn start(data_source_id: DataSourceId, started_at: DateTime<Utc>) -> Self {
        Self {
            data_source_id,
            status: SyncLogStatus::Running,
            started_at,
            completed_at: None,
            records_processed: 0,
            records_failed: 0,
            records_dropped: 0,
            error_message: None,
            error_sample: Vec::new(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Finalize the attempt as successful.
    pub fn finish_success(&mut self, completed_at: DateTime<Utc>) {
        self.status = SyncLogStatus::Success;
        self.completed_at = Some(completed_at);
    }

    /// Finalize the attempt as failed with the last error.
    pub fn finish_failed(&mut self, completed_at: DateTime<Utc>, error: impl Into<String>) {
        self.status = SyncLogStatus::Failed;
        self.completed_at = Some(completed_at);
        self.error_message = Some(error.into());
    }

    /// Record a row-level error message, keeping at most [`ERROR_SAMPLE_CAP`].
    pub fn push_error_sample(&mut self, message: String) {
        if self.error_sample.len() < ERROR_SAMPLE_CAP {
            self.error_sample.push(message);
        }
    }
}

/// A configured, schedulable connection to an external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: DataSourceId,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    pub schedule: ScheduleConfiguration,
    #[serde(default)]
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Next scheduled trigger, maintained by the scheduler tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl DataSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DataSourceId::new(id),
            name: name.into(),
            columns: Vec::new(),
            mappings: Vec::new(),
            schedule: ScheduleConfiguration::manual(),
            status: SyncStatus::Idle,
            last_synced_at: None,
            next_due_at: None,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        assert!(SyncStatus::Idle.can_transition_to(SyncStatus::Syncing));
        assert!(SyncStatus::Syncing.can_transition_to(SyncStatus::Success));
        assert!(SyncStatus::Syncing.can_transition_to(SyncStatus::Failed));
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Syncing));
        assert!(SyncStatus::Success.can_transition_to(SyncStatus::Idle));
    }

    #[test]
    fn illegal_transitions_error() {
        assert!(SyncStatus::Idle.transition_to(SyncStatus::Success).is_err());
        assert!(
            SyncStatus::Success
                .transition_to(SyncStatus::Syncing)
                .is_err()
        );
        assert!(SyncStatus::Syncing.transition_to(SyncStatus::Idle).is_err());
    }

    #[test]
    fn log_finalization_sets_completed_at_once() {
        let started = Utc::now();
        let mut log = SyncLog::start(DataSourceId::new("ds-1"), started);
        assert_eq!(log.status, SyncLogStatus::Running);
        assert!(!log.is_finalized());

        log.finish_failed(started, "source unreachable");
        assert!(log.is_finalized());
        assert_eq!(log.status, SyncLogStatus::Failed);
        assert_eq!(log.error_message.as_deref(), Some("source unreachable"));
    }

    #[test]
    fn error_sample_is_capped() {
        let mut log = SyncLog::start(DataSourceId::new("ds-1"), Utc::now());
        for i in 0..(ERROR_SAMPLE_CAP + 10) {
            log.push_error_sample(format!("row {i}: bad value"));
        }
        assert_eq!(log.error_sample.len(), ERROR_SAMPLE_CAP);
    }
}
