//! Collaborator interfaces consumed by the orchestrator.
//!
//! The wizard UI, persistence layer, and concrete readers/writers live
//! outside this crate; the orchestrator only sees these narrow traits.

use chrono::{DateTime, Utc};
use std::time::Duration;

use rowline_map::MappedRecord;
use rowline_model::{DataSource, DataSourceId, RawRow, SyncLog, SyncStatus};

use crate::error::Result;

/// One destination-shaped record with a stable key for idempotent upserts.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    /// Stable per-logical-row key; retries may rewrite the same key.
    pub key: String,
    pub fields: MappedRecord,
}

/// Outcome of one destination write call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: u64,
    pub failed: u64,
}

/// Reads raw rows from a configured external system.
///
/// `read_sample` is bounded and used for preview/analysis; `read_all`
/// streams the full dataset for a sync. Both may fail with a connection
/// error, which is fatal for the attempt.
pub trait SourceReader: Send + Sync {
    fn read_sample(&self, limit: usize) -> Result<Vec<RawRow>>;
    fn read_all(&self) -> Result<Box<dyn Iterator<Item = Result<RawRow>> + Send + '_>>;
}

/// Writes destination-shaped records. Upsert semantics by `key` expected:
/// reprocessing an already-written row must be harmless.
pub trait DestinationWriter: Send + Sync {
    fn write(&self, records: &[SyncRecord]) -> Result<WriteReport>;
}

/// Persists data sources and sync logs, and owns the per-source sync lease.
///
/// The lease is keyed in the store rather than held in process state so
/// that multiple orchestrator instances still exclude each other.
pub trait ConfigStore: Send + Sync {
    fn get_data_source(&self, id: &DataSourceId) -> Result<Option<DataSource>>;
    fn put_data_source(&self, source: &DataSource) -> Result<()>;
    fn list_data_sources(&self) -> Result<Vec<DataSource>>;
    fn update_status(&self, id: &DataSourceId, status: SyncStatus) -> Result<()>;

    /// Append a new attempt log (normally in the `running` state).
    fn append_sync_log(&self, log: &SyncLog) -> Result<()>;
    /// Replace the latest, still-running log for the source with its
    /// finalized form.
    fn finalize_sync_log(&self, log: &SyncLog) -> Result<()>;
    fn sync_logs(&self, id: &DataSourceId) -> Result<Vec<SyncLog>>;

    /// Try to take the per-source sync lease. Returns false when another
    /// sync already holds it.
    fn try_acquire_sync(&self, id: &DataSourceId) -> Result<bool>;
    fn release_sync(&self, id: &DataSourceId) -> Result<()>;
}

/// Supplies the current UTC instant. Injected for deterministic tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Blocks between retry attempts. Injected so tests need not wait.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Does not sleep. For tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}
