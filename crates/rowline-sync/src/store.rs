//! In-memory `ConfigStore` used by tests and the CLI's one-shot runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use rowline_model::{DataSource, DataSourceId, SyncLog, SyncStatus};

use crate::error::{Result, SyncError};
use crate::traits::ConfigStore;

#[derive(Debug, Default)]
struct Inner {
    sources: BTreeMap<DataSourceId, DataSource>,
    logs: BTreeMap<DataSourceId, Vec<SyncLog>>,
    leases: BTreeSet<DataSourceId>,
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    inner: Mutex<Inner>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a data source.
    pub fn with_data_source(source: DataSource) -> Self {
        let store = Self::new();
        store.put_data_source(&source).expect("fresh store");
        store
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| SyncError::Store("store lock poisoned".to_string()))
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_data_source(&self, id: &DataSourceId) -> Result<Option<DataSource>> {
        Ok(self.lock()?.sources.get(id).cloned())
    }

    fn put_data_source(&self, source: &DataSource) -> Result<()> {
        self.lock()?.sources.insert(source.id.clone(), source.clone());
        Ok(())
    }

    fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        Ok(self.lock()?.sources.values().cloned().collect())
    }

    fn update_status(&self, id: &DataSourceId, status: SyncStatus) -> Result<()> {
        let mut inner = self.lock()?;
        let source = inner
            .sources
            .get_mut(id)
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        source.status = status;
        Ok(())
    }

    fn append_sync_log(&self, log: &SyncLog) -> Result<()> {
        self.lock()?
            .logs
            .entry(log.data_source_id.clone())
            .or_default()
            .push(log.clone());
        Ok(())
    }

    fn finalize_sync_log(&self, log: &SyncLog) -> Result<()> {
        let mut inner = self.lock()?;
        let logs = inner
            .logs
            .get_mut(&log.data_source_id)
            .ok_or_else(|| SyncError::Store("no logs for data source".to_string()))?;
        let last = logs
            .last_mut()
            .filter(|l| !l.is_finalized())
            .ok_or_else(|| SyncError::Store("no running log to finalize".to_string()))?;
        *last = log.clone();
        Ok(())
    }

    fn sync_logs(&self, id: &DataSourceId) -> Result<Vec<SyncLog>> {
        Ok(self.lock()?.logs.get(id).cloned().unwrap_or_default())
    }

    fn try_acquire_sync(&self, id: &DataSourceId) -> Result<bool> {
        Ok(self.lock()?.leases.insert(id.clone()))
    }

    fn release_sync(&self, id: &DataSourceId) -> Result<()> {
        self.lock()?.leases.remove(id);
        Ok(())
    }
}
