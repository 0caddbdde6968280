//! Due-date bookkeeping: decide which data sources a periodic tick
//! should trigger, and roll their `next_due_at` forward.

use chrono::{DateTime, Utc};

use rowline_model::{DataSourceId, Frequency, SyncStatus};

use crate::error::Result;
use crate::traits::ConfigStore;

/// Scan all data sources and return the ids whose schedule is due at
/// `now`. Each returned source has its `next_due_at` rolled forward;
/// sources seen for the first time get `next_due_at` initialized without
/// being triggered. Inactive sources, manual schedules, and sources
/// already syncing are skipped.
///
/// Actually running the returned syncs is the caller's job; a source
/// that stays due because its sync never ran will simply be returned
/// again on a later tick.
pub fn trigger_if_due(store: &impl ConfigStore, now: DateTime<Utc>) -> Result<Vec<DataSourceId>> {
    let mut due = Vec::new();

    for mut source in store.list_data_sources()? {
        if !source.active || source.schedule.frequency == Frequency::Manual {
            continue;
        }
        if source.status == SyncStatus::Syncing {
            continue;
        }

        match source.next_due_at {
            None => {
                // First sighting: plant the due date, do not trigger.
                if let Some(next) = rowline_schedule::next_run(&source.schedule, now) {
                    tracing::debug!(data_source = %source.id, %next, "initialized next due time");
                    source.next_due_at = Some(next);
                    store.put_data_source(&source)?;
                }
            }
            Some(when) if when <= now => {
                source.next_due_at = rowline_schedule::next_run(&source.schedule, now);
                store.put_data_source(&source)?;
                tracing::info!(data_source = %source.id, due_at = %when, "schedule due");
                due.push(source.id.clone());
            }
            Some(_) => {}
        }
    }

    Ok(due)
}
