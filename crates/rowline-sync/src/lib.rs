//! Sync orchestration: runs configured data sources through the
//! analyze/clean/map pipeline against pluggable readers, writers, and
//! config stores, with schedule-driven triggering and retry handling.

pub mod error;
pub mod orchestrator;
pub mod scheduler;
pub mod store;
pub mod traits;

pub use error::{Result, SyncError};
pub use orchestrator::{CancelFlag, SyncOptions, SyncOrchestrator, derive_record_key};
pub use scheduler::trigger_if_due;
pub use store::MemoryConfigStore;
pub use traits::{
    Clock, ConfigStore, DestinationWriter, NoSleep, Sleeper, SourceReader, SyncRecord,
    SystemClock, ThreadSleeper, WriteReport,
};
