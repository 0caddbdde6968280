pub mod column;
pub mod error;
pub mod mapping;
pub mod rules;
pub mod schedule;
pub mod sync;
pub mod value;

pub use column::{AnalysisReport, ColumnConfig, ColumnPreview, ColumnType};
pub use error::{ModelError, Result};
pub use mapping::{DestinationSchema, FieldMapping, SchemaField};
pub use rules::{CleaningRule, InvalidPolicy, PhoneFormat};
pub use schedule::{Frequency, ScheduleConfiguration};
pub use sync::{DataSource, DataSourceId, SyncLog, SyncLogStatus, SyncStatus};
pub use value::{RawRow, Value};
