//! Concrete reader/writer pair for one-shot CLI syncs: CSV in, JSON
//! lines out, plus the pipeline file tying them to a data source.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use rowline_model::{DataSource, DestinationSchema, RawRow, Value};
use rowline_sync::{DestinationWriter, Result, SourceReader, SyncError, SyncRecord, WriteReport};

/// Everything one `rowline sync` invocation needs, in a single JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    /// CSV file to read, relative to the pipeline file's directory.
    pub source_csv: PathBuf,
    /// JSON-lines output path, relative to the pipeline file's directory.
    pub output: PathBuf,
    pub schema: DestinationSchema,
    pub data_source: DataSource,
}

impl PipelineFile {
    /// Load a pipeline file and resolve its relative paths.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let mut pipeline: PipelineFile = serde_json::from_reader(file)?;
        if let Some(base) = path.parent() {
            pipeline.source_csv = base.join(&pipeline.source_csv);
            pipeline.output = base.join(&pipeline.output);
        }
        Ok(pipeline)
    }
}

/// Reads rows from a CSV file with a header row.
///
/// Empty cells become null values; everything else enters the pipeline as
/// text and is typed by cleaning rules downstream.
pub struct CsvSourceReader {
    path: PathBuf,
}

impl CsvSourceReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Column names from the header row, in file order.
    pub fn headers(&self) -> Result<Vec<String>> {
        let mut reader = self.open()?;
        let headers = reader.headers().map_err(csv_error)?;
        Ok(headers.iter().map(ToString::to_string).collect())
    }

    fn open(&self) -> Result<csv::Reader<File>> {
        csv::Reader::from_path(&self.path).map_err(csv_error)
    }
}

fn csv_error(error: csv::Error) -> SyncError {
    SyncError::Connection(error.to_string())
}

fn record_to_row(headers: &csv::StringRecord, record: &csv::StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(header, cell)| {
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::Text(cell.to_string())
            };
            (header.to_string(), value)
        })
        .collect()
}

impl SourceReader for CsvSourceReader {
    fn read_sample(&self, limit: usize) -> Result<Vec<RawRow>> {
        let mut reader = self.open()?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        let mut rows = Vec::new();
        for record in reader.records().take(limit) {
            let record = record.map_err(csv_error)?;
            rows.push(record_to_row(&headers, &record));
        }
        Ok(rows)
    }

    fn read_all(&self) -> Result<Box<dyn Iterator<Item = Result<RawRow>> + Send + '_>> {
        let mut reader = self.open()?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        Ok(Box::new(reader.into_records().map(move |record| {
            record
                .map(|r| record_to_row(&headers, &r))
                .map_err(csv_error)
        })))
    }
}

/// Writes destination records as one JSON object per line. The record key
/// lands in a reserved `_key` field next to the mapped fields.
pub struct JsonLinesWriter {
    out: Mutex<BufWriter<File>>,
}

impl JsonLinesWriter {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl DestinationWriter for JsonLinesWriter {
    fn write(&self, records: &[SyncRecord]) -> Result<WriteReport> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| SyncError::Store("output lock poisoned".to_string()))?;
        for record in records {
            let mut object = serde_json::Map::new();
            object.insert("_key".to_string(), serde_json::Value::String(record.key.clone()));
            for (field, value) in &record.fields {
                let json = serde_json::to_value(value)
                    .map_err(|e| SyncError::Connection(e.to_string()))?;
                object.insert(field.clone(), json);
            }
            serde_json::to_writer(&mut *out, &object)
                .map_err(|e| SyncError::Connection(e.to_string()))?;
            writeln!(out).map_err(|e| SyncError::Connection(e.to_string()))?;
        }
        out.flush()
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        Ok(WriteReport {
            written: records.len() as u64,
            failed: 0,
        })
    }
}
