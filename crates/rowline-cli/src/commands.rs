use std::fs::File;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use tracing::info;

use rowline_model::{AnalysisReport, ScheduleConfiguration, SyncLog, SyncLogStatus};
use rowline_sync::{
    MemoryConfigStore, SourceReader, SyncOptions, SyncOrchestrator, SystemClock, ThreadSleeper,
};

use crate::cli::{AnalyzeArgs, NextArgs, ScheduleArgs, ScheduleCommand, SyncArgs};
use crate::pipeline::{CsvSourceReader, JsonLinesWriter, PipelineFile};

pub fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let reader = CsvSourceReader::new(&args.csv);
    let columns = reader
        .headers()
        .with_context(|| format!("read {}", args.csv.display()))?;
    let rows = reader
        .read_sample(args.sample)
        .with_context(|| format!("sample {}", args.csv.display()))?;
    let report = rowline_analyze::analyze(&rows, &columns);
    info!(
        columns = report.columns.len(),
        rows = report.total_rows,
        "analyzed sample"
    );
    println!("{}", render_analysis(&report));
    println!("{} rows sampled", report.total_rows);
    Ok(())
}

/// Render the analysis report as a preview table.
pub fn render_analysis(report: &AnalysisReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Type", "Nulls", "Unique", "Samples"]);
    apply_table_style(&mut table);
    for index in [2, 3] {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    for column in &report.columns {
        let samples = column
            .sample_values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(column.detected_type.as_str()),
            Cell::new(column.null_count),
            Cell::new(column.unique_count),
            Cell::new(samples),
        ]);
    }
    table
}

pub fn run_schedule(command: &ScheduleCommand) -> Result<i32> {
    match command {
        ScheduleCommand::Validate(args) => {
            let config = load_schedule(args)?;
            let errors = rowline_schedule::validate(&config);
            if errors.is_empty() {
                println!("ok: {}", rowline_schedule::describe(&config));
                Ok(0)
            } else {
                for error in &errors {
                    println!("error: {error}");
                }
                Ok(1)
            }
        }
        ScheduleCommand::Describe(args) => {
            let config = load_schedule(args)?;
            println!("{}", rowline_schedule::describe(&config));
            Ok(0)
        }
        ScheduleCommand::Next(args) => {
            let config = load_schedule(&ScheduleArgs {
                config: args.config.clone(),
            })?;
            let after = parse_after(args)?;
            match rowline_schedule::next_run(&config, after) {
                Some(next) => {
                    println!("{}", next.to_rfc3339());
                    Ok(0)
                }
                None => {
                    println!("no upcoming run");
                    Ok(1)
                }
            }
        }
    }
}

fn parse_after(args: &NextArgs) -> Result<DateTime<Utc>> {
    match &args.after {
        Some(text) => {
            let parsed = DateTime::parse_from_rfc3339(text)
                .with_context(|| format!("parse timestamp '{text}'"))?;
            Ok(parsed.with_timezone(&Utc))
        }
        None => Ok(Utc::now()),
    }
}

fn load_schedule(args: &ScheduleArgs) -> Result<ScheduleConfiguration> {
    let file =
        File::open(&args.config).with_context(|| format!("open {}", args.config.display()))?;
    let config = serde_json::from_reader(file)
        .with_context(|| format!("parse {}", args.config.display()))?;
    Ok(config)
}

pub fn run_sync(args: &SyncArgs) -> Result<i32> {
    let pipeline = PipelineFile::load(&args.pipeline)
        .with_context(|| format!("load {}", args.pipeline.display()))?;
    let id = pipeline.data_source.id.clone();

    let reader = CsvSourceReader::new(&pipeline.source_csv);
    let writer = JsonLinesWriter::create(&pipeline.output)
        .with_context(|| format!("create {}", pipeline.output.display()))?;
    let store = MemoryConfigStore::with_data_source(pipeline.data_source);

    let orchestrator = SyncOrchestrator::new(
        reader,
        writer,
        store,
        SystemClock,
        Box::new(ThreadSleeper),
        pipeline.schema,
        SyncOptions::default(),
    );

    let log = orchestrator.run_sync_once(&id)?;
    print_sync_summary(&log);
    Ok(i32::from(log.status == SyncLogStatus::Failed))
}

fn print_sync_summary(log: &SyncLog) {
    let mut table = Table::new();
    table.set_header(vec!["Status", "Processed", "Flagged", "Dropped"]);
    apply_table_style(&mut table);
    let status = match log.status {
        SyncLogStatus::Running => "running",
        SyncLogStatus::Success => "success",
        SyncLogStatus::Failed => "failed",
    };
    table.add_row(vec![
        Cell::new(status),
        Cell::new(log.records_processed),
        Cell::new(log.records_failed),
        Cell::new(log.records_dropped),
    ]);
    println!("{table}");
    if let Some(message) = &log.error_message {
        println!("error: {message}");
    }
    for sample in &log.error_sample {
        println!("  {sample}");
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}
