//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "rowline",
    version,
    about = "Rowline - import, clean, and sync external data sources",
    long_about = "Analyze CSV data sources, configure cleaning rules and field\n\
                  mappings, compute sync schedules, and run one-shot syncs into\n\
                  a destination schema."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sample a CSV file and print detected column types.
    Analyze(AnalyzeArgs),

    /// Inspect a schedule configuration.
    #[command(subcommand)]
    Schedule(ScheduleCommand),

    /// Run one sync described by a pipeline file.
    Sync(SyncArgs),
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Path to the CSV file to sample.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Maximum number of rows to sample.
    #[arg(long = "sample", value_name = "ROWS", default_value_t = 100)]
    pub sample: usize,
}

#[derive(Subcommand)]
pub enum ScheduleCommand {
    /// Check a schedule configuration for problems.
    Validate(ScheduleArgs),

    /// Print a human-readable summary of a schedule.
    Describe(ScheduleArgs),

    /// Print the next run time of a schedule.
    Next(NextArgs),
}

#[derive(Parser)]
pub struct ScheduleArgs {
    /// Path to a schedule configuration JSON file.
    #[arg(long = "config", value_name = "PATH")]
    pub config: PathBuf,
}

#[derive(Parser)]
pub struct NextArgs {
    /// Path to a schedule configuration JSON file.
    #[arg(long = "config", value_name = "PATH")]
    pub config: PathBuf,

    /// Compute the next run after this UTC instant (RFC 3339) instead of now.
    #[arg(long = "after", value_name = "TIMESTAMP")]
    pub after: Option<String>,
}

#[derive(Parser)]
pub struct SyncArgs {
    /// Path to a pipeline JSON file (data source, schema, input, output).
    #[arg(value_name = "PIPELINE")]
    pub pipeline: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
