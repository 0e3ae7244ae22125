//! CLI argument definitions for the mapping tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dsv-mapper",
    version,
    about = "Map a published data set version onto its next draft",
    long_about = "Map the filters, locations and indicators of a published data set version \
                  onto the next draft version.\n\n\
                  Matching is by structural key; reviewers override individual mappings and \
                  their decisions survive rebuilds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
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

    /// Directory holding stored mappings.
    #[arg(long = "store", value_name = "DIR", default_value = "mappings", global = true)]
    pub store: PathBuf,

    /// Match categories one after another instead of in parallel.
    #[arg(long = "sequential", global = true)]
    pub sequential: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a mapping from two metadata snapshots.
    Plan(PlanArgs),

    /// Show a stored mapping.
    Show(ShowArgs),

    /// Override one mapping.
    Set(SetArgs),

    /// Re-match a mapping against new snapshots, keeping manual decisions.
    Rebuild(SnapshotArgs),

    /// Print compatibility facts as JSON.
    Impact(VersionArgs),

    /// Check whether the snapshots changed since the mapping was built.
    Status(SnapshotArgs),

    /// Make a mapping read-only.
    Freeze(VersionArgs),

    /// Write mapping and candidate rows as CSV.
    Export(ExportArgs),

    /// List stored mappings.
    List,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Snapshot of the published source version (JSON).
    #[arg(long = "source", value_name = "FILE")]
    pub source: PathBuf,

    /// Snapshot of the draft target version (JSON).
    #[arg(long = "target", value_name = "FILE")]
    pub target: PathBuf,

    #[arg(long = "source-version", value_name = "ID")]
    pub source_version: String,

    #[arg(long = "target-version", value_name = "ID")]
    pub target_version: String,
}

#[derive(Args)]
pub struct VersionArgs {
    /// Target version id of the mapping.
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Only list mappings without a candidate or awaiting review.
    #[arg(long = "unresolved")]
    pub unresolved: bool,
}

#[derive(Args)]
pub struct SnapshotArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,

    #[arg(long = "source", value_name = "FILE")]
    pub source: PathBuf,

    #[arg(long = "target", value_name = "FILE")]
    pub target: PathBuf,
}

#[derive(Args)]
pub struct SetArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,

    #[arg(long = "category", value_enum)]
    pub category: CategoryArg,

    /// Source key of the mapping to change.
    #[arg(long = "source-key", value_name = "KEY")]
    pub source_key: String,

    /// Owning filter key (filter options only).
    #[arg(long = "filter", value_name = "KEY")]
    pub filter: Option<String>,

    /// Geographic level code or name (locations only).
    #[arg(long = "level", value_name = "LEVEL")]
    pub level: Option<String>,

    /// Candidate key to map to.
    #[arg(
        long = "candidate",
        value_name = "KEY",
        conflicts_with = "none",
        required_unless_present = "none"
    )]
    pub candidate: Option<String>,

    /// Record that the entity has no equivalent.
    #[arg(long = "none")]
    pub none: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Mapping rows CSV.
    #[arg(long = "out", value_name = "FILE")]
    pub out: PathBuf,

    /// Candidate rows CSV.
    #[arg(long = "candidates", value_name = "FILE")]
    pub candidates: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Filter,
    FilterOption,
    Location,
    Indicator,
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
