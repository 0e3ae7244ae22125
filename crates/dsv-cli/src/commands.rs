use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, info_span, warn};

use dsv_map::{
    Evaluation, JsonSnapshotFile, MappingRepository, MatchOptions, RebuildReport, RepositoryError,
    Staleness, StoredMappingMetadata, candidate_rows, create_version_mapping, evaluate, freeze,
    mapping_rows, rebuild_version_mapping, set_manual_mapping, staleness, write_candidate_rows_csv,
    write_mapping_rows_csv,
};
use dsv_model::{DataSetVersionMapping, GeographicLevel, MappingAddress, VersionId};

use crate::cli::{CategoryArg, ExportArgs, PlanArgs, SetArgs, ShowArgs, SnapshotArgs};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub store: PathBuf,
    pub options: MatchOptions,
}

impl CommandContext {
    pub fn new(store: impl Into<PathBuf>, options: MatchOptions) -> Self {
        Self {
            store: store.into(),
            options,
        }
    }

    fn repository(&self) -> Result<MappingRepository> {
        MappingRepository::new(&self.store).map_err(repository_error)
    }
}

/// Flattens a repository error into its user message and hint.
fn repository_error(error: RepositoryError) -> anyhow::Error {
    let message = error.user_message();
    match error.suggestion() {
        Some(hint) => anyhow!("{message}\nhint: {hint}"),
        None => anyhow!("{message}"),
    }
}

fn version_id(value: &str) -> Result<VersionId> {
    VersionId::new(value).with_context(|| format!("invalid version id `{value}`"))
}

fn load(repository: &MappingRepository, version: &str) -> Result<DataSetVersionMapping> {
    repository
        .load(&version_id(version)?)
        .map_err(repository_error)
}

fn save(repository: &MappingRepository, mapping: &mut DataSetVersionMapping) -> Result<PathBuf> {
    repository.save(mapping).map_err(repository_error)
}

/// A stored mapping and where it lives.
#[derive(Debug)]
pub struct SavedMapping {
    pub mapping: DataSetVersionMapping,
    pub path: PathBuf,
}

pub fn run_plan(context: &CommandContext, args: &PlanArgs) -> Result<SavedMapping> {
    let repository = context.repository()?;
    let source_version = version_id(&args.source_version)?;
    let target_version = version_id(&args.target_version)?;
    if repository.exists(&target_version) {
        bail!(
            "a mapping for version {target_version} already exists; use `rebuild` to refresh it"
        );
    }

    let mut mapping = create_version_mapping(
        &JsonSnapshotFile::new(&args.source),
        &JsonSnapshotFile::new(&args.target),
        source_version,
        target_version,
        context.options,
    )?;
    let path = save(&repository, &mut mapping)?;
    Ok(SavedMapping { mapping, path })
}

pub fn run_show(context: &CommandContext, args: &ShowArgs) -> Result<DataSetVersionMapping> {
    let repository = context.repository()?;
    load(&repository, &args.version)
}

/// Builds the address named by `set` arguments.
pub fn address_from_args(args: &SetArgs) -> Result<MappingAddress> {
    let source_key = args.source_key.clone();
    let address = match args.category {
        CategoryArg::Filter => MappingAddress::filter(source_key),
        CategoryArg::FilterOption => {
            let filter = args
                .filter
                .as_deref()
                .context("--filter is required for filter options")?;
            MappingAddress::filter_option(filter, source_key)
        }
        CategoryArg::Location => {
            let level = args
                .level
                .as_deref()
                .context("--level is required for locations")?;
            let level: GeographicLevel = level.parse()?;
            MappingAddress::location(level, source_key)
        }
        CategoryArg::Indicator => MappingAddress::indicator(source_key),
    };
    Ok(address)
}

/// Result of a `set` command. `path` is `None` when nothing changed.
#[derive(Debug)]
pub struct SetOutcome {
    pub address: MappingAddress,
    pub path: Option<PathBuf>,
}

pub fn run_set(context: &CommandContext, args: &SetArgs) -> Result<SetOutcome> {
    let repository = context.repository()?;
    let mut mapping = load(&repository, &args.version)?;
    let address = address_from_args(args)?;
    let candidate = if args.none {
        None
    } else {
        args.candidate.as_deref()
    };

    let changed = set_manual_mapping(&mut mapping, &address, candidate)?;
    if !changed {
        info!(%address, "mapping already in requested state");
        return Ok(SetOutcome {
            address,
            path: None,
        });
    }
    let path = save(&repository, &mut mapping)?;
    Ok(SetOutcome {
        address,
        path: Some(path),
    })
}

pub fn run_rebuild(context: &CommandContext, args: &SnapshotArgs) -> Result<RebuildReport> {
    let span = info_span!("rebuild", version = %args.version);
    let _guard = span.enter();

    let repository = context.repository()?;
    let mut mapping = load(&repository, &args.version)?;
    let report = rebuild_version_mapping(
        &mut mapping,
        &JsonSnapshotFile::new(&args.source),
        &JsonSnapshotFile::new(&args.target),
        context.options,
    )?;
    save(&repository, &mut mapping)?;
    if report.has_downgrades() {
        warn!(
            downgraded = report.downgraded.len(),
            "manual mappings lost their candidates and need review"
        );
    }
    Ok(report)
}

pub fn run_impact(context: &CommandContext, version: &str) -> Result<Evaluation> {
    let repository = context.repository()?;
    let mapping = load(&repository, version)?;
    Ok(evaluate(&mapping))
}

pub fn run_status(context: &CommandContext, args: &SnapshotArgs) -> Result<Staleness> {
    let repository = context.repository()?;
    let mapping = load(&repository, &args.version)?;
    let status = staleness(
        &mapping,
        &JsonSnapshotFile::new(&args.source),
        &JsonSnapshotFile::new(&args.target),
    )?;
    if status.is_stale() {
        warn!(
            version = %mapping.target_version,
            source_changed = status.source_changed,
            target_changed = status.target_changed,
            "snapshots changed since the mapping was built"
        );
    }
    Ok(status)
}

/// Freezes the stored mapping. Returns `false` if it was already frozen.
pub fn run_freeze(context: &CommandContext, version: &str) -> Result<bool> {
    let repository = context.repository()?;
    let mut mapping = load(&repository, version)?;
    if !freeze(&mut mapping) {
        return Ok(false);
    }
    save(&repository, &mut mapping)?;
    Ok(true)
}

/// Row counts written by `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCounts {
    pub mappings: usize,
    pub candidates: Option<usize>,
}

pub fn run_export(context: &CommandContext, args: &ExportArgs) -> Result<ExportCounts> {
    let repository = context.repository()?;
    let mapping = load(&repository, &args.version)?;

    let rows = mapping_rows(&mapping);
    write_mapping_rows_csv(create(&args.out)?, &rows)
        .with_context(|| format!("write {}", args.out.display()))?;

    let candidates = match &args.candidates {
        Some(path) => {
            let rows = candidate_rows(&mapping);
            write_candidate_rows_csv(create(path)?, &rows)
                .with_context(|| format!("write {}", path.display()))?;
            Some(rows.len())
        }
        None => None,
    };
    Ok(ExportCounts {
        mappings: rows.len(),
        candidates,
    })
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn run_list(context: &CommandContext) -> Result<Vec<StoredMappingMetadata>> {
    context.repository()?.list().map_err(repository_error)
}
