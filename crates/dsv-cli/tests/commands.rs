//! End-to-end tests for the command layer.

use std::fs;
use std::path::{Path, PathBuf};

use dsv_cli::cli::{CategoryArg, ExportArgs, PlanArgs, SetArgs, ShowArgs, SnapshotArgs};
use dsv_cli::commands::{
    CommandContext, address_from_args, run_export, run_freeze, run_impact, run_list, run_plan,
    run_rebuild, run_set, run_show, run_status,
};
use dsv_map::MatchOptions;
use dsv_model::{
    FilterMeta, GeographicLevel, IndicatorMeta, LocationMeta, LocationOptionMeta, MappingAddress,
    MappingType, MetadataSnapshot,
};

fn temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("dsv_cli_{stamp}_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_snapshot(dir: &Path, name: &str, snapshot: &MetadataSnapshot) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(snapshot).expect("serialize")).expect("write");
    path
}

fn source_snapshot() -> MetadataSnapshot {
    MetadataSnapshot::new(
        vec![FilterMeta::new("gender", "Gender").with_options(["Male", "Female"])],
        vec![LocationMeta::new(GeographicLevel::LocalAuthority)
            .with_option(LocationOptionMeta::coded("Blackpool", "E06000009"))],
        vec![IndicatorMeta::new("pupils", "Number of pupils")],
    )
}

fn target_snapshot() -> MetadataSnapshot {
    MetadataSnapshot::new(
        vec![FilterMeta::new("gender", "Gender").with_options(["Male", "Female", "Other"])],
        vec![LocationMeta::new(GeographicLevel::LocalAuthority)
            .with_option(LocationOptionMeta::coded("Blackpool", "E06000099"))],
        vec![IndicatorMeta::new("pupils", "Number of pupils")],
    )
}

struct Fixture {
    dir: PathBuf,
    context: CommandContext,
    source: PathBuf,
    target: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = temp_dir();
        let source = write_snapshot(&dir, "source.json", &source_snapshot());
        let target = write_snapshot(&dir, "target.json", &target_snapshot());
        let context = CommandContext::new(dir.join("store"), MatchOptions::sequential());
        Self {
            dir,
            context,
            source,
            target,
        }
    }

    fn plan(&self) {
        run_plan(
            &self.context,
            &PlanArgs {
                source: self.source.clone(),
                target: self.target.clone(),
                source_version: "2023-24".to_string(),
                target_version: "2024-25".to_string(),
            },
        )
        .expect("plan");
    }

    fn snapshots(&self) -> SnapshotArgs {
        SnapshotArgs {
            version: "2024-25".to_string(),
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn set_location(candidate: Option<&str>) -> SetArgs {
    SetArgs {
        version: "2024-25".to_string(),
        category: CategoryArg::Location,
        source_key: "code|e06000009".to_string(),
        filter: None,
        level: Some("LA".to_string()),
        candidate: candidate.map(str::to_string),
        none: candidate.is_none(),
    }
}

fn show(fixture: &Fixture) -> dsv_model::DataSetVersionMapping {
    run_show(
        &fixture.context,
        &ShowArgs {
            version: "2024-25".to_string(),
            unresolved: false,
        },
    )
    .expect("show")
}

#[test]
fn plan_then_override_then_rebuild() {
    let fixture = Fixture::new();
    fixture.plan();

    let evaluation = run_impact(&fixture.context, "2024-25").expect("impact");
    assert!(evaluation.impact.has_unresolved_loss);
    assert!(evaluation.impact.has_new_candidates_unused);

    let outcome = run_set(&fixture.context, &set_location(Some("code|e06000099"))).expect("set");
    assert!(outcome.path.is_some());
    let unchanged =
        run_set(&fixture.context, &set_location(Some("code|e06000099"))).expect("set again");
    assert!(unchanged.path.is_none());

    let mapping = show(&fixture);
    assert_eq!(mapping.revision, 2);
    let address = MappingAddress::location(GeographicLevel::LocalAuthority, "code|e06000009");
    assert_eq!(
        mapping.entry(&address).expect("entry").mapping_type,
        MappingType::ManualMapped
    );

    let report = run_rebuild(&fixture.context, &fixture.snapshots()).expect("rebuild");
    assert_eq!(report.retained_manual, 1);
    assert!(!report.has_downgrades());
    assert!(!run_impact(&fixture.context, "2024-25")
        .expect("impact")
        .impact
        .has_unresolved_loss);
}

#[test]
fn planning_twice_is_refused() {
    let fixture = Fixture::new();
    fixture.plan();
    let err = run_plan(
        &fixture.context,
        &PlanArgs {
            source: fixture.source.clone(),
            target: fixture.target.clone(),
            source_version: "2023-24".to_string(),
            target_version: "2024-25".to_string(),
        },
    )
    .expect_err("second plan");
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn status_reports_changed_snapshots() {
    let fixture = Fixture::new();
    fixture.plan();
    assert!(!run_status(&fixture.context, &fixture.snapshots())
        .expect("status")
        .is_stale());

    write_snapshot(&fixture.dir, "target.json", &source_snapshot());
    let status = run_status(&fixture.context, &fixture.snapshots()).expect("status");
    assert!(status.target_changed);
    assert!(!status.source_changed);
}

#[test]
fn frozen_mapping_rejects_changes() {
    let fixture = Fixture::new();
    fixture.plan();
    assert!(run_freeze(&fixture.context, "2024-25").expect("freeze"));
    assert!(!run_freeze(&fixture.context, "2024-25").expect("freeze again"));

    let err = run_set(&fixture.context, &set_location(None)).expect_err("frozen");
    assert!(err.to_string().contains("frozen"));
    assert!(run_rebuild(&fixture.context, &fixture.snapshots()).is_err());

    let listed = run_list(&fixture.context).expect("list");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].frozen);
}

#[test]
fn missing_mapping_carries_a_hint() {
    let fixture = Fixture::new();
    let err = run_show(
        &fixture.context,
        &ShowArgs {
            version: "2030-31".to_string(),
            unresolved: false,
        },
    )
    .expect_err("missing");
    let message = err.to_string();
    assert!(message.contains("2030-31"));
    assert!(message.contains("hint:"));
}

#[test]
fn filter_option_address_needs_its_filter() {
    let mut args = SetArgs {
        version: "2024-25".to_string(),
        category: CategoryArg::FilterOption,
        source_key: "gender||male".to_string(),
        filter: None,
        level: None,
        candidate: None,
        none: true,
    };
    assert!(address_from_args(&args).is_err());

    args.filter = Some("gender".to_string());
    assert_eq!(
        address_from_args(&args).expect("address"),
        MappingAddress::filter_option("gender", "gender||male")
    );
}

#[test]
fn export_writes_mapping_rows() {
    let fixture = Fixture::new();
    fixture.plan();
    let out = fixture.dir.join("mappings.csv");
    let candidates = fixture.dir.join("candidates.csv");
    let counts = run_export(
        &fixture.context,
        &ExportArgs {
            version: "2024-25".to_string(),
            out: out.clone(),
            candidates: Some(candidates.clone()),
        },
    )
    .expect("export");

    // gender, two options, one location, one indicator
    assert_eq!(counts.mappings, 5);
    assert_eq!(counts.candidates, Some(6));

    let csv = fs::read_to_string(&out).expect("read csv");
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.lines().any(|line| line.contains("code|e06000009") && line.contains("AutoNone")));
    assert!(fs::read_to_string(&candidates)
        .expect("read candidates")
        .contains("gender||other"));
}
