use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use dsv_map::{
    MappingRepository, MatchOptions, RepositoryError, build_plans, set_manual_mapping,
};
use dsv_model::{
    DataSetVersionMapping, FilterMeta, GeographicLevel, LocationMeta, LocationOptionMeta,
    MappingAddress, MappingType, MetadataSnapshot, VersionId,
};

fn mapping_for(target_version: &str) -> DataSetVersionMapping {
    let mut mapping = sample_mapping(&gender_snapshot(), &gender_snapshot());
    mapping.target_version = VersionId::new(target_version).expect("version");
    mapping
}

fn temp_repo_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("dsv_map_repo_{stamp}_{}", std::process::id()));
    dir
}

fn cleanup_dir(dir: &PathBuf) {
    let _ = fs::remove_dir_all(dir);
}

fn sample_mapping(source: &MetadataSnapshot, target: &MetadataSnapshot) -> DataSetVersionMapping {
    let plans = build_plans(source, target, MatchOptions::sequential());
    DataSetVersionMapping::new(
        VersionId::new("2023-24").expect("version"),
        VersionId::new("2024-25").expect("version"),
        plans.filters,
        plans.locations,
        plans.indicators,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    )
}

fn gender_snapshot() -> MetadataSnapshot {
    MetadataSnapshot::new(
        vec![FilterMeta::new("gender", "Gender").with_options(["Male"])],
        vec![],
        vec![],
    )
}

#[test]
fn repository_save_and_load() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut mapping = sample_mapping(&gender_snapshot(), &gender_snapshot());

    let path = repo.save(&mut mapping).expect("save mapping");
    let name = path.file_name().expect("file name").to_string_lossy().into_owned();
    assert!(name.starts_with("2024-25-") && name.ends_with(".json"));
    assert_eq!(mapping.revision, 1);
    assert!(repo.exists(&mapping.target_version));

    let loaded = repo.load(&mapping.target_version).expect("load mapping");
    assert_eq!(loaded, mapping);

    cleanup_dir(&dir);
}

#[test]
fn manual_override_persists() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let source = MetadataSnapshot::new(
        vec![],
        vec![LocationMeta::new(GeographicLevel::LocalAuthority)
            .with_option(LocationOptionMeta::coded("Blackpool", "E06000009"))],
        vec![],
    );
    let target = MetadataSnapshot::new(
        vec![],
        vec![LocationMeta::new(GeographicLevel::LocalAuthority)
            .with_option(LocationOptionMeta::coded("Blackpool", "E06000099"))],
        vec![],
    );
    let mut mapping = sample_mapping(&source, &target);
    repo.save(&mut mapping).expect("save mapping");

    let address = MappingAddress::location(GeographicLevel::LocalAuthority, "code|e06000009");
    let mut loaded = repo.load(&mapping.target_version).expect("load mapping");
    set_manual_mapping(&mut loaded, &address, Some("code|e06000099")).expect("override");
    repo.save(&mut loaded).expect("save override");

    let reloaded = repo.load(&mapping.target_version).expect("reload mapping");
    let entry = reloaded.entry(&address).expect("entry");
    assert_eq!(entry.mapping_type, MappingType::ManualMapped);
    assert_eq!(entry.candidate_key, Some("code|e06000099"));
    assert_eq!(reloaded.revision, 2);

    cleanup_dir(&dir);
}

#[test]
fn stale_revision_is_rejected() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut mapping = sample_mapping(&gender_snapshot(), &gender_snapshot());
    repo.save(&mut mapping).expect("first save");

    let mut first = repo.load(&mapping.target_version).expect("load");
    let mut second = first.clone();
    repo.save(&mut first).expect("first writer wins");

    let err = repo.save(&mut second).expect_err("second writer conflicts");
    assert!(matches!(
        err,
        RepositoryError::Conflict {
            expected: 1,
            found: 2
        }
    ));
    assert!(err.suggestion().is_some());
    assert_eq!(second.revision, 1);

    cleanup_dir(&dir);
}

#[test]
fn inconsistent_mapping_is_not_saved() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut mapping = sample_mapping(&gender_snapshot(), &gender_snapshot());
    mapping
        .filters
        .mappings
        .get_mut("gender")
        .expect("gender")
        .mapping
        .candidate_key = None;

    let err = repo.save(&mut mapping).expect_err("invalid plan");
    assert!(matches!(err, RepositoryError::InvalidPlan { .. }));
    assert!(!repo.exists(&mapping.target_version));

    cleanup_dir(&dir);
}

#[test]
fn list_and_delete() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut mapping = sample_mapping(&gender_snapshot(), &gender_snapshot());
    repo.save(&mut mapping).expect("save mapping");
    fs::write(dir.join("notes.json"), "not a mapping").expect("write junk");

    let listed = repo.list().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].target_version.as_str(), "2024-25");
    assert_eq!(listed[0].entry_count, 2);
    assert!(listed[0].mappings_complete);

    assert!(repo.delete(&mapping.target_version).expect("delete"));
    assert!(!repo.delete(&mapping.target_version).expect("delete again"));
    assert!(matches!(
        repo.load(&mapping.target_version),
        Err(RepositoryError::NotFound { .. })
    ));

    cleanup_dir(&dir);
}

#[test]
fn persisted_form_is_stable() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut mapping = sample_mapping(&gender_snapshot(), &gender_snapshot());
    let path = repo.save(&mut mapping).expect("save mapping");

    let mut value: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).expect("read")).expect("parse");
    value["updated_at"] = serde_json::Value::String("[updated_at]".to_string());
    insta::assert_json_snapshot!(value);

    cleanup_dir(&dir);
}

#[test]
fn versions_with_the_same_file_stem_are_stored_apart() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut slash = mapping_for("v/1");
    repo.save(&mut slash).expect("save v/1");

    let underscore_id = VersionId::new("v_1").expect("version");
    assert!(!repo.exists(&underscore_id));
    assert!(matches!(
        repo.load(&underscore_id),
        Err(RepositoryError::NotFound { .. })
    ));

    let mut underscore = mapping_for("v_1");
    repo.save(&mut underscore).expect("save v_1");
    assert_eq!(underscore.revision, 1);
    assert_eq!(
        repo.load(&slash.target_version).expect("load v/1").target_version,
        slash.target_version
    );
    assert_eq!(repo.list().expect("list").len(), 2);

    cleanup_dir(&dir);
}

#[test]
fn file_recorded_for_another_version_is_not_used() {
    let dir = temp_repo_dir();
    let repo = MappingRepository::new(&dir).expect("create repo");
    let mut stored = mapping_for("2024-25");
    let path = repo.save(&mut stored).expect("save");

    let other = VersionId::new("2025-26").expect("version");
    fs::copy(&path, repo.path_for(&other)).expect("copy");

    assert!(!repo.exists(&other));
    assert!(matches!(
        repo.load(&other),
        Err(RepositoryError::NotFound { .. })
    ));
    let mut fresh = mapping_for("2025-26");
    let err = repo.save(&mut fresh).expect_err("occupied");
    assert!(matches!(err, RepositoryError::Occupied { .. }));
    assert_eq!(fresh.revision, 0);

    cleanup_dir(&dir);
}
