//! Tests for dsv-model types.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use dsv_model::{
    DataSetVersionMapping, FilterMappingPlan, GeographicLevel, IndicatorInfo,
    IndicatorMappingPlan, LocationCodes, LocationLevelMappings, LocationMappingPlan,
    LocationOptionInfo, Mapping, MappingAddress, MappingPlan, MappingType, PublicId, VersionId,
};

fn blackpool() -> LocationOptionInfo {
    LocationOptionInfo {
        label: "Blackpool".to_string(),
        codes: LocationCodes::LocalAuthority {
            code: Some("E06000009".to_string()),
            old_code: Some("890".to_string()),
        },
    }
}

fn sample_mapping() -> DataSetVersionMapping {
    let mut level = LocationLevelMappings::default();
    level.mappings.insert(
        "code|e06000009".to_string(),
        Mapping::auto(
            blackpool(),
            Some(PublicId::new("loc-1").unwrap()),
            Some("code|e06000009".to_string()),
        ),
    );
    level
        .candidates
        .insert("code|e06000009".to_string(), blackpool());
    let mut levels = BTreeMap::new();
    levels.insert(GeographicLevel::LocalAuthority, level);

    let mut indicators = IndicatorMappingPlan::default();
    indicators.mappings.insert(
        "enrolments".to_string(),
        Mapping::unresolved(
            IndicatorInfo {
                column: "enrolments".to_string(),
                label: "Enrolments".to_string(),
                unit: None,
                decimal_places: Some(0),
            },
            Some(PublicId::new("ind-1").unwrap()),
        ),
    );

    DataSetVersionMapping::new(
        VersionId::new("1.0").unwrap(),
        VersionId::new("1.1").unwrap(),
        FilterMappingPlan::default(),
        LocationMappingPlan { levels },
        indicators,
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    )
}

#[test]
fn completeness_flags_are_cached_on_construction() {
    let mapping = sample_mapping();
    assert!(mapping.filter_mappings_complete);
    assert!(mapping.location_mappings_complete);
    assert!(!mapping.indicator_mappings_complete);
    assert!(!mapping.mappings_complete());
}

#[test]
fn json_round_trip_preserves_keys_and_levels() {
    let mapping = sample_mapping();
    let json = serde_json::to_string_pretty(&mapping).expect("serialize mapping");
    assert!(json.contains("\"LA\""));
    let back: DataSetVersionMapping = serde_json::from_str(&json).expect("deserialize mapping");
    assert_eq!(back, mapping);
}

#[test]
fn freeze_keeps_first_timestamp() {
    let mut mapping = sample_mapping();
    let first = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    mapping.freeze(first);
    mapping.freeze(second);
    assert!(mapping.is_frozen());
    assert_eq!(mapping.frozen_at, Some(first));
}

#[test]
fn entries_cover_all_plans() {
    let mapping = sample_mapping();
    let entries = mapping.entries();
    assert_eq!(entries.len(), 2);
    let location = mapping
        .entry(&MappingAddress::location(
            GeographicLevel::LocalAuthority,
            "code|e06000009",
        ))
        .expect("location entry");
    assert_eq!(location.public_id.map(PublicId::as_str), Some("loc-1"));
    assert_eq!(mapping.count_by_type(MappingType::None), 1);
    assert!(mapping.accepts_candidate(
        &MappingAddress::location(GeographicLevel::LocalAuthority, "anything"),
        "code|e06000009"
    ));
}
