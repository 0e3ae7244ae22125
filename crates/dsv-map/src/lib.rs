//! Mapping engine for data set versions.
//!
//! Matches the filters, locations and indicators of a source version to
//! those of a target version by structural key, records reviewer overrides,
//! rebuilds plans when upstream metadata changes and reports the
//! compatibility facts a versioning policy needs.
#![deny(unsafe_code)]

pub mod builder;
pub mod error;
pub mod evaluate;
pub mod keys;
pub mod matcher;
pub mod mutation;
pub mod options;
pub mod provider;
pub mod rebuild;
pub mod repository;
pub mod resolve;
pub mod rows;
pub mod service;

pub use builder::{
    BuiltPlans, build_filter_plan, build_indicator_plan, build_location_plan, build_plans,
    seed_plans,
};
pub use error::{ErrorKind, MappingError, ProviderError, RepositoryError};
pub use evaluate::{
    CategorySummary, Evaluation, InvariantViolation, LevelChanges, MappingImpact, MappingSummary,
    ViolationKind, check_invariants, compute_impact, evaluate, is_complete, level_changes,
    summarize,
};
pub use matcher::{CandidateIndex, MatchOutcome};
pub use mutation::{
    set_filter_mapping, set_filter_option_mapping, set_indicator_mapping, set_location_mapping,
    set_manual_mapping,
};
pub use options::MatchOptions;
pub use provider::{JsonSnapshotFile, MetadataProvider, snapshot_fingerprint};
pub use rebuild::{RebuildReport, rebuild_plans};
pub use repository::{MappingRepository, StoredMappingMetadata};
pub use resolve::{PublicIdIndex, Resolution};
pub use rows::{
    CandidateRow, MappingRow, candidate_rows, mapping_rows, write_candidate_rows_csv,
    write_mapping_rows_csv,
};
pub use service::{
    Staleness, create_version_mapping, freeze, rebuild_version_mapping, staleness,
};
