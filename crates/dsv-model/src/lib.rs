//! Data model for mapping one data set version onto the next.

pub mod enums;
pub mod error;
pub mod ids;
pub mod mapping;
pub mod metadata;
pub mod plan;
pub mod snapshot;
pub mod version;

pub use enums::{GeographicLevel, MappingCategory, MappingType};
pub use error::{ModelError, Result};
pub use ids::{PublicId, VersionId};
pub use mapping::{CandidateRef, Mapping, MappingAddress, MappingPlan, PlanEntry};
pub use metadata::{
    FilterInfo, FilterMeta, FilterOptionInfo, FilterOptionMeta, IndicatorInfo, IndicatorMeta,
    LocationCodes, LocationMeta, LocationOptionInfo, LocationOptionMeta,
};
pub use plan::{
    FilterCandidate, FilterMapping, FilterMappingPlan, FilterOptionMapping, IndicatorMapping,
    IndicatorMappingPlan, LocationLevelMappings, LocationMappingPlan, LocationOptionMapping,
};
pub use snapshot::MetadataSnapshot;
pub use version::DataSetVersionMapping;
