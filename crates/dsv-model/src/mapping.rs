//! Mapping records and the addressing scheme shared by every plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::{GeographicLevel, MappingCategory, MappingType};
use crate::ids::PublicId;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Resolution of one source-version entity.
///
/// `candidate_key` is present exactly when `mapping_type` is
/// [`MappingType::AutoMapped`] or [`MappingType::ManualMapped`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping<S> {
    pub source: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<PublicId>,
    #[serde(rename = "type", default)]
    pub mapping_type: MappingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_key: Option<String>,
    /// Set when a manual choice was invalidated by a rebuild.
    ///
    /// Only a reviewer clears it: rebuilds keep the flag even when the
    /// matcher finds a candidate again, and a manual decision resets it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub needs_review: bool,
}

impl<S> Mapping<S> {
    /// A mapping the matcher has not looked at yet.
    pub fn unresolved(source: S, public_id: Option<PublicId>) -> Self {
        Self {
            source,
            public_id,
            mapping_type: MappingType::None,
            candidate_key: None,
            needs_review: false,
        }
    }

    /// A matcher result: `AutoMapped` with a candidate, `AutoNone` without.
    pub fn auto(source: S, public_id: Option<PublicId>, candidate_key: Option<String>) -> Self {
        let mapping_type = if candidate_key.is_some() {
            MappingType::AutoMapped
        } else {
            MappingType::AutoNone
        };
        Self {
            source,
            public_id,
            mapping_type,
            candidate_key,
            needs_review: false,
        }
    }

    /// Records a reviewer decision. Returns `true` if anything changed.
    pub fn set_manual(&mut self, candidate_key: Option<String>) -> bool {
        let mapping_type = if candidate_key.is_some() {
            MappingType::ManualMapped
        } else {
            MappingType::ManualNone
        };
        let changed = self.mapping_type != mapping_type
            || self.candidate_key != candidate_key
            || self.needs_review;
        self.mapping_type = mapping_type;
        self.candidate_key = candidate_key;
        self.needs_review = false;
        changed
    }

    pub fn is_manual(&self) -> bool {
        self.mapping_type.is_manual()
    }
}

/// Location of one mapping inside a [`DataSetVersionMapping`](crate::DataSetVersionMapping).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum MappingAddress {
    Filter {
        source_key: String,
    },
    FilterOption {
        filter_key: String,
        source_key: String,
    },
    Location {
        level: GeographicLevel,
        source_key: String,
    },
    Indicator {
        source_key: String,
    },
}

impl MappingAddress {
    pub fn filter(source_key: impl Into<String>) -> Self {
        Self::Filter {
            source_key: source_key.into(),
        }
    }

    pub fn filter_option(filter_key: impl Into<String>, source_key: impl Into<String>) -> Self {
        Self::FilterOption {
            filter_key: filter_key.into(),
            source_key: source_key.into(),
        }
    }

    pub fn location(level: GeographicLevel, source_key: impl Into<String>) -> Self {
        Self::Location {
            level,
            source_key: source_key.into(),
        }
    }

    pub fn indicator(source_key: impl Into<String>) -> Self {
        Self::Indicator {
            source_key: source_key.into(),
        }
    }

    pub fn category(&self) -> MappingCategory {
        match self {
            Self::Filter { .. } => MappingCategory::Filter,
            Self::FilterOption { .. } => MappingCategory::FilterOption,
            Self::Location { .. } => MappingCategory::Location,
            Self::Indicator { .. } => MappingCategory::Indicator,
        }
    }

    pub fn source_key(&self) -> &str {
        match self {
            Self::Filter { source_key }
            | Self::FilterOption { source_key, .. }
            | Self::Location { source_key, .. }
            | Self::Indicator { source_key } => source_key,
        }
    }

    pub fn level(&self) -> Option<GeographicLevel> {
        match self {
            Self::Location { level, .. } => Some(*level),
            _ => None,
        }
    }

    pub fn filter_key(&self) -> Option<&str> {
        match self {
            Self::FilterOption { filter_key, .. } => Some(filter_key),
            _ => None,
        }
    }
}

impl fmt::Display for MappingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter { source_key } => write!(f, "filter/{source_key}"),
            Self::FilterOption {
                filter_key,
                source_key,
            } => write!(f, "filter-option/{filter_key}/{source_key}"),
            Self::Location { level, source_key } => write!(f, "location/{level}/{source_key}"),
            Self::Indicator { source_key } => write!(f, "indicator/{source_key}"),
        }
    }
}

/// Flattened, read-only view of one mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry<'a> {
    pub address: MappingAddress,
    pub label: &'a str,
    pub public_id: Option<&'a PublicId>,
    pub mapping_type: MappingType,
    pub candidate_key: Option<&'a str>,
    pub needs_review: bool,
}

impl<'a> PlanEntry<'a> {
    pub fn from_mapping<S>(address: MappingAddress, label: &'a str, mapping: &'a Mapping<S>) -> Self {
        Self {
            address,
            label,
            public_id: mapping.public_id.as_ref(),
            mapping_type: mapping.mapping_type,
            candidate_key: mapping.candidate_key.as_deref(),
            needs_review: mapping.needs_review,
        }
    }
}

/// Reference to one candidate of a plan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateRef {
    pub category: MappingCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<GeographicLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_key: Option<String>,
    pub candidate_key: String,
    pub label: String,
}

/// Common read access over filter, location and indicator plans.
pub trait MappingPlan {
    /// Every mapping of the plan, in key order.
    fn entries(&self) -> Vec<PlanEntry<'_>>;

    /// Every candidate of the plan, in key order.
    fn candidate_refs(&self) -> Vec<CandidateRef>;

    /// Whether `candidate_key` is a valid choice for the mapping at `address`.
    fn accepts_candidate(&self, address: &MappingAddress, candidate_key: &str) -> bool;

    /// True when no mapping is left in the unresolved `None` state.
    fn is_complete(&self) -> bool {
        self.entries()
            .iter()
            .all(|e| e.mapping_type != MappingType::None)
    }
}
