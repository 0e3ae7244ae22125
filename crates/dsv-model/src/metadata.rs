//! Mappable entities of one data set version.
//!
//! `*Info` types hold the content snapshot of an entity (what a mapping's
//! `source` or a candidate records). `*Meta` types are the entries of a
//! [`MetadataSnapshot`](crate::MetadataSnapshot) and add the entity's public
//! id, which only published versions carry.

use serde::{Deserialize, Serialize};

use crate::enums::GeographicLevel;
use crate::ids::PublicId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInfo {
    /// Column name in the data file.
    pub column: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptionInfo {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorInfo {
    pub column: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u8>,
}

/// Kind-specific identity codes of a location option.
///
/// Each geographic level uses one kind; levels without a specialised kind
/// are [`LocationCodes::Coded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LocationCodes {
    Coded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    LocalAuthority {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_code: Option<String>,
    },
    School {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        urn: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        la_estab: Option<String>,
    },
    Provider {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ukprn: Option<String>,
    },
    RscRegion,
}

impl LocationCodes {
    /// The primary code, if this kind has one and it is not blank.
    pub fn code(&self) -> Option<&str> {
        match self {
            LocationCodes::Coded { code } | LocationCodes::LocalAuthority { code, .. } => {
                non_blank(code.as_deref())
            }
            _ => None,
        }
    }

    pub fn old_code(&self) -> Option<&str> {
        match self {
            LocationCodes::LocalAuthority { old_code, .. } => non_blank(old_code.as_deref()),
            _ => None,
        }
    }

    pub fn urn(&self) -> Option<&str> {
        match self {
            LocationCodes::School { urn, .. } => non_blank(urn.as_deref()),
            _ => None,
        }
    }

    pub fn la_estab(&self) -> Option<&str> {
        match self {
            LocationCodes::School { la_estab, .. } => non_blank(la_estab.as_deref()),
            _ => None,
        }
    }

    pub fn ukprn(&self) -> Option<&str> {
        match self {
            LocationCodes::Provider { ukprn } => non_blank(ukprn.as_deref()),
            _ => None,
        }
    }

    /// The kind name as serialized in the `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            LocationCodes::Coded { .. } => "Coded",
            LocationCodes::LocalAuthority { .. } => "LocalAuthority",
            LocationCodes::School { .. } => "School",
            LocationCodes::Provider { .. } => "Provider",
            LocationCodes::RscRegion => "RscRegion",
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOptionInfo {
    pub label: String,
    pub codes: LocationCodes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<PublicId>,
    #[serde(flatten)]
    pub info: FilterOptionInfo,
}

impl FilterOptionMeta {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            public_id: None,
            info: FilterOptionInfo {
                label: label.into(),
                group_label: None,
            },
        }
    }

    #[must_use]
    pub fn with_group(mut self, group_label: impl Into<String>) -> Self {
        self.info.group_label = Some(group_label.into());
        self
    }

    #[must_use]
    pub fn with_public_id(mut self, public_id: PublicId) -> Self {
        self.public_id = Some(public_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<PublicId>,
    #[serde(flatten)]
    pub info: FilterInfo,
    #[serde(default)]
    pub options: Vec<FilterOptionMeta>,
}

impl FilterMeta {
    pub fn new(column: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            public_id: None,
            info: FilterInfo {
                column: column.into(),
                label: label.into(),
                hint: None,
            },
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_public_id(mut self, public_id: PublicId) -> Self {
        self.public_id = Some(public_id);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.info.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_option(mut self, option: FilterOptionMeta) -> Self {
        self.options.push(option);
        self
    }

    /// Adds one ungrouped option per label.
    #[must_use]
    pub fn with_options<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .extend(labels.into_iter().map(FilterOptionMeta::new));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOptionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<PublicId>,
    #[serde(flatten)]
    pub info: LocationOptionInfo,
}

impl LocationOptionMeta {
    pub fn new(label: impl Into<String>, codes: LocationCodes) -> Self {
        Self {
            public_id: None,
            info: LocationOptionInfo {
                label: label.into(),
                codes,
            },
        }
    }

    pub fn coded(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(
            label,
            LocationCodes::Coded {
                code: Some(code.into()),
            },
        )
    }

    pub fn local_authority(
        label: impl Into<String>,
        code: impl Into<String>,
        old_code: impl Into<String>,
    ) -> Self {
        Self::new(
            label,
            LocationCodes::LocalAuthority {
                code: Some(code.into()),
                old_code: Some(old_code.into()),
            },
        )
    }

    pub fn school(
        label: impl Into<String>,
        urn: impl Into<String>,
        la_estab: impl Into<String>,
    ) -> Self {
        Self::new(
            label,
            LocationCodes::School {
                urn: Some(urn.into()),
                la_estab: Some(la_estab.into()),
            },
        )
    }

    pub fn provider(label: impl Into<String>, ukprn: impl Into<String>) -> Self {
        Self::new(
            label,
            LocationCodes::Provider {
                ukprn: Some(ukprn.into()),
            },
        )
    }

    pub fn rsc_region(label: impl Into<String>) -> Self {
        Self::new(label, LocationCodes::RscRegion)
    }

    #[must_use]
    pub fn with_public_id(mut self, public_id: PublicId) -> Self {
        self.public_id = Some(public_id);
        self
    }
}

/// A geographic level and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMeta {
    pub level: GeographicLevel,
    #[serde(default)]
    pub options: Vec<LocationOptionMeta>,
}

impl LocationMeta {
    pub fn new(level: GeographicLevel) -> Self {
        Self {
            level,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, option: LocationOptionMeta) -> Self {
        self.options.push(option);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<PublicId>,
    #[serde(flatten)]
    pub info: IndicatorInfo,
}

impl IndicatorMeta {
    pub fn new(column: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            public_id: None,
            info: IndicatorInfo {
                column: column.into(),
                label: label.into(),
                unit: None,
                decimal_places: None,
            },
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.info.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_public_id(mut self, public_id: PublicId) -> Self {
        self.public_id = Some(public_id);
        self
    }
}
