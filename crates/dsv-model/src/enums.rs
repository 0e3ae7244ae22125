//! Type-safe enumerations for data set version mapping.
//!
//! Geographic levels are serialized by their short code (`LA`, `SCH`, ...)
//! which is how they appear in uploaded data files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Geographic level a location belongs to.
///
/// Location identity (and therefore structural keys) is only meaningful
/// within a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeographicLevel {
    #[serde(rename = "NAT")]
    Country,
    #[serde(rename = "EDA")]
    EnglishDevolvedArea,
    #[serde(rename = "INST")]
    Institution,
    #[serde(rename = "LA")]
    LocalAuthority,
    #[serde(rename = "LAD")]
    LocalAuthorityDistrict,
    #[serde(rename = "LEP")]
    LocalEnterprisePartnership,
    #[serde(rename = "LSIP")]
    LocalSkillsImprovementPlanArea,
    #[serde(rename = "MCA")]
    MayoralCombinedAuthority,
    #[serde(rename = "MAT")]
    MultiAcademyTrust,
    #[serde(rename = "OA")]
    OpportunityArea,
    #[serde(rename = "PCON")]
    ParliamentaryConstituency,
    #[serde(rename = "PA")]
    PlanningArea,
    #[serde(rename = "PROV")]
    Provider,
    #[serde(rename = "REG")]
    Region,
    #[serde(rename = "RSC")]
    RscRegion,
    #[serde(rename = "SCH")]
    School,
    #[serde(rename = "SPON")]
    Sponsor,
    #[serde(rename = "WARD")]
    Ward,
}

impl GeographicLevel {
    pub const ALL: [GeographicLevel; 18] = [
        GeographicLevel::Country,
        GeographicLevel::EnglishDevolvedArea,
        GeographicLevel::Institution,
        GeographicLevel::LocalAuthority,
        GeographicLevel::LocalAuthorityDistrict,
        GeographicLevel::LocalEnterprisePartnership,
        GeographicLevel::LocalSkillsImprovementPlanArea,
        GeographicLevel::MayoralCombinedAuthority,
        GeographicLevel::MultiAcademyTrust,
        GeographicLevel::OpportunityArea,
        GeographicLevel::ParliamentaryConstituency,
        GeographicLevel::PlanningArea,
        GeographicLevel::Provider,
        GeographicLevel::Region,
        GeographicLevel::RscRegion,
        GeographicLevel::School,
        GeographicLevel::Sponsor,
        GeographicLevel::Ward,
    ];

    /// Returns the short code used in data files.
    pub fn code(&self) -> &'static str {
        match self {
            GeographicLevel::Country => "NAT",
            GeographicLevel::EnglishDevolvedArea => "EDA",
            GeographicLevel::Institution => "INST",
            GeographicLevel::LocalAuthority => "LA",
            GeographicLevel::LocalAuthorityDistrict => "LAD",
            GeographicLevel::LocalEnterprisePartnership => "LEP",
            GeographicLevel::LocalSkillsImprovementPlanArea => "LSIP",
            GeographicLevel::MayoralCombinedAuthority => "MCA",
            GeographicLevel::MultiAcademyTrust => "MAT",
            GeographicLevel::OpportunityArea => "OA",
            GeographicLevel::ParliamentaryConstituency => "PCON",
            GeographicLevel::PlanningArea => "PA",
            GeographicLevel::Provider => "PROV",
            GeographicLevel::Region => "REG",
            GeographicLevel::RscRegion => "RSC",
            GeographicLevel::School => "SCH",
            GeographicLevel::Sponsor => "SPON",
            GeographicLevel::Ward => "WARD",
        }
    }

    /// Returns the variant name, e.g. `LocalAuthority`.
    pub fn name(&self) -> &'static str {
        match self {
            GeographicLevel::Country => "Country",
            GeographicLevel::EnglishDevolvedArea => "EnglishDevolvedArea",
            GeographicLevel::Institution => "Institution",
            GeographicLevel::LocalAuthority => "LocalAuthority",
            GeographicLevel::LocalAuthorityDistrict => "LocalAuthorityDistrict",
            GeographicLevel::LocalEnterprisePartnership => "LocalEnterprisePartnership",
            GeographicLevel::LocalSkillsImprovementPlanArea => "LocalSkillsImprovementPlanArea",
            GeographicLevel::MayoralCombinedAuthority => "MayoralCombinedAuthority",
            GeographicLevel::MultiAcademyTrust => "MultiAcademyTrust",
            GeographicLevel::OpportunityArea => "OpportunityArea",
            GeographicLevel::ParliamentaryConstituency => "ParliamentaryConstituency",
            GeographicLevel::PlanningArea => "PlanningArea",
            GeographicLevel::Provider => "Provider",
            GeographicLevel::Region => "Region",
            GeographicLevel::RscRegion => "RscRegion",
            GeographicLevel::School => "School",
            GeographicLevel::Sponsor => "Sponsor",
            GeographicLevel::Ward => "Ward",
        }
    }
}

impl fmt::Display for GeographicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GeographicLevel {
    type Err = ModelError;

    /// Accepts the short code or the variant name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        GeographicLevel::ALL
            .into_iter()
            .find(|level| {
                level.code().eq_ignore_ascii_case(trimmed)
                    || level.name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| ModelError::UnknownGeographicLevel(s.to_string()))
    }
}

/// Resolution state of a single mapping.
///
/// `None` is the unresolved state that exists only before the matcher has
/// run. `Auto*` states are owned by the matcher; `Manual*` states are owned
/// by a reviewer and survive re-matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MappingType {
    #[default]
    None,
    AutoMapped,
    AutoNone,
    ManualMapped,
    ManualNone,
}

impl MappingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingType::None => "None",
            MappingType::AutoMapped => "AutoMapped",
            MappingType::AutoNone => "AutoNone",
            MappingType::ManualMapped => "ManualMapped",
            MappingType::ManualNone => "ManualNone",
        }
    }

    /// True for states that must carry a candidate key.
    pub fn is_mapped(&self) -> bool {
        matches!(self, MappingType::AutoMapped | MappingType::ManualMapped)
    }

    /// True for states set by a reviewer.
    pub fn is_manual(&self) -> bool {
        matches!(self, MappingType::ManualMapped | MappingType::ManualNone)
    }

    /// True for resolved states in which the source entity has no equivalent.
    pub fn is_loss(&self) -> bool {
        matches!(self, MappingType::AutoNone | MappingType::ManualNone)
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of mappable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingCategory {
    Filter,
    FilterOption,
    Location,
    Indicator,
}

impl MappingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingCategory::Filter => "filter",
            MappingCategory::FilterOption => "filter-option",
            MappingCategory::Location => "location",
            MappingCategory::Indicator => "indicator",
        }
    }
}

impl fmt::Display for MappingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "filter" => Ok(MappingCategory::Filter),
            "filter-option" | "option" => Ok(MappingCategory::FilterOption),
            "location" => Ok(MappingCategory::Location),
            "indicator" => Ok(MappingCategory::Indicator),
            _ => Err(ModelError::UnknownCategory(s.to_string())),
        }
    }
}
