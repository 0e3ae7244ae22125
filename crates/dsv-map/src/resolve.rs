//! Public-id lookup for translating queries written against the source
//! version.

use std::collections::BTreeMap;

use serde::Serialize;

use dsv_model::{DataSetVersionMapping, MappingAddress, MappingPlan, MappingType, PublicId};

/// Where a source public id ends up in the target version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    Mapped {
        address: MappingAddress,
        candidate_key: String,
    },
    /// The entity has no equivalent in the target version.
    Removed { address: MappingAddress },
    /// The matcher has not run for this entity yet.
    Unresolved { address: MappingAddress },
}

/// Index from source public ids to their resolution.
#[derive(Debug, Clone, Default)]
pub struct PublicIdIndex {
    resolutions: BTreeMap<PublicId, Resolution>,
}

impl PublicIdIndex {
    pub fn new(mapping: &DataSetVersionMapping) -> Self {
        let mut resolutions = BTreeMap::new();
        for entry in mapping.entries() {
            let Some(public_id) = entry.public_id else {
                continue;
            };
            let resolution = match (entry.mapping_type, entry.candidate_key) {
                (MappingType::AutoMapped | MappingType::ManualMapped, Some(key)) => {
                    Resolution::Mapped {
                        address: entry.address,
                        candidate_key: key.to_string(),
                    }
                }
                (MappingType::None, _) => Resolution::Unresolved {
                    address: entry.address,
                },
                _ => Resolution::Removed {
                    address: entry.address,
                },
            };
            resolutions.insert(public_id.clone(), resolution);
        }
        Self { resolutions }
    }

    pub fn resolve(&self, public_id: &PublicId) -> Option<&Resolution> {
        self.resolutions.get(public_id)
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }
}
