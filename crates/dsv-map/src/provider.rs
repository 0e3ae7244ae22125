//! Where metadata snapshots come from.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use dsv_model::MetadataSnapshot;

use crate::error::ProviderError;

/// Source of a version's metadata snapshot.
pub trait MetadataProvider {
    fn snapshot(&self) -> Result<MetadataSnapshot, ProviderError>;
}

impl MetadataProvider for MetadataSnapshot {
    fn snapshot(&self) -> Result<MetadataSnapshot, ProviderError> {
        Ok(self.clone())
    }
}

/// A snapshot stored as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonSnapshotFile {
    path: PathBuf,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataProvider for JsonSnapshotFile {
    fn snapshot(&self) -> Result<MetadataSnapshot, ProviderError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: self.path.clone(),
            source,
        })?;
        let snapshot: MetadataSnapshot =
            serde_json::from_str(&contents).map_err(|source| ProviderError::Json {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            path = %self.path.display(),
            filters = snapshot.list_filters().len(),
            levels = snapshot.list_locations().len(),
            indicators = snapshot.list_indicators().len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}

/// Lowercase hex SHA-256 of the snapshot's JSON form.
///
/// Two snapshots with equal content have equal fingerprints regardless of
/// how the source document was formatted.
pub fn snapshot_fingerprint(snapshot: &MetadataSnapshot) -> String {
    let mut hasher = Sha256::new();
    // Serializing plain structs and string-keyed data cannot fail.
    let bytes = serde_json::to_vec(snapshot).unwrap_or_default();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}
