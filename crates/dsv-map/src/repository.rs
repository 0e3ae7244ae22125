//! File-system store for version mappings.
//!
//! One JSON file per target version, named after a file-name safe form of
//! the version id plus a digest of the exact id:
//! `{file_stem}-{sha256 prefix}.json`. Ids that sanitize to the same stem
//! still get distinct files, and a file is only ever read back for the id
//! recorded inside it.
//!
//! Saves are guarded by the mapping's `revision`: the revision on disk must
//! equal the revision the caller loaded (a missing file counts as 0), so two
//! writers cannot silently overwrite each other. Files are written to a
//! temp file, synced and renamed into place.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use dsv_model::{DataSetVersionMapping, MappingPlan, VersionId};

use crate::error::RepositoryError;
use crate::evaluate::check_invariants;

type Result<T> = std::result::Result<T, RepositoryError>;

/// Directory-backed store of [`DataSetVersionMapping`]s.
#[derive(Debug, Clone)]
pub struct MappingRepository {
    base_dir: PathBuf,
}

/// Listing entry for one stored mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMappingMetadata {
    pub source_version: VersionId,
    pub target_version: VersionId,
    pub file_path: PathBuf,
    pub revision: u64,
    pub mappings_complete: bool,
    pub frozen: bool,
    pub entry_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Leading fields of a stored mapping, read without the plans.
#[derive(Deserialize)]
struct StoredHeader {
    target_version: VersionId,
    #[serde(default)]
    revision: u64,
}

/// Hex digits of the id digest kept in file names.
const DIGEST_CHARS: usize = 16;

impl MappingRepository {
    /// Opens the store at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| RepositoryError::Io {
            operation: "create directory",
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, target_version: &VersionId) -> PathBuf {
        let digest = hex::encode(Sha256::digest(target_version.as_str().as_bytes()));
        self.base_dir.join(format!(
            "{}-{}.json",
            target_version.file_stem(),
            &digest[..DIGEST_CHARS]
        ))
    }

    /// Saves `mapping`, bumping its revision and `updated_at`.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the stored revision is
    /// not the one `mapping` was loaded at, and with
    /// [`RepositoryError::InvalidPlan`] when a mapping's state and candidate
    /// key disagree. `mapping` is left untouched on failure.
    pub fn save(&self, mapping: &mut DataSetVersionMapping) -> Result<PathBuf> {
        let violations = check_invariants(mapping);
        if !violations.is_empty() {
            for violation in &violations {
                warn!(%violation, "refusing to save inconsistent mapping");
            }
            return Err(RepositoryError::InvalidPlan { violations });
        }

        let path = self.path_for(&mapping.target_version);
        let found = self.stored_revision(&path, &mapping.target_version)?;
        if found != mapping.revision {
            return Err(RepositoryError::Conflict {
                expected: mapping.revision,
                found,
            });
        }

        let mut next = mapping.clone();
        next.revision += 1;
        next.updated_at = Utc::now();
        next.refresh_completeness();
        let json = serde_json::to_vec_pretty(&next).map_err(|source| RepositoryError::Json {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &json)?;

        *mapping = next;
        info!(
            target_version = %mapping.target_version,
            revision = mapping.revision,
            path = %path.display(),
            "mapping saved"
        );
        Ok(path)
    }

    /// Loads the mapping stored for `target_version`.
    ///
    /// A file that records a different target version is treated as absent.
    pub fn load(&self, target_version: &VersionId) -> Result<DataSetVersionMapping> {
        let not_found = || RepositoryError::NotFound {
            target_version: target_version.clone(),
        };
        let path = self.path_for(target_version);
        if !path.exists() {
            return Err(not_found());
        }
        let mapping: DataSetVersionMapping = read_json(&path)?;
        if mapping.target_version != *target_version {
            warn!(
                path = %path.display(),
                stored = %mapping.target_version,
                requested = %target_version,
                "mapping file belongs to another version"
            );
            return Err(not_found());
        }
        Ok(mapping)
    }

    pub fn exists(&self, target_version: &VersionId) -> bool {
        let path = self.path_for(target_version);
        path.exists()
            && read_json::<StoredHeader>(&path)
                .is_ok_and(|header| header.target_version == *target_version)
    }

    /// Every readable mapping in the store, ordered by target then source
    /// version. Unreadable files are skipped with a warning.
    pub fn list(&self) -> Result<Vec<StoredMappingMetadata>> {
        let entries = fs::read_dir(&self.base_dir).map_err(|source| RepositoryError::Io {
            operation: "read",
            path: self.base_dir.clone(),
            source,
        })?;

        let mut metadata = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| RepositoryError::Io {
                    operation: "read",
                    path: self.base_dir.clone(),
                    source,
                })?
                .path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<DataSetVersionMapping>(&path) {
                Ok(stored) => metadata.push(StoredMappingMetadata {
                    entry_count: stored.entries().len(),
                    mappings_complete: stored.mappings_complete(),
                    frozen: stored.is_frozen(),
                    revision: stored.revision,
                    updated_at: stored.updated_at,
                    source_version: stored.source_version,
                    target_version: stored.target_version,
                    file_path: path,
                }),
                Err(error) => warn!(path = %path.display(), %error, "skipping unreadable mapping file"),
            }
        }

        metadata.sort_by(|a, b| {
            a.target_version
                .cmp(&b.target_version)
                .then_with(|| a.source_version.cmp(&b.source_version))
        });
        Ok(metadata)
    }

    /// Deletes the stored mapping. Returns `false` if there was none.
    pub fn delete(&self, target_version: &VersionId) -> Result<bool> {
        let path = self.path_for(target_version);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| RepositoryError::Io {
            operation: "delete",
            path: path.clone(),
            source,
        })?;
        info!(target_version = %target_version, "mapping deleted");
        Ok(true)
    }

    /// Revision on disk for `target_version`; 0 when nothing is stored.
    ///
    /// A file recorded for another version is never overwritten.
    fn stored_revision(&self, path: &Path, target_version: &VersionId) -> Result<u64> {
        if !path.exists() {
            return Ok(0);
        }
        let header = read_json::<StoredHeader>(path)?;
        if header.target_version != *target_version {
            return Err(RepositoryError::Occupied {
                path: path.to_path_buf(),
                stored: header.target_version,
            });
        }
        Ok(header.revision)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read(path).map_err(|source| RepositoryError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| RepositoryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");
    let io_error = |operation: &'static str, path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| RepositoryError::Io {
            operation,
            path,
            source,
        }
    };

    let written = File::create(&temp_path)
        .map_err(io_error("create", &temp_path))
        .and_then(|mut file| {
            file.write_all(bytes)
                .map_err(io_error("write", &temp_path))?;
            file.sync_all().map_err(io_error("sync", &temp_path))
        })
        .and_then(|()| fs::rename(&temp_path, path).map_err(io_error("rename", path)));
    if written.is_err()
        && temp_path.exists()
        && let Err(error) = fs::remove_file(&temp_path)
    {
        warn!(path = %temp_path.display(), %error, "could not remove temp file");
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        dir.push(format!("dsv_map_atomic_{stamp}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = temp_dir();
        // A non-empty directory in the way makes the final rename fail.
        let target = dir.join("occupied.json");
        fs::create_dir_all(target.join("inner")).unwrap();

        let result = write_atomic(&target, b"{}");
        assert!(matches!(
            result,
            Err(RepositoryError::Io {
                operation: "rename",
                ..
            })
        ));
        assert!(!target.with_extension("json.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_names_keep_similar_ids_apart() {
        let repo = MappingRepository {
            base_dir: PathBuf::from("store"),
        };
        let slash = repo.path_for(&VersionId::new("v/1").unwrap());
        let underscore = repo.path_for(&VersionId::new("v_1").unwrap());
        assert_ne!(slash, underscore);
        let name = underscore.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("v_1-"));
        assert!(name.ends_with(".json"));
    }
}
