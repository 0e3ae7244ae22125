//! Error types for the mapping engine.
//!
//! Mutation and lifecycle failures are [`MappingError`]s; storage failures
//! are [`RepositoryError`]s carrying user-facing messages and hints.

use std::path::PathBuf;

use thiserror::Error;

use dsv_model::{MappingAddress, VersionId};

use crate::evaluate::InvariantViolation;

/// Broad class of a [`MappingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request referenced something that does not exist.
    Validation,
    /// The mapping is in a state that forbids the request.
    State,
    /// A snapshot or store could not be read.
    Infrastructure,
}

/// Failure to read a metadata snapshot.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read snapshot {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("no source mapping at {0}")]
    SourceNotFound(MappingAddress),

    #[error("candidate '{candidate_key}' is not available for {address}")]
    CandidateNotFound {
        address: MappingAddress,
        candidate_key: String,
    },

    #[error("mapping {source_version} -> {target_version} is frozen")]
    Frozen {
        source_version: VersionId,
        target_version: VersionId,
    },

    #[error("failed to load {role} snapshot")]
    Snapshot {
        role: &'static str,
        #[source]
        source: ProviderError,
    },
}

impl MappingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound(_) | Self::CandidateNotFound { .. } => ErrorKind::Validation,
            Self::Frozen { .. } => ErrorKind::State,
            Self::Snapshot { .. } => ErrorKind::Infrastructure,
        }
    }
}

/// Persistence failure.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mapping file {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no stored mapping for target version {target_version}")]
    NotFound { target_version: VersionId },

    #[error("stored revision is {found}, expected {expected}")]
    Conflict { expected: u64, found: u64 },

    #[error("{path} already holds the mapping for {stored}")]
    Occupied { path: PathBuf, stored: VersionId },

    #[error("mapping violates {} invariant(s)", violations.len())]
    InvalidPlan { violations: Vec<InvariantViolation> },
}

impl RepositoryError {
    /// A user-facing message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} {}", operation, path.display()),
            Self::Json { path, .. } => format!(
                "The mapping file {} is not valid. It may have been edited by hand.",
                path.display()
            ),
            Self::NotFound { target_version } => {
                format!("There is no mapping for version {target_version} yet.")
            }
            Self::Conflict { .. } => {
                "The mapping was changed by someone else since it was loaded.".to_string()
            }
            Self::Occupied { path, stored } => format!(
                "The file {} belongs to the mapping for version {stored}.",
                path.display()
            ),
            Self::InvalidPlan { violations } => {
                let first = violations
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                format!("The mapping is inconsistent and was not saved: {first}")
            }
        }
    }

    /// A hint for resolving this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::Json { .. } => Some("Restore the file from a backup or run `plan` again.".into()),
            Self::NotFound { .. } => Some("Create it with the `plan` command.".into()),
            Self::Conflict { .. } => Some("Reload the mapping and apply the change again.".into()),
            Self::Occupied { .. } => Some("Move the file out of the store and retry.".into()),
            Self::InvalidPlan { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
