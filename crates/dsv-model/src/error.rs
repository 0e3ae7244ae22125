use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid public id: {0:?}")]
    InvalidPublicId(String),
    #[error("invalid version id: {0:?}")]
    InvalidVersionId(String),
    #[error("unknown geographic level: {0:?}")]
    UnknownGeographicLevel(String),
    #[error("unknown mapping category: {0:?}")]
    UnknownCategory(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
