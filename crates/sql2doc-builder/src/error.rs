//! Builder and execution errors

use thiserror::Error;

/// Failures reported by a document store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Malformed document: {0}")]
    Decode(String),
}

/// Construction-time failure. Configuration calls never fail.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No collection selected; call from() before execute()")]
    MissingCollection,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
