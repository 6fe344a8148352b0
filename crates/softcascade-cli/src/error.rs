//! CLI error types.

use thiserror::Error;

/// Errors reported by the command-line client.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the cascade engine or catalog.
    #[error(transparent)]
    Core(#[from] softcascade_core::Error),

    /// Entity argument is not of the form `Type#id`.
    #[error("invalid entity '{0}', expected Type#id")]
    InvalidEntity(String),

    /// Entity type is not part of the model.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
