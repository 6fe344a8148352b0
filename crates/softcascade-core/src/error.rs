//! Core error types.

use thiserror::Error;

use crate::catalog::AssociationKind;
use crate::policy::Policy;
use crate::value::EntityRef;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A cascade could not be resolved.
    #[error("cascade error: {0}")]
    Cascade(#[from] CascadeError),

    /// The model definition is inconsistent.
    #[error("model error: {0}")]
    Model(String),

    /// Entity type is not registered in the catalog.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Entity instance does not exist in the store.
    #[error("entity not found: {0}")]
    NotFound(EntityRef),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving a soft-delete cascade.
///
/// All of these are configuration or modeling errors. None of them are
/// transient, so the whole soft delete is aborted.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Declared policy token is not a known policy.
    #[error("unknown soft-delete policy '{token}'")]
    UnknownPolicy {
        /// The token as declared.
        token: String,
    },

    /// Policy cannot be applied to the association kind.
    #[error("{policy} is not supported for {kind} relationships ({owner}.{field})")]
    Applicability {
        /// Declared policy.
        policy: Policy,
        /// Association kind.
        kind: AssociationKind,
        /// Owning entity type.
        owner: String,
        /// Association field.
        field: String,
    },

    /// Successor target type has no successor field.
    #[error("one field of {entity_type} must be marked as successor")]
    NoSuccessor {
        /// Type of the deleted entity.
        entity_type: String,
    },

    /// Successor target type has more than one successor field.
    #[error("only one field of {entity_type} can be marked as successor, found {fields:?}")]
    MultipleSuccessor {
        /// Type of the deleted entity.
        entity_type: String,
        /// Every field carrying the marker.
        fields: Vec<String>,
    },

    /// Field cannot be read or written.
    #[error("no accessor for {field} in {entity}: {reason}")]
    Accessor {
        /// Entity being accessed.
        entity: String,
        /// Field name or index.
        field: String,
        /// What went wrong.
        reason: String,
    },

    /// Cascade target lacks a usable soft-delete field.
    #[error("no soft-delete configuration or invalid deleted-at field on {entity_type}")]
    MissingCascadeField {
        /// Type the cascade tried to soft-delete.
        entity_type: String,
    },

    /// Nested cascades went deeper than the configured limit.
    #[error("cascade depth {depth} exceeds maximum")]
    MaxDepthExceeded {
        /// Depth reached.
        depth: usize,
    },
}

impl CascadeError {
    /// Build an accessor error.
    pub fn accessor(
        entity: impl ToString,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CascadeError::Accessor {
            entity: entity.to_string(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
