//! Field definitions for entity types.

use super::association::AssociationDef;
use rkyv::Archive;

/// A field definition within an entity type.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Association held by this field, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<AssociationDef>,
    /// Marks the field whose value replaces references to a deleted
    /// instance under the successor policy.
    #[serde(default)]
    pub successor: bool,
}

impl FieldDef {
    /// Create a plain (non-association) field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            association: None,
            successor: false,
        }
    }

    /// Create an association field.
    pub fn association(name: impl Into<String>, association: AssociationDef) -> Self {
        Self {
            name: name.into(),
            association: Some(association),
            successor: false,
        }
    }

    /// Mark this field as the successor of its entity type.
    pub fn successor(mut self) -> Self {
        self.successor = true;
        self
    }

    /// Check if this field holds an association.
    pub fn is_association(&self) -> bool {
        self.association.is_some()
    }
}
