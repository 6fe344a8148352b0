//! Entity type definitions.

use super::field::FieldDef;
use rkyv::Archive;

/// Separator between namespace segments of an entity type name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// An entity type definition.
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
pub struct EntityDef {
    /// Fully qualified type name, e.g. `blog::Post`.
    pub name: String,
    /// Supertype name. Must be declared before this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Abstract types have no instances of their own.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Field definitions in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Soft-delete configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete: Option<SoftDeleteDef>,
}

/// Soft-delete configuration of an entity type.
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
pub struct SoftDeleteDef {
    /// Name of the field holding the deletion timestamp.
    pub field_name: String,
}

impl EntityDef {
    /// Create a new entity type definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_abstract: false,
            fields: Vec::new(),
            soft_delete: None,
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Set the supertype.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Mark the type as abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Enable soft delete using the given deleted-at field.
    pub fn with_soft_delete(mut self, field_name: impl Into<String>) -> Self {
        self.soft_delete = Some(SoftDeleteDef {
            field_name: field_name.into(),
        });
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Namespace part of the type name, or `""` at the root.
    pub fn namespace(&self) -> &str {
        namespace_of(&self.name)
    }
}

/// Namespace part of a type name, or `""` at the root.
pub fn namespace_of(name: &str) -> &str {
    name.rsplit_once(NAMESPACE_SEPARATOR)
        .map(|(ns, _)| ns)
        .unwrap_or("")
}
