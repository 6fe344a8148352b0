//! Association definitions between entity types.

use std::fmt;

use rkyv::Archive;

/// Kind of an association.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum AssociationKind {
    /// Many owners reference one target.
    ManyToOne,
    /// One owner references one target (unique foreign key).
    OneToOne,
    /// Collection on both sides, backed by a join definition.
    ManyToMany,
    /// Inverse collection of a many-to-one. Never cascaded.
    OneToMany,
}

impl AssociationKind {
    /// Whether soft-delete cascades process this kind at all.
    pub fn is_supported(&self) -> bool {
        !matches!(self, AssociationKind::OneToMany)
    }

    /// Whether the owning field holds a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, AssociationKind::ManyToMany | AssociationKind::OneToMany)
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssociationKind::ManyToOne => "ManyToOne",
            AssociationKind::OneToOne => "OneToOne",
            AssociationKind::ManyToMany => "ManyToMany",
            AssociationKind::OneToMany => "OneToMany",
        };
        f.write_str(name)
    }
}

/// An association declared on a field.
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
pub struct AssociationDef {
    /// Association kind.
    pub kind: AssociationKind,
    /// Target entity type name as declared (may be relative).
    pub target: String,
    /// Soft-delete policy token, e.g. `SET_NULL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_soft_delete: Option<String>,
}

impl AssociationDef {
    /// Create an association without a soft-delete policy.
    pub fn new(kind: AssociationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            on_soft_delete: None,
        }
    }

    /// Create a many-to-one association.
    pub fn many_to_one(target: impl Into<String>) -> Self {
        Self::new(AssociationKind::ManyToOne, target)
    }

    /// Create a one-to-one association.
    pub fn one_to_one(target: impl Into<String>) -> Self {
        Self::new(AssociationKind::OneToOne, target)
    }

    /// Create a many-to-many association.
    pub fn many_to_many(target: impl Into<String>) -> Self {
        Self::new(AssociationKind::ManyToMany, target)
    }

    /// Create a one-to-many association.
    pub fn one_to_many(target: impl Into<String>) -> Self {
        Self::new(AssociationKind::OneToMany, target)
    }

    /// Attach a soft-delete policy token.
    pub fn with_on_soft_delete(mut self, token: impl Into<String>) -> Self {
        self.on_soft_delete = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_builders() {
        let owner = AssociationDef::many_to_one("Owner").with_on_soft_delete("SET_NULL");
        assert_eq!(owner.kind, AssociationKind::ManyToOne);
        assert_eq!(owner.target, "Owner");
        assert_eq!(owner.on_soft_delete.as_deref(), Some("SET_NULL"));

        let posts = AssociationDef::many_to_many("Post");
        assert!(posts.kind.is_collection());
        assert!(posts.on_soft_delete.is_none());
    }

    #[test]
    fn test_one_to_many_is_unsupported() {
        assert!(!AssociationKind::OneToMany.is_supported());
        assert!(AssociationKind::ManyToOne.is_supported());
        assert!(AssociationKind::OneToOne.is_supported());
        assert!(AssociationKind::ManyToMany.is_supported());
    }
}
