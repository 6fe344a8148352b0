//! Mutation records emitted by the cascade.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::FieldIndex;
use crate::value::{EntityRef, Value};

/// Field changes handed to the persistence layer: `field -> (old, new)`.
pub type ChangeSet = BTreeMap<String, (Value, Value)>;

/// Why a field was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationKind {
    /// Reference nulled out.
    SetNull,
    /// Reference replaced by the deleted entity's successor.
    Successor,
    /// Deleted-at timestamp written.
    SoftDelete,
    /// Deleted entity removed from a collection.
    Unlink,
    /// Collection of the deleted entity emptied.
    Clear,
}

/// A single field change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    /// Mutated entity.
    pub entity: EntityRef,
    /// Field name.
    pub field: String,
    /// Field position.
    #[serde(skip)]
    pub field_index: FieldIndex,
    /// Value before the change.
    pub old: Value,
    /// Value after the change.
    pub new: Value,
    /// Reason for the change.
    pub kind: MutationKind,
}

impl Mutation {
    /// Change set scheduling this mutation as an extra update.
    pub fn change_set(&self) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.insert(self.field.clone(), (self.old.clone(), self.new.clone()));
        changes
    }
}
