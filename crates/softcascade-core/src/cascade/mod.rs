//! Soft-delete cascade resolution.

mod executor;
mod many_to_many;
mod notify;
mod successor;

pub use executor::{CascadeExecutor, PlannedAssociation};
pub use many_to_many::ManyToManyUnlinker;
pub use notify::ChangeNotifier;
pub use successor::SuccessorLocator;

use serde::Serialize;

use crate::mutation::{Mutation, MutationKind};
use crate::value::EntityRef;

/// Result of a cascade run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CascadeResult {
    /// Every field change, in the order applied.
    pub mutations: Vec<Mutation>,
    /// Entities soft-deleted by the run.
    pub soft_deleted: Vec<EntityRef>,
    /// Entities handed to the persistence layer for hard deletion.
    pub removed: Vec<EntityRef>,
}

impl CascadeResult {
    /// Create an empty cascade result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of affected entities.
    pub fn affected_count(&self) -> usize {
        let mut affected: Vec<&EntityRef> = self
            .mutations
            .iter()
            .map(|m| &m.entity)
            .chain(&self.removed)
            .collect();
        affected.sort();
        affected.dedup();
        affected.len()
    }

    /// Check if the run changed nothing.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.removed.is_empty()
    }

    /// Mutations of one kind.
    pub fn mutations_of(&self, kind: MutationKind) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter().filter(move |m| m.kind == kind)
    }
}
