//! The persistence collaborator the cascade runs against.

use crate::catalog::FieldIndex;
use crate::error::Result;
use crate::mutation::{ChangeSet, Mutation};
use crate::value::{EntityRef, Value};

/// Lifecycle phase of a nested soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftDeletePhase {
    /// Before the deleted-at field is written.
    Pre,
    /// After the deleted-at field is written.
    Post,
}

/// Operations the cascade needs from the persistence layer.
///
/// Implementations wrap one unit of work. Nothing written through this trait
/// may become durable before the caller commits; an error from the cascade
/// means the unit of work must be discarded.
pub trait PersistenceContext {
    /// Instances whose runtime type is exactly `owner_type` and whose single
    /// reference `field` points at `target`.
    fn find_referencing(
        &self,
        owner_type: &str,
        field: FieldIndex,
        target: &EntityRef,
    ) -> Result<Vec<EntityRef>>;

    /// Instances whose runtime type is exactly `owner_type` and whose
    /// collection `field` contains `member`.
    fn find_containing(
        &self,
        owner_type: &str,
        field: FieldIndex,
        member: &EntityRef,
    ) -> Result<Vec<EntityRef>>;

    /// Materialize a lazily loaded instance so its fields can be read.
    fn ensure_loaded(&mut self, entity: &EntityRef) -> Result<()>;

    /// Read a field.
    fn read_field(&self, entity: &EntityRef, field: FieldIndex) -> Result<Value>;

    /// Write a field in place.
    fn write_field(&mut self, entity: &EntityRef, field: FieldIndex, value: Value) -> Result<()>;

    /// Tell change tracking a field changed.
    fn mark_mutated(&mut self, mutation: &Mutation);

    /// Include field changes in the next flush.
    fn schedule_update(&mut self, entity: &EntityRef, changes: ChangeSet);

    /// Hard-delete an instance.
    fn remove(&mut self, entity: &EntityRef) -> Result<()>;

    /// Lifecycle hook around nested soft deletes.
    fn on_soft_delete(&mut self, _phase: SoftDeletePhase, _entity: &EntityRef) -> Result<()> {
        Ok(())
    }
}
