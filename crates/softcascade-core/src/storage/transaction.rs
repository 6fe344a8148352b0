//! Buffered unit of work over a [`MemoryStore`].

use std::collections::{BTreeMap, BTreeSet};

use super::memory::MemoryStore;
use crate::catalog::FieldIndex;
use crate::context::{PersistenceContext, SoftDeletePhase};
use crate::error::{CascadeError, Error, Result};
use crate::mutation::{ChangeSet, Mutation};
use crate::value::{EntityRef, Value};

/// A unit of work over a [`MemoryStore`].
///
/// Writes go to a local cache and removals are collected; the store only
/// changes on [`commit`](Self::commit). Dropping the transaction discards
/// everything.
pub struct MemoryTransaction<'s> {
    store: &'s mut MemoryStore,
    /// Local cache for uncommitted writes (entity -> full row).
    write_cache: BTreeMap<EntityRef, Vec<Value>>,
    /// Lazy rows materialized in this transaction.
    loaded: BTreeSet<EntityRef>,
    /// Rows scheduled for hard deletion.
    removed: BTreeSet<EntityRef>,
    /// Mutations reported to change tracking.
    marked: Vec<Mutation>,
    /// Extra updates scheduled for the flush.
    scheduled: Vec<(EntityRef, ChangeSet)>,
    /// Soft-delete lifecycle events, in order.
    events: Vec<(SoftDeletePhase, EntityRef)>,
}

impl<'s> MemoryTransaction<'s> {
    pub(crate) fn new(store: &'s mut MemoryStore) -> Self {
        Self {
            store,
            write_cache: BTreeMap::new(),
            loaded: BTreeSet::new(),
            removed: BTreeSet::new(),
            marked: Vec::new(),
            scheduled: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Apply every buffered change to the store.
    pub fn commit(self) -> Result<()> {
        tracing::debug!(
            updated = self.write_cache.len(),
            removed = self.removed.len(),
            scheduled = self.scheduled.len(),
            "committing transaction"
        );
        self.store.apply(self.write_cache, self.loaded, self.removed);
        Ok(())
    }

    /// Discard every buffered change.
    pub fn rollback(self) {
        tracing::debug!(
            discarded = self.write_cache.len() + self.removed.len(),
            "rolling back transaction"
        );
    }

    /// Read a field by name, seeing uncommitted writes.
    pub fn get(&self, entity: &EntityRef, field: &str) -> Result<Value> {
        let index = self
            .store
            .catalog()
            .require(&entity.entity_type)?
            .field(field)
            .ok_or_else(|| CascadeError::accessor(entity, field, "unknown field"))?
            .index;
        let values = self.values(entity)?;
        Ok(values[index.0].clone())
    }

    /// Mutations reported through `mark_mutated`.
    pub fn marked(&self) -> &[Mutation] {
        &self.marked
    }

    /// Updates scheduled through `schedule_update`.
    pub fn scheduled_updates(&self) -> &[(EntityRef, ChangeSet)] {
        &self.scheduled
    }

    /// Entities scheduled for hard deletion.
    pub fn removed(&self) -> impl Iterator<Item = &EntityRef> {
        self.removed.iter()
    }

    /// Soft-delete lifecycle events.
    pub fn events(&self) -> &[(SoftDeletePhase, EntityRef)] {
        &self.events
    }

    /// Check whether there is anything to commit.
    pub fn is_dirty(&self) -> bool {
        !self.write_cache.is_empty() || !self.removed.is_empty()
    }

    /// Current values of a live row.
    fn values(&self, entity: &EntityRef) -> Result<&[Value]> {
        if self.removed.contains(entity) {
            return Err(Error::NotFound(entity.clone()));
        }
        if let Some(values) = self.write_cache.get(entity) {
            return Ok(values);
        }
        self.store
            .row(entity)
            .map(|row| row.values.as_slice())
            .ok_or_else(|| Error::NotFound(entity.clone()))
    }

    fn is_placeholder(&self, entity: &EntityRef) -> bool {
        !self.write_cache.contains_key(entity)
            && !self.loaded.contains(entity)
            && self.store.is_lazy(entity)
    }

    fn scan(
        &self,
        owner_type: &str,
        field: FieldIndex,
        matches: impl Fn(&Value) -> bool,
    ) -> Vec<EntityRef> {
        self.store
            .rows_of_type(owner_type)
            .filter(|(entity, _)| !self.removed.contains(*entity))
            .filter(|(entity, row)| {
                let values = self
                    .write_cache
                    .get(*entity)
                    .map(Vec::as_slice)
                    .unwrap_or(row.values.as_slice());
                values.get(field.0).is_some_and(&matches)
            })
            .map(|(entity, _)| entity.clone())
            .collect()
    }
}

impl PersistenceContext for MemoryTransaction<'_> {
    fn find_referencing(
        &self,
        owner_type: &str,
        field: FieldIndex,
        target: &EntityRef,
    ) -> Result<Vec<EntityRef>> {
        Ok(self.scan(owner_type, field, |value| {
            value.as_ref_entity() == Some(target)
        }))
    }

    fn find_containing(
        &self,
        owner_type: &str,
        field: FieldIndex,
        member: &EntityRef,
    ) -> Result<Vec<EntityRef>> {
        Ok(self.scan(owner_type, field, |value| {
            value.as_ref_set().is_some_and(|refs| refs.contains(member))
        }))
    }

    fn ensure_loaded(&mut self, entity: &EntityRef) -> Result<()> {
        self.values(entity)?;
        if self.store.is_lazy(entity) && self.loaded.insert(entity.clone()) {
            tracing::trace!(entity = %entity, "lazy row materialized");
        }
        Ok(())
    }

    fn read_field(&self, entity: &EntityRef, field: FieldIndex) -> Result<Value> {
        let values = self.values(entity)?;
        let value = values.get(field.0).ok_or_else(|| {
            CascadeError::accessor(entity, field.to_string(), "field index out of range")
        })?;
        if self.is_placeholder(entity) {
            return Ok(Value::Null);
        }
        Ok(value.clone())
    }

    fn write_field(&mut self, entity: &EntityRef, field: FieldIndex, value: Value) -> Result<()> {
        let mut values = self.values(entity)?.to_vec();
        let slot = values.get_mut(field.0).ok_or_else(|| {
            CascadeError::accessor(entity, field.to_string(), "field index out of range")
        })?;
        *slot = value;
        self.write_cache.insert(entity.clone(), values);
        Ok(())
    }

    fn mark_mutated(&mut self, mutation: &Mutation) {
        self.marked.push(mutation.clone());
    }

    fn schedule_update(&mut self, entity: &EntityRef, changes: ChangeSet) {
        self.scheduled.push((entity.clone(), changes));
    }

    fn remove(&mut self, entity: &EntityRef) -> Result<()> {
        self.values(entity)?;
        self.write_cache.remove(entity);
        self.removed.insert(entity.clone());
        Ok(())
    }

    fn on_soft_delete(&mut self, phase: SoftDeletePhase, entity: &EntityRef) -> Result<()> {
        self.events.push((phase, entity.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssociationDef, Catalog, EntityDef, FieldDef, ModelBundle};
    use std::sync::Arc;

    fn store() -> MemoryStore {
        let model = ModelBundle::new(1)
            .with_entity(EntityDef::new("Owner").with_field(FieldDef::new("name")))
            .with_entity(EntityDef::new("Tag").with_field(FieldDef::association(
                "owner",
                AssociationDef::many_to_one("Owner"),
            )));
        let mut store = MemoryStore::new(Arc::new(Catalog::build(&model).unwrap()));
        let owner = store
            .insert_lazy("Owner", 1, [("name", Value::String("ada".into()))])
            .unwrap();
        store.insert("Tag", 7, [("owner", Value::Ref(owner.clone()))]).unwrap();
        store.insert("Tag", 8, [("owner", Value::Ref(owner))]).unwrap();
        store
    }

    #[test]
    fn test_writes_invisible_until_commit() {
        let mut store = store();
        let tag = EntityRef::new("Tag", 7);

        let mut tx = store.transaction();
        tx.write_field(&tag, FieldIndex(0), Value::Null).unwrap();
        assert_eq!(tx.get(&tag, "owner").unwrap(), Value::Null);
        assert!(tx.is_dirty());
        tx.rollback();

        assert_eq!(
            store.get(&tag, "owner").unwrap(),
            Value::Ref(EntityRef::new("Owner", 1))
        );

        let mut tx = store.transaction();
        tx.write_field(&tag, FieldIndex(0), Value::Null).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.get(&tag, "owner").unwrap(), Value::Null);
    }

    #[test]
    fn test_find_referencing_sees_cache_and_removals() {
        let mut store = store();
        let owner = EntityRef::new("Owner", 1);

        let mut tx = store.transaction();
        let found = tx.find_referencing("Tag", FieldIndex(0), &owner).unwrap();
        assert_eq!(found, vec![EntityRef::new("Tag", 7), EntityRef::new("Tag", 8)]);

        tx.write_field(&EntityRef::new("Tag", 7), FieldIndex(0), Value::Null)
            .unwrap();
        tx.remove(&EntityRef::new("Tag", 8)).unwrap();
        assert!(tx.find_referencing("Tag", FieldIndex(0), &owner).unwrap().is_empty());

        tx.commit().unwrap();
        assert!(!store.contains(&EntityRef::new("Tag", 8)));
    }

    #[test]
    fn test_lazy_rows_read_as_placeholder() {
        let mut store = store();
        let owner = EntityRef::new("Owner", 1);

        let mut tx = store.transaction();
        assert_eq!(tx.read_field(&owner, FieldIndex(0)).unwrap(), Value::Null);
        tx.ensure_loaded(&owner).unwrap();
        assert_eq!(
            tx.read_field(&owner, FieldIndex(0)).unwrap(),
            Value::String("ada".into())
        );
        tx.commit().unwrap();

        assert!(!store.is_lazy(&owner));
    }

    #[test]
    fn test_accessor_errors() {
        let mut store = store();
        let mut tx = store.transaction();
        let tag = EntityRef::new("Tag", 7);

        let err = tx.read_field(&tag, FieldIndex(5)).unwrap_err();
        assert!(matches!(err, Error::Cascade(CascadeError::Accessor { .. })));
        assert!(tx.write_field(&tag, FieldIndex(5), Value::Null).is_err());
        assert!(matches!(
            tx.read_field(&EntityRef::new("Tag", 99), FieldIndex(0)),
            Err(Error::NotFound(_))
        ));
    }
}
