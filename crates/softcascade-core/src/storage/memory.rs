//! Committed in-memory rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::fixture::{Fixture, FixtureEntity};
use super::transaction::MemoryTransaction;
use crate::catalog::{Catalog, EntityType};
use crate::error::{CascadeError, Error, Result};
use crate::value::{EntityRef, Value};

/// A stored instance: field values in layout order.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub(crate) values: Vec<Value>,
    pub(crate) lazy: bool,
}

/// In-memory entity store.
///
/// Rows are kept ordered by type name then id, which makes every query
/// deterministic.
pub struct MemoryStore {
    catalog: Arc<Catalog>,
    rows: BTreeMap<EntityRef, Row>,
}

impl MemoryStore {
    /// Create an empty store for the given catalog.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            rows: BTreeMap::new(),
        }
    }

    /// The catalog rows are laid out by.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Insert a materialized instance.
    pub fn insert<'f>(
        &mut self,
        entity_type: &str,
        id: u64,
        fields: impl IntoIterator<Item = (&'f str, Value)>,
    ) -> Result<EntityRef> {
        self.insert_row(entity_type, id, fields, false)
    }

    /// Insert an instance that reads as a placeholder until loaded.
    pub fn insert_lazy<'f>(
        &mut self,
        entity_type: &str,
        id: u64,
        fields: impl IntoIterator<Item = (&'f str, Value)>,
    ) -> Result<EntityRef> {
        self.insert_row(entity_type, id, fields, true)
    }

    fn insert_row<'f>(
        &mut self,
        entity_type: &str,
        id: u64,
        fields: impl IntoIterator<Item = (&'f str, Value)>,
        lazy: bool,
    ) -> Result<EntityRef> {
        let ty = self.catalog.require(entity_type)?;
        if ty.is_abstract {
            return Err(Error::Model(format!(
                "cannot instantiate abstract type {}",
                entity_type
            )));
        }

        let entity = EntityRef::new(entity_type, id);
        if self.rows.contains_key(&entity) {
            return Err(Error::Model(format!("duplicate entity {}", entity)));
        }

        let mut values = empty_row(ty);
        for (name, value) in fields {
            let field = ty
                .field(name)
                .ok_or_else(|| CascadeError::accessor(&entity, name, "unknown field"))?;
            values[field.index.0] = value;
        }

        self.rows.insert(entity.clone(), Row { values, lazy });
        Ok(entity)
    }

    /// Read a committed field by name.
    pub fn get(&self, entity: &EntityRef, field: &str) -> Result<Value> {
        let row = self
            .rows
            .get(entity)
            .ok_or_else(|| Error::NotFound(entity.clone()))?;
        let index = self
            .catalog
            .require(&entity.entity_type)?
            .field(field)
            .ok_or_else(|| CascadeError::accessor(entity, field, "unknown field"))?
            .index;
        Ok(row.values[index.0].clone())
    }

    /// Check whether an instance exists.
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.rows.contains_key(entity)
    }

    /// Check whether an instance is still an unloaded placeholder.
    pub fn is_lazy(&self, entity: &EntityRef) -> bool {
        self.rows.get(entity).is_some_and(|row| row.lazy)
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All stored instances in order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.rows.keys()
    }

    /// Begin a unit of work.
    pub fn transaction(&mut self) -> MemoryTransaction<'_> {
        MemoryTransaction::new(self)
    }

    /// Insert every instance of a fixture.
    pub fn load_fixture(&mut self, fixture: &Fixture) -> Result<()> {
        for entity in &fixture.entities {
            let fields = entity
                .fields
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone()));
            self.insert_row(&entity.entity_type, entity.id, fields, entity.lazy)?;
        }
        tracing::debug!(entities = fixture.entities.len(), "fixture loaded");
        Ok(())
    }

    /// Snapshot the committed state as a fixture.
    pub fn to_fixture(&self) -> Fixture {
        let entities = self
            .rows
            .iter()
            .map(|(entity, row)| {
                let fields: BTreeMap<String, Value> = self
                    .catalog
                    .get(&entity.entity_type)
                    .map(|ty| {
                        ty.fields
                            .iter()
                            .map(|f| (f.name.clone(), row.values[f.index.0].clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                FixtureEntity {
                    entity_type: entity.entity_type.clone(),
                    id: entity.id,
                    lazy: row.lazy,
                    fields,
                }
            })
            .collect();
        Fixture { entities }
    }

    pub(crate) fn row(&self, entity: &EntityRef) -> Option<&Row> {
        self.rows.get(entity)
    }

    pub(crate) fn rows_of_type<'s>(
        &'s self,
        entity_type: &str,
    ) -> impl Iterator<Item = (&'s EntityRef, &'s Row)> + 's {
        let start = EntityRef::new(entity_type, 0);
        let end = EntityRef::new(entity_type, u64::MAX);
        self.rows.range(start..=end)
    }

    pub(crate) fn apply(
        &mut self,
        written: BTreeMap<EntityRef, Vec<Value>>,
        loaded: impl IntoIterator<Item = EntityRef>,
        removed: impl IntoIterator<Item = EntityRef>,
    ) {
        for (entity, values) in written {
            if let Some(row) = self.rows.get_mut(&entity) {
                row.values = values;
                row.lazy = false;
            }
        }
        for entity in loaded {
            if let Some(row) = self.rows.get_mut(&entity) {
                row.lazy = false;
            }
        }
        for entity in removed {
            self.rows.remove(&entity);
        }
    }
}

/// Default values for a fresh instance: empty collections, null otherwise.
fn empty_row(entity_type: &EntityType) -> Vec<Value> {
    entity_type
        .fields
        .iter()
        .map(|f| match &f.association {
            Some(assoc) if assoc.kind.is_collection() => Value::RefSet(Vec::new()),
            _ => Value::Null,
        })
        .collect()
}
