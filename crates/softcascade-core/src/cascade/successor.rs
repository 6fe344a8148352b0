//! Successor lookup for the successor policy.

use crate::catalog::Catalog;
use crate::context::PersistenceContext;
use crate::error::Result;
use crate::value::{EntityRef, Value};

/// Finds the value that replaces references to a deleted entity.
pub struct SuccessorLocator<'c> {
    catalog: &'c Catalog,
}

impl<'c> SuccessorLocator<'c> {
    /// Create a locator over `catalog`.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// Current value of `entity`'s successor field.
    ///
    /// The field is looked up on the runtime type, inherited fields
    /// included. Fails with `NoSuccessor` or `MultipleSuccessor` unless
    /// exactly one field is marked. The instance is materialized first so a
    /// lazy placeholder is never read.
    pub fn locate(&self, ctx: &mut dyn PersistenceContext, entity: &EntityRef) -> Result<Value> {
        let entity_type = self.catalog.require(&entity.entity_type)?;
        let field = entity_type.successor_field()?;

        ctx.ensure_loaded(entity)?;
        let successor = ctx.read_field(entity, field.index)?;

        tracing::debug!(
            entity = %entity,
            field = %field.name,
            successor = %successor,
            "successor located"
        );

        Ok(successor)
    }
}
