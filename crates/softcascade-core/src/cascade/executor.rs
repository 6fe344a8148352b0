//! Cascade executor for soft deletes.
//!
//! Given an entity about to be soft-deleted, every association pointing at it
//! is resolved according to its declared policy:
//! - SET_NULL: null the referencing field
//! - SUCCESSOR: replace the reference with the deleted entity's successor
//! - CASCADE: soft-delete the referencing entity (hard-delete when its type
//!   is not soft-deleteable)
//!
//! Many-to-many associations are only unlinked.

use std::collections::HashSet;

use super::many_to_many::ManyToManyUnlinker;
use super::notify::ChangeNotifier;
use super::successor::SuccessorLocator;
use super::CascadeResult;
use crate::catalog::{AssociationKind, AssociationTarget, Catalog, EntityType, Field};
use crate::config::CascadeConfig;
use crate::context::{PersistenceContext, SoftDeletePhase};
use crate::error::{CascadeError, Result};
use crate::mutation::{Mutation, MutationKind};
use crate::policy::{self, Policy};
use crate::value::{EntityRef, Value};

/// An association scheduled for processing, with its policy already
/// resolved and validated.
#[derive(Debug, Clone, Copy)]
pub struct PlannedAssociation<'c> {
    /// The association.
    pub target: AssociationTarget<'c>,
    /// Resolved policy.
    pub policy: Policy,
}

/// State of one cascade run.
#[derive(Default)]
struct CascadeRun {
    notifier: ChangeNotifier,
    visited: HashSet<EntityRef>,
    soft_deleted: Vec<EntityRef>,
    removed: Vec<EntityRef>,
}

impl CascadeRun {
    fn finish(self) -> CascadeResult {
        CascadeResult {
            mutations: self.notifier.into_journal(),
            soft_deleted: self.soft_deleted,
            removed: self.removed,
        }
    }
}

/// Executes soft-delete cascades.
pub struct CascadeExecutor<'a> {
    catalog: &'a Catalog,
    config: CascadeConfig,
    clock: Box<dyn Fn() -> i64 + 'a>,
}

impl<'a> CascadeExecutor<'a> {
    /// Create a cascade executor with the default configuration.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            config: CascadeConfig::default(),
            clock: Box::new(|| chrono::Utc::now().timestamp_micros()),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: CascadeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock producing deleted-at timestamps (µs since epoch).
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Pre-soft-delete callback: resolve every association pointing at
    /// `entity` before the soft-delete extension flags it.
    ///
    /// `entity`'s own deleted-at field is left alone.
    pub fn on_pre_soft_delete(
        &self,
        ctx: &mut dyn PersistenceContext,
        entity: &EntityRef,
    ) -> Result<CascadeResult> {
        ctx.ensure_loaded(entity)?;

        let mut run = CascadeRun::default();
        run.visited.insert(entity.clone());

        self.cascade(ctx, &mut run, entity, 0)?;

        let result = run.finish();
        tracing::info!(
            entity = %entity,
            mutations = result.mutations.len(),
            soft_deleted = result.soft_deleted.len(),
            removed = result.removed.len(),
            "soft-delete cascade complete"
        );
        Ok(result)
    }

    /// Soft-delete `entity` itself: cascade, then write its deleted-at field.
    ///
    /// A no-op if the entity is already soft-deleted.
    pub fn soft_delete(
        &self,
        ctx: &mut dyn PersistenceContext,
        entity: &EntityRef,
    ) -> Result<CascadeResult> {
        let entity_type = self.catalog.require(&entity.entity_type)?;

        let mut run = CascadeRun::default();
        self.soft_delete_nested(ctx, &mut run, entity_type, entity, 0)?;

        let result = run.finish();
        tracing::info!(
            entity = %entity,
            mutations = result.mutations.len(),
            soft_deleted = result.soft_deleted.len(),
            removed = result.removed.len(),
            "soft delete complete"
        );
        Ok(result)
    }

    /// Resolve and validate the policy of every association a soft delete of
    /// an `entity_type` instance visits.
    ///
    /// Runs before any mutation, so a bad declaration aborts with nothing
    /// changed.
    pub fn plan(&self, entity_type: &EntityType) -> Result<Vec<PlannedAssociation<'a>>> {
        let catalog: &'a Catalog = self.catalog;
        let entity_type = catalog.require(&entity_type.name)?;

        let mut planned = Vec::new();
        for target in catalog.cascade_candidates(entity_type) {
            let Some(policy) = target.policy()? else {
                continue;
            };
            policy::validate(
                policy,
                target.association.kind,
                &target.owner.name,
                &target.field.name,
            )?;
            planned.push(PlannedAssociation { target, policy });
        }
        Ok(planned)
    }

    fn cascade(
        &self,
        ctx: &mut dyn PersistenceContext,
        run: &mut CascadeRun,
        entity: &EntityRef,
        depth: usize,
    ) -> Result<()> {
        if self.config.exceeds_depth(depth) {
            return Err(CascadeError::MaxDepthExceeded { depth }.into());
        }

        let entity_type = self.catalog.require(&entity.entity_type)?;

        for planned in self.plan(entity_type)? {
            let AssociationTarget { owner, field, .. } = planned.target;

            tracing::debug!(
                entity = %entity,
                owner = %owner.name,
                field = %field.name,
                policy = %planned.policy,
                depth,
                "processing association"
            );

            if planned.target.association.kind == AssociationKind::ManyToMany {
                ManyToManyUnlinker::new(self.catalog).unlink(
                    ctx,
                    &mut run.notifier,
                    entity,
                    &planned.target,
                )?;
                continue;
            }

            let referencing = ctx.find_referencing(&owner.name, field.index, entity)?;
            for object in referencing {
                match planned.policy {
                    Policy::SetNull => self.set_null(ctx, run, &object, field)?,
                    Policy::Successor => self.substitute_successor(ctx, run, &object, field, entity)?,
                    Policy::Cascade => self.cascade_to(ctx, run, owner, &object, depth)?,
                }
            }
        }

        Ok(())
    }

    fn set_null(
        &self,
        ctx: &mut dyn PersistenceContext,
        run: &mut CascadeRun,
        object: &EntityRef,
        field: &Field,
    ) -> Result<()> {
        ctx.ensure_loaded(object)?;
        let old = ctx.read_field(object, field.index)?;
        run.notifier.apply(
            ctx,
            Mutation {
                entity: object.clone(),
                field: field.name.clone(),
                field_index: field.index,
                old,
                new: Value::Null,
                kind: MutationKind::SetNull,
            },
        )
    }

    fn substitute_successor(
        &self,
        ctx: &mut dyn PersistenceContext,
        run: &mut CascadeRun,
        object: &EntityRef,
        field: &Field,
        deleted: &EntityRef,
    ) -> Result<()> {
        ctx.ensure_loaded(object)?;
        let old = ctx.read_field(object, field.index)?;
        let successor = SuccessorLocator::new(self.catalog).locate(ctx, deleted)?;
        run.notifier.apply(
            ctx,
            Mutation {
                entity: object.clone(),
                field: field.name.clone(),
                field_index: field.index,
                old,
                new: successor,
                kind: MutationKind::Successor,
            },
        )
    }

    fn cascade_to(
        &self,
        ctx: &mut dyn PersistenceContext,
        run: &mut CascadeRun,
        owner: &EntityType,
        object: &EntityRef,
        depth: usize,
    ) -> Result<()> {
        if owner.has_soft_delete() {
            return self.soft_delete_nested(ctx, run, owner, object, depth + 1);
        }

        if !self.config.hard_delete_fallback {
            return Err(CascadeError::MissingCascadeField {
                entity_type: owner.name.clone(),
            }
            .into());
        }

        if !run.removed.contains(object) {
            ctx.remove(object)?;
            tracing::debug!(entity = %object, "cascade target hard-deleted");
            run.removed.push(object.clone());
        }
        Ok(())
    }

    /// Soft-delete one instance, at most once per run.
    fn soft_delete_nested(
        &self,
        ctx: &mut dyn PersistenceContext,
        run: &mut CascadeRun,
        entity_type: &EntityType,
        entity: &EntityRef,
        depth: usize,
    ) -> Result<()> {
        let field_index = entity_type.deleted_at_field()?;
        let field_name = entity_type
            .field_at(field_index)
            .map(|f| f.name.clone())
            .ok_or_else(|| {
                CascadeError::accessor(
                    entity,
                    field_index.to_string(),
                    "deleted-at field not in layout",
                )
            })?;

        if run.visited.contains(entity) {
            tracing::debug!(entity = %entity, "already being soft-deleted");
            return Ok(());
        }

        ctx.ensure_loaded(entity)?;
        let old = ctx.read_field(entity, field_index)?;
        if old.is_timestamp() {
            tracing::debug!(entity = %entity, "already soft-deleted");
            return Ok(());
        }
        run.visited.insert(entity.clone());

        ctx.on_soft_delete(SoftDeletePhase::Pre, entity)?;
        self.cascade(ctx, run, entity, depth)?;

        run.notifier.apply(
            ctx,
            Mutation {
                entity: entity.clone(),
                field: field_name,
                field_index,
                old,
                new: Value::Timestamp((self.clock)()),
                kind: MutationKind::SoftDelete,
            },
        )?;

        ctx.on_soft_delete(SoftDeletePhase::Post, entity)?;
        run.soft_deleted.push(entity.clone());
        Ok(())
    }
}
