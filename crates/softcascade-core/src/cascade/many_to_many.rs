//! Many-to-many unlinking.
//!
//! Deleting one side of a many-to-many association only removes the links;
//! counterpart entities are never nulled, substituted or deleted.

use super::notify::ChangeNotifier;
use crate::catalog::{AssociationTarget, Catalog, Field};
use crate::context::PersistenceContext;
use crate::error::{CascadeError, Result};
use crate::mutation::{Mutation, MutationKind};
use crate::value::{EntityRef, Value};

/// Strips a deleted entity out of many-to-many collections.
pub struct ManyToManyUnlinker<'c> {
    catalog: &'c Catalog,
}

impl<'c> ManyToManyUnlinker<'c> {
    /// Create an unlinker over `catalog`.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// Remove every link between `entity` and the association `target`.
    ///
    /// On the mapped side (`entity` is an instance of the owner) the entity's
    /// own collection is cleared. On the inverse side (`entity` is assignable
    /// to the association target) `entity` is removed from each owner
    /// collection containing it. Self-referential associations get both.
    /// Returns the number of collections changed.
    pub fn unlink(
        &self,
        ctx: &mut dyn PersistenceContext,
        notifier: &mut ChangeNotifier,
        entity: &EntityRef,
        target: &AssociationTarget<'_>,
    ) -> Result<usize> {
        let entity_type = self.catalog.require(&entity.entity_type)?;
        let mapped_side = entity_type.index == target.owner.index;
        let inverse_side = target
            .association
            .target
            .and_then(|index| self.catalog.entity_type_at(index))
            .is_some_and(|declared| self.catalog.is_assignable(entity_type, declared));

        let mut changed = 0;

        if mapped_side {
            ctx.ensure_loaded(entity)?;
            let old = ctx.read_field(entity, target.field.index)?;
            let links = collection(entity, target.field, &old)?;
            if !links.is_empty() {
                notifier.apply(
                    ctx,
                    Mutation {
                        entity: entity.clone(),
                        field: target.field.name.clone(),
                        field_index: target.field.index,
                        old,
                        new: Value::RefSet(Vec::new()),
                        kind: MutationKind::Clear,
                    },
                )?;
                changed += 1;
            }
        }

        if inverse_side {
            let holders = ctx.find_containing(&target.owner.name, target.field.index, entity)?;
            for holder in holders {
                if mapped_side && holder == *entity {
                    continue;
                }
                ctx.ensure_loaded(&holder)?;
                let old = ctx.read_field(&holder, target.field.index)?;
                let remaining: Vec<EntityRef> = collection(&holder, target.field, &old)?
                    .iter()
                    .filter(|member| *member != entity)
                    .cloned()
                    .collect();
                notifier.apply(
                    ctx,
                    Mutation {
                        entity: holder,
                        field: target.field.name.clone(),
                        field_index: target.field.index,
                        old,
                        new: Value::RefSet(remaining),
                        kind: MutationKind::Unlink,
                    },
                )?;
                changed += 1;
            }
        }

        if !mapped_side && !inverse_side {
            tracing::debug!(
                entity = %entity,
                owner = %target.owner.name,
                field = %target.field.name,
                "entity on neither side of many-to-many association"
            );
        }

        Ok(changed)
    }
}

fn collection<'v>(entity: &EntityRef, field: &Field, value: &'v Value) -> Result<&'v [EntityRef]> {
    value.as_ref_set().ok_or_else(|| {
        CascadeError::accessor(entity, field.name.clone(), "expected a collection").into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssociationDef, EntityDef, FieldDef, ModelBundle};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn tagging_catalog() -> Arc<Catalog> {
        let model = ModelBundle::new(1)
            .with_entity(EntityDef::new("Category").with_field(FieldDef::association(
                "posts",
                AssociationDef::many_to_many("Post").with_on_soft_delete("CASCADE"),
            )))
            .with_entity(EntityDef::new("Post").with_field(FieldDef::new("title")))
            .with_entity(EntityDef::new("Node").with_field(FieldDef::association(
                "links",
                AssociationDef::many_to_many("Node").with_on_soft_delete("CASCADE"),
            )));
        Arc::new(Catalog::build(&model).unwrap())
    }

    fn target<'c>(catalog: &'c Catalog, owner: &str, field: &str) -> AssociationTarget<'c> {
        let owner = catalog.get(owner).unwrap();
        let field = owner.field(field).unwrap();
        AssociationTarget {
            owner,
            field,
            association: field.association.as_ref().unwrap(),
        }
    }

    fn refs(entity_type: &str, ids: &[u64]) -> Value {
        Value::RefSet(ids.iter().map(|&id| EntityRef::new(entity_type, id)).collect())
    }

    #[test]
    fn test_inverse_side_removes_single_link() {
        let catalog = tagging_catalog();
        let mut store = MemoryStore::new(catalog.clone());
        store.insert("Post", 3, []).unwrap();
        store.insert("Category", 1, [("posts", refs("Post", &[2, 3]))]).unwrap();
        store.insert("Category", 2, [("posts", refs("Post", &[4]))]).unwrap();

        let mut tx = store.transaction();
        let mut notifier = ChangeNotifier::new();
        let changed = ManyToManyUnlinker::new(&catalog)
            .unlink(
                &mut tx,
                &mut notifier,
                &EntityRef::new("Post", 3),
                &target(&catalog, "Category", "posts"),
            )
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(changed, 1);
        assert_eq!(notifier.journal()[0].kind, MutationKind::Unlink);
        assert_eq!(store.get(&EntityRef::new("Category", 1), "posts").unwrap(), refs("Post", &[2]));
        assert_eq!(store.get(&EntityRef::new("Category", 2), "posts").unwrap(), refs("Post", &[4]));
    }

    #[test]
    fn test_mapped_side_clears_collection() {
        let catalog = tagging_catalog();
        let mut store = MemoryStore::new(catalog.clone());
        store.insert("Category", 1, [("posts", refs("Post", &[2, 3]))]).unwrap();

        let mut tx = store.transaction();
        let mut notifier = ChangeNotifier::new();
        ManyToManyUnlinker::new(&catalog)
            .unlink(
                &mut tx,
                &mut notifier,
                &EntityRef::new("Category", 1),
                &target(&catalog, "Category", "posts"),
            )
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(notifier.journal()[0].kind, MutationKind::Clear);
        assert_eq!(store.get(&EntityRef::new("Category", 1), "posts").unwrap(), refs("Post", &[]));
        assert!(store.contains(&EntityRef::new("Category", 1)));
    }

    #[test]
    fn test_self_referential_unlinks_both_directions() {
        let catalog = tagging_catalog();
        let mut store = MemoryStore::new(catalog.clone());
        store.insert("Node", 1, [("links", refs("Node", &[2]))]).unwrap();
        store.insert("Node", 2, [("links", refs("Node", &[1, 3]))]).unwrap();
        store.insert("Node", 3, [("links", refs("Node", &[1]))]).unwrap();

        let mut tx = store.transaction();
        let mut notifier = ChangeNotifier::new();
        let changed = ManyToManyUnlinker::new(&catalog)
            .unlink(
                &mut tx,
                &mut notifier,
                &EntityRef::new("Node", 1),
                &target(&catalog, "Node", "links"),
            )
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(changed, 3);
        assert_eq!(store.get(&EntityRef::new("Node", 1), "links").unwrap(), refs("Node", &[]));
        assert_eq!(store.get(&EntityRef::new("Node", 2), "links").unwrap(), refs("Node", &[3]));
        assert_eq!(store.get(&EntityRef::new("Node", 3), "links").unwrap(), refs("Node", &[]));
    }

    #[test]
    fn test_neither_side_is_noop() {
        let catalog = tagging_catalog();
        let mut store = MemoryStore::new(catalog.clone());
        store.insert("Node", 1, []).unwrap();
        store.insert("Category", 1, [("posts", refs("Post", &[3]))]).unwrap();

        let mut tx = store.transaction();
        let mut notifier = ChangeNotifier::new();
        let changed = ManyToManyUnlinker::new(&catalog)
            .unlink(
                &mut tx,
                &mut notifier,
                &EntityRef::new("Node", 1),
                &target(&catalog, "Category", "posts"),
            )
            .unwrap();

        assert_eq!(changed, 0);
        assert!(notifier.journal().is_empty());
    }

    #[test]
    fn test_lazy_rows_are_loaded_before_unlinking() {
        let catalog = tagging_catalog();
        let mut store = MemoryStore::new(catalog.clone());
        store.insert("Post", 3, []).unwrap();
        let holder = store
            .insert_lazy("Category", 1, [("posts", refs("Post", &[2, 3]))])
            .unwrap();
        let owner = store
            .insert_lazy("Category", 2, [("posts", refs("Post", &[5]))])
            .unwrap();

        let mut tx = store.transaction();
        let mut notifier = ChangeNotifier::new();
        let unlinker = ManyToManyUnlinker::new(&catalog);
        let posts = target(&catalog, "Category", "posts");
        unlinker
            .unlink(&mut tx, &mut notifier, &EntityRef::new("Post", 3), &posts)
            .unwrap();
        unlinker.unlink(&mut tx, &mut notifier, &owner, &posts).unwrap();
        tx.commit().unwrap();

        assert_eq!(notifier.journal()[0].old, refs("Post", &[2, 3]));
        assert_eq!(notifier.journal()[1].old, refs("Post", &[5]));
        assert_eq!(store.get(&holder, "posts").unwrap(), refs("Post", &[2]));
        assert_eq!(store.get(&owner, "posts").unwrap(), refs("Post", &[]));
    }
}
