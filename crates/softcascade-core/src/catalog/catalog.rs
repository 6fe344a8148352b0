//! Compiled catalog: the immutable registry of entity types and associations.

use std::collections::HashMap;
use std::fmt;

use super::entity::{namespace_of, NAMESPACE_SEPARATOR};
use super::{AssociationKind, EntityDef, ModelBundle};
use crate::error::{CascadeError, Error};
use crate::policy::{self, Policy};

/// Position of a field in an entity type's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(pub usize);

impl fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered entity type with its resolved field layout.
#[derive(Debug, Clone)]
pub struct EntityType {
    /// Fully qualified name.
    pub name: String,
    /// Position in declaration order.
    pub index: usize,
    /// Supertype position, if any.
    pub parent: Option<usize>,
    /// Abstract types have no instances of their own.
    pub is_abstract: bool,
    /// Inherited fields first, then own fields.
    pub fields: Vec<Field>,
    /// Soft-delete configuration, own or inherited.
    pub soft_delete: Option<SoftDelete>,
}

/// A field in an entity type's layout.
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Position in the layout.
    pub index: FieldIndex,
    /// Association carried by the field.
    pub association: Option<Association>,
    /// Successor marker.
    pub successor: bool,
}

/// An association with its target resolved against the catalog.
#[derive(Debug, Clone)]
pub struct Association {
    /// Association kind.
    pub kind: AssociationKind,
    /// Target name as declared.
    pub declared_target: String,
    /// Resolved target type, `None` when the name matched nothing.
    pub target: Option<usize>,
    /// Declared policy token.
    pub on_soft_delete: Option<String>,
}

/// Resolved soft-delete configuration.
#[derive(Debug, Clone)]
pub struct SoftDelete {
    /// Declared deleted-at field name.
    pub field_name: String,
    /// Deleted-at field, `None` when the name is empty or unknown.
    pub field: Option<FieldIndex>,
}

/// An association that points at a given type.
#[derive(Debug, Clone, Copy)]
pub struct AssociationTarget<'c> {
    /// Type declaring the association.
    pub owner: &'c EntityType,
    /// Field holding the association.
    pub field: &'c Field,
    /// The association.
    pub association: &'c Association,
}

impl AssociationTarget<'_> {
    /// Resolve the declared policy token.
    pub fn policy(&self) -> Result<Option<Policy>, CascadeError> {
        self.association
            .on_soft_delete
            .as_deref()
            .map(Policy::resolve)
            .transpose()
    }
}

impl EntityType {
    /// Namespace part of the type name.
    pub fn namespace(&self) -> &str {
        namespace_of(&self.name)
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a field by layout position.
    pub fn field_at(&self, index: FieldIndex) -> Option<&Field> {
        self.fields.get(index.0)
    }

    /// Check if instances of this type can be soft-deleted.
    pub fn has_soft_delete(&self) -> bool {
        self.soft_delete.is_some()
    }

    /// The deleted-at field, failing if the soft-delete configuration is
    /// missing or names no field of this type.
    pub fn deleted_at_field(&self) -> Result<FieldIndex, CascadeError> {
        self.soft_delete
            .as_ref()
            .and_then(|sd| sd.field)
            .ok_or_else(|| CascadeError::MissingCascadeField {
                entity_type: self.name.clone(),
            })
    }

    /// The single field carrying the successor marker.
    pub fn successor_field(&self) -> Result<&Field, CascadeError> {
        let marked: Vec<&Field> = self.fields.iter().filter(|f| f.successor).collect();
        match marked.as_slice() {
            [field] => Ok(*field),
            [] => Err(CascadeError::NoSuccessor {
                entity_type: self.name.clone(),
            }),
            _ => Err(CascadeError::MultipleSuccessor {
                entity_type: self.name.clone(),
                fields: marked.iter().map(|f| f.name.clone()).collect(),
            }),
        }
    }
}

/// The catalog of entity types, built once from a [`ModelBundle`].
#[derive(Debug, Clone)]
pub struct Catalog {
    version: u64,
    types: Vec<EntityType>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Build the catalog from a model bundle.
    ///
    /// Supertypes must be declared before their subtypes. Association targets
    /// are resolved here; unresolved targets are logged and later skipped.
    pub fn build(bundle: &ModelBundle) -> Result<Self, Error> {
        let mut by_name = HashMap::with_capacity(bundle.entities.len());
        for (index, def) in bundle.entities.iter().enumerate() {
            if def.name.is_empty() {
                return Err(Error::Model(format!("entity #{} has an empty name", index)));
            }
            if by_name.insert(def.name.clone(), index).is_some() {
                return Err(Error::Model(format!("duplicate entity type {}", def.name)));
            }
        }

        let mut catalog = Self {
            version: bundle.version,
            types: Vec::with_capacity(bundle.entities.len()),
            by_name,
        };

        for (index, def) in bundle.entities.iter().enumerate() {
            let entity_type = catalog.compile(index, def)?;
            catalog.types.push(entity_type);
        }

        tracing::debug!(
            version = catalog.version,
            entity_types = catalog.types.len(),
            "catalog built"
        );

        Ok(catalog)
    }

    fn compile(&self, index: usize, def: &EntityDef) -> Result<EntityType, Error> {
        let parent = match &def.parent {
            Some(name) => match self.by_name.get(name) {
                Some(&p) if p < index => Some(p),
                Some(_) => {
                    return Err(Error::Model(format!(
                        "supertype {} of {} must be declared first",
                        name, def.name
                    )))
                }
                None => {
                    return Err(Error::Model(format!(
                        "unknown supertype {} of {}",
                        name, def.name
                    )))
                }
            },
            None => None,
        };

        let mut fields = parent
            .map(|p| self.types[p].fields.clone())
            .unwrap_or_default();

        for field_def in &def.fields {
            if fields.iter().any(|f| f.name == field_def.name) {
                return Err(Error::Model(format!(
                    "duplicate field {}.{}",
                    def.name, field_def.name
                )));
            }

            let association = field_def.association.as_ref().map(|assoc| {
                let target = self.resolve_target_index(def.namespace(), &assoc.target);
                if target.is_none() {
                    tracing::warn!(
                        owner = %def.name,
                        field = %field_def.name,
                        target = %assoc.target,
                        "association target does not resolve to a known entity type; skipping"
                    );
                }
                Association {
                    kind: assoc.kind,
                    declared_target: assoc.target.clone(),
                    target,
                    on_soft_delete: assoc.on_soft_delete.clone(),
                }
            });

            fields.push(Field {
                name: field_def.name.clone(),
                index: FieldIndex(fields.len()),
                association,
                successor: field_def.successor,
            });
        }

        let soft_delete = match &def.soft_delete {
            Some(sd) => Some(SoftDelete {
                field_name: sd.field_name.clone(),
                field: fields
                    .iter()
                    .find(|f| !sd.field_name.is_empty() && f.name == sd.field_name)
                    .map(|f| f.index),
            }),
            None => parent.and_then(|p| self.types[p].soft_delete.clone()),
        };

        Ok(EntityType {
            name: def.name.clone(),
            index,
            parent,
            is_abstract: def.is_abstract,
            fields,
            soft_delete,
        })
    }

    /// Resolution order: literal name, root-qualified name, then the name
    /// relative to the owner's namespace.
    fn resolve_target_index(&self, owner_namespace: &str, name: &str) -> Option<usize> {
        if let Some(&index) = self.by_name.get(name) {
            return Some(index);
        }
        if let Some(from_root) = name.strip_prefix(NAMESPACE_SEPARATOR) {
            if let Some(&index) = self.by_name.get(from_root) {
                return Some(index);
            }
        }
        if owner_namespace.is_empty() {
            return None;
        }
        let relative = format!("{}{}{}", owner_namespace, NAMESPACE_SEPARATOR, name);
        self.by_name.get(&relative).copied()
    }

    /// Resolve a declared target name as seen from `owner`.
    pub fn resolve_target(&self, owner: &EntityType, name: &str) -> Option<&EntityType> {
        self.resolve_target_index(owner.namespace(), name)
            .map(|index| &self.types[index])
    }

    /// Model version the catalog was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All entity types in declaration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.types.iter()
    }

    /// Get an entity type by name.
    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.by_name.get(name).map(|&index| &self.types[index])
    }

    /// Get an entity type by declaration position.
    pub fn entity_type_at(&self, index: usize) -> Option<&EntityType> {
        self.types.get(index)
    }

    /// Get an entity type by name, failing if it is not registered.
    pub fn require(&self, name: &str) -> Result<&EntityType, Error> {
        self.get(name)
            .ok_or_else(|| Error::UnknownEntityType(name.to_string()))
    }

    /// Check whether `sub` is `sup` or one of its subtypes.
    pub fn is_assignable(&self, sub: &EntityType, sup: &EntityType) -> bool {
        let mut current = Some(sub.index);
        while let Some(index) = current {
            if index == sup.index {
                return true;
            }
            current = self.types[index].parent;
        }
        false
    }

    /// Every association with a soft-delete policy whose target is `target`
    /// or one of its supertypes.
    ///
    /// Abstract owners, one-to-many associations, associations without a
    /// policy and unresolved targets are skipped.
    pub fn associations_targeting(&self, target: &EntityType) -> Vec<AssociationTarget<'_>> {
        self.collect_associations(|_, declared| self.is_assignable(target, declared))
    }

    /// Associations a soft delete of an instance of `entity_type` must
    /// visit: everything [`associations_targeting`](Self::associations_targeting)
    /// yields, plus the many-to-many associations `entity_type` itself owns
    /// (the mapped side), in declaration order.
    pub fn cascade_candidates(&self, entity_type: &EntityType) -> Vec<AssociationTarget<'_>> {
        self.collect_associations(|candidate, declared| {
            self.is_assignable(entity_type, declared)
                || (candidate.association.kind == AssociationKind::ManyToMany
                    && candidate.owner.index == entity_type.index)
        })
    }

    fn collect_associations<'c>(
        &'c self,
        include: impl Fn(&AssociationTarget<'c>, &'c EntityType) -> bool,
    ) -> Vec<AssociationTarget<'c>> {
        let mut found = Vec::new();
        for owner in self.types.iter().filter(|t| !t.is_abstract) {
            for field in &owner.fields {
                let Some(association) = &field.association else {
                    continue;
                };
                if !association.kind.is_supported() || association.on_soft_delete.is_none() {
                    continue;
                }
                let Some(declared) = association.target else {
                    continue;
                };
                let candidate = AssociationTarget {
                    owner,
                    field,
                    association,
                };
                if include(&candidate, &self.types[declared]) {
                    found.push(candidate);
                }
            }
        }
        found
    }

    /// Check every soft-delete declaration ahead of time.
    ///
    /// Runs the same checks a cascade would run lazily: policy tokens,
    /// applicability, successor markers of successor targets, and the
    /// deleted-at field of soft-deleteable cascade owners.
    pub fn validate(&self) -> Result<(), Error> {
        for owner in &self.types {
            for field in &owner.fields {
                let Some(association) = &field.association else {
                    continue;
                };
                if !association.kind.is_supported() {
                    continue;
                }
                let Some(token) = association.on_soft_delete.as_deref() else {
                    continue;
                };
                let policy = Policy::resolve(token)?;
                let Some(target) = association.target else {
                    continue;
                };
                policy::validate(policy, association.kind, &owner.name, &field.name)?;

                match policy {
                    Policy::Successor if association.kind != AssociationKind::ManyToMany => {
                        let target = &self.types[target];
                        for candidate in self.types.iter().filter(|t| !t.is_abstract) {
                            if self.is_assignable(candidate, target) {
                                candidate.successor_field()?;
                            }
                        }
                    }
                    Policy::Cascade if owner.has_soft_delete() => {
                        owner.deleted_at_field()?;
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssociationDef, FieldDef};

    fn blog_model() -> ModelBundle {
        let node = EntityDef::new("blog::Node")
            .abstract_type()
            .with_field(FieldDef::new("deleted_at"))
            .with_soft_delete("deleted_at");
        let owner = EntityDef::new("blog::Owner")
            .with_parent("blog::Node")
            .with_field(FieldDef::new("name"));
        let admin = EntityDef::new("blog::Admin").with_parent("blog::Owner");
        let tag = EntityDef::new("blog::Tag")
            .with_field(FieldDef::new("label"))
            .with_field(FieldDef::association(
                "owner",
                AssociationDef::many_to_one("Owner").with_on_soft_delete("SET_NULL"),
            ))
            .with_field(FieldDef::association(
                "children",
                AssociationDef::one_to_many("Tag").with_on_soft_delete("CASCADE"),
            ))
            .with_field(FieldDef::association(
                "remote",
                AssociationDef::many_to_one("elsewhere::Remote").with_on_soft_delete("CASCADE"),
            ))
            .with_field(FieldDef::association("creator", AssociationDef::many_to_one("Owner")));

        ModelBundle::new(3)
            .with_entity(node)
            .with_entity(owner)
            .with_entity(admin)
            .with_entity(tag)
    }

    #[test]
    fn test_inherited_layout() {
        let catalog = Catalog::build(&blog_model()).unwrap();
        let admin = catalog.get("blog::Admin").unwrap();

        let names: Vec<&str> = admin.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["deleted_at", "name"]);
        assert_eq!(admin.field("name").unwrap().index, FieldIndex(1));
        assert_eq!(admin.deleted_at_field().unwrap(), FieldIndex(0));
        assert_eq!(catalog.version(), 3);
    }

    #[test]
    fn test_assignability() {
        let catalog = Catalog::build(&blog_model()).unwrap();
        let node = catalog.get("blog::Node").unwrap();
        let owner = catalog.get("blog::Owner").unwrap();
        let admin = catalog.get("blog::Admin").unwrap();

        assert!(catalog.is_assignable(admin, owner));
        assert!(catalog.is_assignable(admin, node));
        assert!(catalog.is_assignable(owner, owner));
        assert!(!catalog.is_assignable(owner, admin));
    }

    #[test]
    fn test_target_resolution_order() {
        let model = ModelBundle::new(1)
            .with_entity(EntityDef::new("Owner"))
            .with_entity(EntityDef::new("blog::Owner"))
            .with_entity(EntityDef::new("blog::Tag"));
        let catalog = Catalog::build(&model).unwrap();
        let tag = catalog.get("blog::Tag").unwrap();

        // literal wins over namespace-relative
        assert_eq!(catalog.resolve_target(tag, "Owner").unwrap().name, "Owner");
        assert_eq!(catalog.resolve_target(tag, "::blog::Owner").unwrap().name, "blog::Owner");
        assert_eq!(catalog.resolve_target(tag, "Tag").unwrap().name, "blog::Tag");
        assert!(catalog.resolve_target(tag, "Remote").is_none());
    }

    #[test]
    fn test_associations_targeting_skips() {
        let catalog = Catalog::build(&blog_model()).unwrap();
        let owner = catalog.get("blog::Owner").unwrap();

        let found = catalog.associations_targeting(owner);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner.name, "blog::Tag");
        assert_eq!(found[0].field.name, "owner");
        assert_eq!(found[0].policy().unwrap(), Some(Policy::SetNull));

        // subtype instances are reached through the supertype's associations
        let admin = catalog.get("blog::Admin").unwrap();
        assert_eq!(catalog.associations_targeting(admin).len(), 1);

        // one-to-many is never yielded
        let tag = catalog.get("blog::Tag").unwrap();
        assert!(catalog.associations_targeting(tag).is_empty());
    }

    #[test]
    fn test_cascade_candidates_include_mapped_side() {
        let model = ModelBundle::new(1)
            .with_entity(EntityDef::new("Category").with_field(FieldDef::association(
                "posts",
                AssociationDef::many_to_many("Post").with_on_soft_delete("CASCADE"),
            )))
            .with_entity(EntityDef::new("Post").with_field(FieldDef::association(
                "categories",
                AssociationDef::many_to_many("Category").with_on_soft_delete("CASCADE"),
            )));
        let catalog = Catalog::build(&model).unwrap();
        let post = catalog.get("Post").unwrap();

        let targeting: Vec<&str> = catalog
            .associations_targeting(post)
            .iter()
            .map(|t| t.field.name.as_str())
            .collect();
        assert_eq!(targeting, vec!["posts"]);

        let candidates: Vec<(&str, &str)> = catalog
            .cascade_candidates(post)
            .iter()
            .map(|t| (t.owner.name.as_str(), t.field.name.as_str()))
            .collect();
        assert_eq!(candidates, vec![("Category", "posts"), ("Post", "categories")]);
    }

    #[test]
    fn test_unresolved_target_is_not_an_error() {
        let catalog = Catalog::build(&blog_model()).unwrap();
        let remote = catalog
            .get("blog::Tag")
            .unwrap()
            .field("remote")
            .unwrap()
            .association
            .as_ref()
            .unwrap();
        assert!(remote.target.is_none());
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_build_rejects_bad_models() {
        let duplicate = ModelBundle::new(1)
            .with_entity(EntityDef::new("Tag"))
            .with_entity(EntityDef::new("Tag"));
        assert!(matches!(Catalog::build(&duplicate), Err(Error::Model(_))));

        let forward_parent = ModelBundle::new(1)
            .with_entity(EntityDef::new("Child").with_parent("Parent"))
            .with_entity(EntityDef::new("Parent"));
        assert!(matches!(Catalog::build(&forward_parent), Err(Error::Model(_))));

        let duplicate_field = ModelBundle::new(1).with_entity(
            EntityDef::new("Tag")
                .with_field(FieldDef::new("label"))
                .with_field(FieldDef::new("label")),
        );
        assert!(matches!(Catalog::build(&duplicate_field), Err(Error::Model(_))));
    }

    #[test]
    fn test_successor_field_count() {
        let model = ModelBundle::new(1)
            .with_entity(EntityDef::new("None").with_field(FieldDef::new("a")))
            .with_entity(
                EntityDef::new("One")
                    .with_field(FieldDef::new("a"))
                    .with_field(FieldDef::new("b").successor()),
            )
            .with_entity(
                EntityDef::new("Two")
                    .with_field(FieldDef::new("a").successor())
                    .with_field(FieldDef::new("b").successor()),
            );
        let catalog = Catalog::build(&model).unwrap();

        assert!(matches!(
            catalog.get("None").unwrap().successor_field(),
            Err(CascadeError::NoSuccessor { .. })
        ));
        assert_eq!(catalog.get("One").unwrap().successor_field().unwrap().name, "b");
        match catalog.get("Two").unwrap().successor_field() {
            Err(CascadeError::MultipleSuccessor { fields, .. }) => {
                assert_eq!(fields, vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("expected MultipleSuccessor, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_reports_configuration_errors() {
        let set_null_m2m = ModelBundle::new(1)
            .with_entity(EntityDef::new("Post"))
            .with_entity(EntityDef::new("Category").with_field(FieldDef::association(
                "posts",
                AssociationDef::many_to_many("Post").with_on_soft_delete("SET_NULL"),
            )));
        let err = Catalog::build(&set_null_m2m).unwrap().validate().unwrap_err();
        assert!(matches!(err, Error::Cascade(CascadeError::Applicability { .. })));

        let unknown = ModelBundle::new(1)
            .with_entity(EntityDef::new("Owner"))
            .with_entity(EntityDef::new("Tag").with_field(FieldDef::association(
                "owner",
                AssociationDef::many_to_one("Owner").with_on_soft_delete("RESTRICT"),
            )));
        let err = Catalog::build(&unknown).unwrap().validate().unwrap_err();
        assert!(matches!(err, Error::Cascade(CascadeError::UnknownPolicy { .. })));

        let no_successor = ModelBundle::new(1)
            .with_entity(EntityDef::new("Revision"))
            .with_entity(EntityDef::new("Document").with_field(FieldDef::association(
                "current",
                AssociationDef::many_to_one("Revision").with_on_soft_delete("SUCCESSOR"),
            )));
        let err = Catalog::build(&no_successor).unwrap().validate().unwrap_err();
        assert!(matches!(err, Error::Cascade(CascadeError::NoSuccessor { .. })));

        let bad_deleted_at = ModelBundle::new(1)
            .with_entity(EntityDef::new("Owner"))
            .with_entity(
                EntityDef::new("Tag")
                    .with_field(FieldDef::association(
                        "owner",
                        AssociationDef::many_to_one("Owner").with_on_soft_delete("CASCADE"),
                    ))
                    .with_soft_delete("removed_on"),
            );
        let err = Catalog::build(&bad_deleted_at).unwrap().validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Cascade(CascadeError::MissingCascadeField { .. })
        ));
    }
}
