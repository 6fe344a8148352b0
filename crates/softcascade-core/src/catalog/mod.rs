//! Relationship catalog.
//!
//! Definitions (`ModelBundle` and friends) are plain data loaded from code or
//! JSON. The compiled [`Catalog`] resolves field layouts, supertypes and
//! association targets once and is read-only afterwards.

mod association;
mod bundle;
#[allow(clippy::module_inception)]
mod catalog;
mod entity;
mod field;

pub use association::{AssociationDef, AssociationKind};
pub use bundle::ModelBundle;
pub use catalog::{
    Association, AssociationTarget, Catalog, EntityType, Field, FieldIndex, SoftDelete,
};
pub use entity::{namespace_of, EntityDef, SoftDeleteDef, NAMESPACE_SEPARATOR};
pub use field::FieldDef;
