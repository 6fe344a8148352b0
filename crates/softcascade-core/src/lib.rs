//! Softcascade Core - relationship catalog and soft-delete cascade resolution.
//!
//! When an entity is soft-deleted, every association pointing at it is
//! resolved according to the policy declared on the association: the
//! reference is nulled, replaced by the deleted entity's successor, or the
//! referencing entity is soft-deleted in turn.

pub mod cascade;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod mutation;
pub mod policy;
pub mod storage;
pub mod value;

pub use cascade::{
    CascadeExecutor, CascadeResult, ChangeNotifier, ManyToManyUnlinker, PlannedAssociation,
    SuccessorLocator,
};
pub use catalog::{
    AssociationDef, AssociationKind, AssociationTarget, Catalog, EntityDef, EntityType, Field,
    FieldDef, FieldIndex, ModelBundle,
};
pub use config::CascadeConfig;
pub use context::{PersistenceContext, SoftDeletePhase};
pub use error::{CascadeError, Error, Result};
pub use mutation::{ChangeSet, Mutation, MutationKind};
pub use policy::Policy;
pub use storage::{Fixture, FixtureEntity, MemoryStore, MemoryTransaction};
pub use value::{EntityRef, Value};
