//! In-memory persistence for the cascade.
//!
//! [`MemoryStore`] holds committed rows. Cascades run against a
//! [`MemoryTransaction`], which buffers every change until commit.

mod fixture;
mod memory;
mod transaction;

pub use fixture::{Fixture, FixtureEntity};
pub use memory::MemoryStore;
pub use transaction::MemoryTransaction;
