//! Model bundle - the full set of entity type definitions.

use std::path::Path;

use super::EntityDef;
use crate::error::Error;
use rkyv::Archive;

/// A versioned snapshot of every entity type in the domain model.
///
/// Entity order is declaration order and drives cascade order.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ModelBundle {
    /// Model version.
    #[serde(default)]
    pub version: u64,
    /// Entity type definitions in declaration order.
    pub entities: Vec<EntityDef>,
}

impl ModelBundle {
    /// Create an empty bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entities: Vec::new(),
        }
    }

    /// Add an entity type.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Serialize the bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Parse a bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the bundle as pretty JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a bundle from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl Default for ModelBundle {
    fn default() -> Self {
        Self::new(0)
    }
}
