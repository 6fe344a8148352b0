//! JSON fixtures for populating a [`MemoryStore`](super::MemoryStore).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::Value;

/// A set of entity instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Instances in insertion order.
    #[serde(default)]
    pub entities: Vec<FixtureEntity>,
}

/// One entity instance of a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureEntity {
    /// Runtime entity type.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Identifier.
    pub id: u64,
    /// Load lazily: fields read as null until materialized.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lazy: bool,
    /// Field values by name. Missing fields are null or empty collections.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Fixture {
    /// Parse a fixture from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the fixture as pretty JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a fixture from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
