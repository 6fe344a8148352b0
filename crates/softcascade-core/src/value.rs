//! Runtime field values and entity identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identity of an entity instance: runtime type plus id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Runtime entity type name.
    pub entity_type: String,
    /// Identifier, unique within the type.
    pub id: u64,
}

impl EntityRef {
    /// Create a new entity reference.
    pub fn new(entity_type: impl Into<String>, id: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = Error;

    /// Parse the `Type#id` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entity_type, id) = s
            .rsplit_once('#')
            .ok_or_else(|| Error::Model(format!("expected Type#id, got '{}'", s)))?;
        if entity_type.is_empty() {
            return Err(Error::Model(format!("missing entity type in '{}'", s)));
        }
        let id = id
            .parse()
            .map_err(|_| Error::Model(format!("invalid entity id in '{}'", s)))?;
        Ok(Self::new(entity_type, id))
    }
}

/// A field value held by an entity instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Null value (also an unset single reference).
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// Reference to a single entity.
    Ref(EntityRef),
    /// Collection of entity references.
    RefSet(Vec<EntityRef>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value holds a timestamp.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, Value::Timestamp(_))
    }

    /// Try to get as a single entity reference.
    pub fn as_ref_entity(&self) -> Option<&EntityRef> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Try to get as a reference collection.
    pub fn as_ref_set(&self) -> Option<&[EntityRef]> {
        match self {
            Value::RefSet(refs) => Some(refs),
            _ => None,
        }
    }
}

impl From<EntityRef> for Value {
    fn from(entity: EntityRef) -> Self {
        Value::Ref(entity)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float64(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Timestamp(ts) => match chrono::DateTime::from_timestamp_micros(*ts) {
                Some(dt) => write!(f, "{}", dt.to_rfc3339()),
                None => write!(f, "@{}", ts),
            },
            Value::Ref(r) => write!(f, "{}", r),
            Value::RefSet(refs) => {
                write!(f, "[")?;
                for (i, r) in refs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", r)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_display_and_parse() {
        let tag = EntityRef::new("blog::Tag", 7);
        assert_eq!(tag.to_string(), "blog::Tag#7");
        assert_eq!("blog::Tag#7".parse::<EntityRef>().unwrap(), tag);
        assert!("blog::Tag".parse::<EntityRef>().is_err());
        assert!("#7".parse::<EntityRef>().is_err());
        assert!("Tag#seven".parse::<EntityRef>().is_err());
    }

    #[test]
    fn test_display_ref_set() {
        let value = Value::RefSet(vec![EntityRef::new("Post", 1), EntityRef::new("Post", 2)]);
        assert_eq!(value.to_string(), "[Post#1, Post#2]");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
