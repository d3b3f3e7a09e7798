//! Entity wire shapes for the backing store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An entity to be created in the backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Opaque payload bytes. The adapter stores canonical row JSON here.
    pub payload: Vec<u8>,
    /// Block time-to-live. The store garbage-collects the entity once this
    /// many blocks have elapsed.
    pub btl: u64,
    /// String-typed annotations, ranked by byte order in queries.
    pub string_annotations: BTreeMap<String, String>,
    /// Unsigned 64-bit annotations, ranked by numeric order in queries.
    pub numeric_annotations: BTreeMap<String, u64>,
}

impl Entity {
    /// Creates an entity with a payload and BTL and no annotations.
    pub fn new(payload: Vec<u8>, btl: u64) -> Self {
        Self {
            payload,
            btl,
            string_annotations: BTreeMap::new(),
            numeric_annotations: BTreeMap::new(),
        }
    }

    /// Adds a string annotation.
    pub fn with_string_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_annotations.insert(key.into(), value.into());
        self
    }

    /// Adds a numeric annotation.
    pub fn with_numeric_annotation(mut self, key: impl Into<String>, value: u64) -> Self {
        self.numeric_annotations.insert(key.into(), value);
        self
    }
}

/// An update to an existing entity, addressed by its key.
///
/// Updates replace the payload and annotation maps wholesale and restart the
/// BTL clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUpdate {
    /// Key of the entity to replace.
    pub entity_key: Vec<u8>,
    /// Replacement entity.
    pub entity: Entity,
}

/// Receipt returned for each entity in a write batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Key assigned to (or retained by) the entity.
    pub entity_key: Vec<u8>,
    /// Block at which the entity expires.
    pub expiration_block: u64,
}

/// A single match from a predicate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHit {
    /// Key of the matching entity.
    pub entity_key: Vec<u8>,
    /// The entity's payload bytes.
    pub storage_value: Vec<u8>,
}

/// Annotation and expiry metadata for a single entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMetadata {
    /// String annotations.
    pub string_annotations: BTreeMap<String, String>,
    /// Numeric annotations.
    pub numeric_annotations: BTreeMap<String, u64>,
    /// Block at which the entity expires.
    pub expiration_block: u64,
}
