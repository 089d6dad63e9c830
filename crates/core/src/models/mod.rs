//! Domain models for federated records.
//!
//! These models are storage-agnostic: a [`Record`] is the canonical
//! in-memory form of one instance of a logical model, whichever adapter
//! it came from, and a [`ModelDefinition`] describes the shape every
//! adapter of that model agrees on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Scalar Types
// =============================================================================

/// Scalar type of a model attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Boolean,
    DateTime,
}

/// One named, typed attribute of a logical model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub scalar: ScalarType,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
        }
    }
}

// =============================================================================
// Model Definition
// =============================================================================

/// Shape of a logical model, shared by every adapter in its registry.
///
/// `attributes` lists the scalar attributes in declaration order;
/// association links are *not* attributes and are stripped whenever a
/// record is snapshotted into a cursor. `id_attribute` names the stable
/// identifier that is unique across the whole registry, and
/// `label_attribute` is the human-facing field used as the default
/// merge order when a caller supplies none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Singular lowercase name, e.g. `individual`.
    pub name: String,
    /// Plural lowercase name, e.g. `individuals`.
    pub name_plural: String,
    /// Ordered scalar attributes.
    pub attributes: Vec<AttributeDef>,
    /// Attribute that uniquely identifies an instance across all adapters.
    pub id_attribute: String,
    /// Default ordering field for merged reads.
    pub label_attribute: String,
}

impl ModelDefinition {
    /// Whether `name` is a declared scalar attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Scalar type of a declared attribute, if any.
    pub fn scalar_of(&self, name: &str) -> Option<ScalarType> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.scalar)
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Capitalized singular name, e.g. `Individual` (used for remote
    /// GraphQL operation names such as `addIndividual`).
    pub fn name_capitalized(&self) -> String {
        capitalize(&self.name)
    }

    /// Capitalized plural name, e.g. `Individuals`.
    pub fn name_plural_capitalized(&self) -> String {
        capitalize(&self.name_plural)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// =============================================================================
// Record
// =============================================================================

/// One instance of a logical model.
///
/// Values are stored as JSON values keyed by attribute name. The map is
/// ordered (BTreeMap) so that serialization - and therefore cursor
/// encoding - is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of an attribute; `None` if absent (absent and JSON null are
    /// treated alike by the ordering and search code).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Builder-style variant of [`Record::set`].
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Value of the model's id attribute, rendered as a string.
    pub fn id_value(&self, definition: &ModelDefinition) -> Option<String> {
        self.get(&definition.id_attribute).map(value_to_id_string)
    }

    /// Copy of this record retaining only the declared scalar
    /// attributes. Association-valued fields are dropped; this is the
    /// snapshot that gets encoded into a cursor.
    pub fn strip_associations(&self, definition: &ModelDefinition) -> Record {
        let values = self
            .values
            .iter()
            .filter(|(name, _)| definition.has_attribute(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Record { values }
    }

    /// Iterate over `(attribute, value)` pairs in attribute-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record {
            values: iter.into_iter().collect(),
        }
    }
}

/// Render an id value as the opaque identifier string used for routing.
fn value_to_id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
