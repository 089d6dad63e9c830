//! Logical model catalog.
//!
//! The catalog maps each logical model to its ordered registry of
//! storage adapters and resolves which adapter owns a given opaque
//! record identifier. It is an explicit object built once at startup
//! and passed by reference into the aggregator and resolvers; after
//! construction it is read-only, so the federation path needs no
//! locking.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::RegistryError;
use crate::models::ModelDefinition;
use crate::ports::Adapter;

/// A logical model together with its adapter registry.
pub struct LogicalModel {
    definition: ModelDefinition,
    adapters: Vec<Arc<dyn Adapter>>,
}

impl LogicalModel {
    pub fn new(definition: ModelDefinition) -> Self {
        Self {
            definition,
            adapters: Vec::new(),
        }
    }

    /// Register an adapter for this model. Registration order is the
    /// registry order and is preserved.
    pub fn register(mut self, adapter: Arc<dyn Adapter>) -> Self {
        info!(
            model = %self.definition.name,
            adapter = adapter.adapter_name(),
            "📦 Registering adapter"
        );
        self.adapters.push(adapter);
        self
    }

    /// Shape of this model.
    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    /// All registered adapters, in registry order.
    pub fn registered_adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    /// Names of all registered adapters, in registry order.
    pub fn adapter_names(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.adapter_name().to_string())
            .collect()
    }

    /// Resolve the adapter responsible for an id.
    ///
    /// This is a pure predicate scan over `recognize_id`; the partition
    /// invariant requires exactly one claimant.
    pub fn adapter_for_id(&self, id: &str) -> Result<&Arc<dyn Adapter>, RegistryError> {
        let mut claimants = self.adapters.iter().filter(|a| a.recognize_id(id));

        let first = claimants
            .next()
            .ok_or_else(|| RegistryError::UnresolvedId(id.to_string()))?;
        if claimants.next().is_some() {
            return Err(RegistryError::AmbiguousId(id.to_string()));
        }
        Ok(first)
    }
}

/// Registry of all logical models served by this process.
#[derive(Default)]
pub struct Catalog {
    models: HashMap<String, LogicalModel>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a logical model under its definition name.
    pub fn register_model(&mut self, model: LogicalModel) {
        info!(
            model = %model.definition().name,
            adapters = model.registered_adapters().len(),
            "🗂️  Registering logical model"
        );
        self.models
            .insert(model.definition().name.clone(), model);
    }

    /// Look up a logical model by name.
    pub fn model(&self, name: &str) -> Result<&LogicalModel, RegistryError> {
        self.models
            .get(name)
            .ok_or_else(|| RegistryError::UnknownModel(name.to_string()))
    }

    /// Names of all registered models.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
