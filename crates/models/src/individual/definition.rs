//! Shape of the `individual` model.

use cenote_core::models::{AttributeDef, ModelDefinition, ScalarType};

/// The `individual` model definition, shared by every adapter in its
/// registry.
///
/// `name` is both the distributed id and the label attribute, so merged
/// reads default to ordering by it.
pub fn definition() -> ModelDefinition {
    ModelDefinition {
        name: "individual".to_string(),
        name_plural: "individuals".to_string(),
        attributes: vec![
            AttributeDef::new("name", ScalarType::String),
            AttributeDef::new("origin", ScalarType::String),
            AttributeDef::new("description", ScalarType::String),
            AttributeDef::new("accession_id", ScalarType::String),
            AttributeDef::new("genotype_id", ScalarType::Int),
            AttributeDef::new("field_unit_id", ScalarType::String),
        ],
        id_attribute: "name".to_string(),
        label_attribute: "name".to_string(),
    }
}
