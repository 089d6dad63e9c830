//! Per-model GraphQL extensions.
//!
//! Each model module bundles its [`cenote_core::models::ModelDefinition`]
//! with the query and mutation types that expose it. The binary merges
//! these into the schema with `#[derive(MergedObject)]`.

pub mod individual;
