//! GraphQL schema definition.
//!
//! This module provides the core query root (federation status) and the
//! schema builders that merge per-model query/mutation extensions.

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Object, Result, Schema, SchemaBuilder};

use cenote_core::catalog::Catalog;
use cenote_core::services::DdmService;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Create a schema builder carrying the catalog and aggregator.
///
/// Use this to build a schema with merged per-model query and mutation
/// types. Remember to call `.limit_depth()` and `.limit_complexity()`
/// before `.finish()`.
///
/// # Example
///
/// ```ignore
/// use async_graphql::MergedObject;
/// use cenote_graphql::{schema_builder, CoreQuery, MAX_QUERY_DEPTH, MAX_QUERY_COMPLEXITY};
/// use cenote_models::individual::{IndividualMutation, IndividualQuery};
///
/// #[derive(MergedObject, Default)]
/// struct Query(CoreQuery, IndividualQuery);
///
/// #[derive(MergedObject, Default)]
/// struct Mutation(IndividualMutation);
///
/// let schema = schema_builder(Query::default(), Mutation::default(), catalog, ddm)
///     .limit_depth(MAX_QUERY_DEPTH)
///     .limit_complexity(MAX_QUERY_COMPLEXITY)
///     .finish();
/// ```
pub fn schema_builder<Q, M>(
    query: Q,
    mutation: M,
    catalog: Arc<Catalog>,
    ddm: Arc<DdmService>,
) -> SchemaBuilder<Q, M, EmptySubscription>
where
    Q: async_graphql::ObjectType + 'static,
    M: async_graphql::ObjectType + 'static,
{
    Schema::build(query, mutation, EmptySubscription)
        .data(catalog)
        .data(ddm)
}

/// Build a schema with merged query and mutation types and the default
/// depth/complexity limits.
pub fn build_schema<Q, M>(
    query: Q,
    mutation: M,
    catalog: Arc<Catalog>,
    ddm: Arc<DdmService>,
) -> Schema<Q, M, EmptySubscription>
where
    Q: async_graphql::ObjectType + 'static,
    M: async_graphql::ObjectType + 'static,
{
    schema_builder(query, mutation, catalog, ddm)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Core Query
// -----------------------------------------------------------------------------

/// Core query root exposing the federation layout.
///
/// Per-model queries are merged in using `#[derive(MergedObject)]`.
#[derive(Default)]
pub struct CoreQuery;

#[Object]
impl CoreQuery {
    /// Registered logical models and their adapter registries.
    async fn status<'ctx>(&self, ctx: &Context<'ctx>) -> Result<FederationStatus> {
        let catalog = ctx.data::<Arc<Catalog>>()?;

        let mut models: Vec<ModelStatus> = catalog
            .model_names()
            .into_iter()
            .filter_map(|name| catalog.model(name).ok())
            .map(|model| ModelStatus {
                name: model.definition().name.clone(),
                adapters: model.adapter_names(),
            })
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(FederationStatus { models })
    }
}

/// Federation layout.
#[derive(async_graphql::SimpleObject)]
pub struct FederationStatus {
    pub models: Vec<ModelStatus>,
}

/// One logical model and its adapter registry.
#[derive(async_graphql::SimpleObject)]
pub struct ModelStatus {
    pub name: String,
    pub adapters: Vec<String>,
}
