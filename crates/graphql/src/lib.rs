//! GraphQL API for the Cenote federation server.
//!
//! Provides the shared input/output types of the federation surface and
//! an HTTP server that hosts a schema merged from per-model extensions.
//!
//! # Building a Schema with Extensions
//!
//! Use `build_schema` to compose CoreQuery with per-model types:
//!
//! ```ignore
//! use async_graphql::MergedObject;
//! use cenote_graphql::{build_schema, CoreQuery};
//! use cenote_models::individual::{IndividualMutation, IndividualQuery};
//!
//! #[derive(MergedObject, Default)]
//! struct Query(CoreQuery, IndividualQuery);
//!
//! #[derive(MergedObject, Default)]
//! struct Mutation(IndividualMutation);
//!
//! let schema = build_schema(Query::default(), Mutation::default(), catalog, ddm);
//! ```

mod schema;
mod server;
mod types;

pub use schema::{
    build_schema, schema_builder, CoreQuery, FederationStatus, ModelStatus, MAX_QUERY_COMPLEXITY,
    MAX_QUERY_DEPTH,
};
pub use server::{serve, serve_with_shutdown, ServerConfig};
pub use types::{
    into_order, AdapterFailure, Order, OrderInput, PageInfoType, PaginationInput, SearchInput,
    SearchOperator,
};
