//! Storage layer for the Cenote federation server.
//!
//! This crate provides the PostgreSQL implementation of the adapter
//! contract defined in `cenote-core`. It handles connection pooling,
//! migrations, and the translation of search, order and pagination
//! specifications into parameterized SQL.
//!
//! # Architecture
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::SqlAdapter`] - Per-model adapter over one table
//!
//! # Usage
//!
//! ```ignore
//! use cenote_storage::{Database, DatabaseConfig, SqlAdapter, SqlAdapterConfig};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_server(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Bind a logical model to its table
//! let adapter = Arc::new(SqlAdapter::new(&db, definition, adapter_config));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, SqlAdapter, SqlAdapterConfig};
