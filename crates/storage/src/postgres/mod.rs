//! PostgreSQL storage adapter.
//!
//! This module implements the adapter contract defined in `cenote-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`SqlAdapter`] - One logical model bound to one table
//! - `translate` - Search/order trees rendered into parameterized SQL
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_server(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let adapter = SqlAdapter::new(&db, definition, adapter_config);
//! ```

mod database;
mod sql_adapter;
mod translate;

pub use database::{Database, DatabaseConfig};
pub use sql_adapter::{SqlAdapter, SqlAdapterConfig};
pub use translate::{column_list, order_clause, where_clause, SqlValue, WhereClause};
