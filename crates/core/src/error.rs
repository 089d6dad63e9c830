//! Error types for the federation domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`QueryError`] - Synchronous pagination/cursor validation errors
//! - [`RegistryError`] - Id-space resolution errors
//! - [`StorageError`] - Database/record-source errors
//! - [`RemoteError`] - Remote peer (GraphQL-over-HTTP) errors
//! - [`AdapterError`] - Per-adapter failures collected during a fan-out
//! - [`ModelError`] - Top-level errors for distributed model operations
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. `AdapterError` is
//! deliberately a value, not an exception: once a fan-out has begun,
//! per-adapter failures are demoted to data and collected into the
//! aggregate result instead of aborting it.

use thiserror::Error;

// =============================================================================
// Query Errors
// =============================================================================

/// Pagination and cursor validation errors.
///
/// These are surfaced synchronously, before any adapter or store is
/// contacted, and abort the single call that triggered them.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Caller mixed forward and backward pagination arguments.
    #[error(
        "Illegal cursor based pagination arguments. Use either \"first\" and optionally \
         \"after\", or \"last\" and optionally \"before\""
    )]
    InvalidPaginationArgs,

    /// An `after`/`before` cursor failed to decode.
    #[error("Malformed cursor: {0}")]
    MalformedCursor(String),

    /// Requested or implicit page size exceeds the configured maximum.
    #[error("Request of {requested} records exceeds max limit of {max}. Please use pagination")]
    LimitExceeded {
        /// Effective page size the caller asked for.
        requested: u64,
        /// Configured maximum.
        max: u64,
    },

    /// The backing record source failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Id-space resolution errors.
///
/// The adapter registry partitions the id space of a logical model via
/// `recognize_id` predicates. These errors signal a violated partition
/// invariant or an unrecognized id; they are fatal for the single
/// operation that needed the resolution but never affect sibling
/// adapters.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// More than one adapter claims the id.
    #[error("Id '{0}' has no unique adapter match")]
    AmbiguousId(String),

    /// No registered adapter claims the id.
    #[error("Id '{0}' is not recognized by any registered adapter")]
    UnresolvedId(String),

    /// The logical model is not registered in the catalog.
    #[error("Model '{0}' is not registered")]
    UnknownModel(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and record-source errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// Query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A search argument referenced an unknown field or an unsupported
    /// operator for the target representation.
    #[error("Invalid search argument: {0}")]
    InvalidSearch(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Attempt to remove an association that does not currently hold
    /// the stated value.
    #[error("Association '{field}' does not currently hold the value '{value}'")]
    AssociationIntegrity {
        /// Foreign-key attribute of the association.
        field: String,
        /// Value the caller tried to remove.
        value: String,
    },
}

// =============================================================================
// Remote Errors
// =============================================================================

/// Remote peer service errors.
///
/// These occur when talking to a sibling GraphQL service over HTTP.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The peer answered with a non-success status.
    #[error("Peer returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The peer's GraphQL response carried errors.
    #[error("Peer GraphQL errors: {0}")]
    GraphQl(String),

    /// The response payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

// =============================================================================
// Adapter Errors (collected, non-fatal)
// =============================================================================

/// Classification of a per-adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    /// Local store failure.
    Storage,
    /// Remote peer failure.
    Remote,
    /// The bounded per-adapter wait elapsed.
    Timeout,
    /// The adapter rejected the request as invalid.
    Validation,
    /// Unexpected internal failure (e.g. a panicked sub-task).
    Internal,
}

impl std::fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdapterErrorKind::Storage => "storage",
            AdapterErrorKind::Remote => "remote",
            AdapterErrorKind::Timeout => "timeout",
            AdapterErrorKind::Validation => "validation",
            AdapterErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A failure produced by one adapter during a fan-out.
///
/// Captured into the `errors` list of the aggregate result rather than
/// thrown to the caller, so that partial data is never silently dropped.
#[derive(Debug, Clone, Error)]
#[error("Adapter '{adapter}' failed on {operation} ({kind}): {message}")]
pub struct AdapterError {
    /// Name of the failing adapter.
    pub adapter: String,
    /// Operation that failed (`countRecords`, `readAllCursor`, ...).
    pub operation: String,
    /// Failure classification.
    pub kind: AdapterErrorKind,
    /// Human-readable details.
    pub message: String,
}

impl AdapterError {
    /// Build an adapter error from any displayable cause.
    pub fn new(
        adapter: impl Into<String>,
        operation: impl Into<String>,
        kind: AdapterErrorKind,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self {
            adapter: adapter.into(),
            operation: operation.into(),
            kind,
            message: cause.to_string(),
        }
    }

    /// Build a timeout entry for a fan-out sub-call.
    pub fn timeout(adapter: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            operation: operation.into(),
            kind: AdapterErrorKind::Timeout,
            message: "adapter call exceeded the configured timeout".into(),
        }
    }
}

// =============================================================================
// Model Errors (top-level)
// =============================================================================

/// Top-level errors for distributed model operations.
///
/// This is the main error type returned by
/// [`crate::services::DdmService`] for operations that are fatal as a
/// whole (mutations, id resolution, argument validation). Fan-out reads
/// never fail with per-adapter causes; those are collected as
/// [`AdapterError`] values instead.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Pagination/cursor validation error.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Id resolution error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The single responsible adapter failed a routed operation.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Invalid mutation input.
    #[error("Validation error: {0}")]
    Validation(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for pagination/read operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for remote peer operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result type for single-adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for distributed model operations.
pub type ModelResult<T> = Result<T, ModelError>;
