//! Pagination types for federated list queries.
//!
//! These types implement Relay-style cursor pagination. A connection
//! produced by the federation layer additionally carries the non-fatal
//! per-adapter failures collected during the fan-out, so that partial
//! data is never silently dropped.

use crate::error::{AdapterError, QueryError};
use crate::models::Record;

/// Opaque cursor for pagination.
///
/// The value is a base64-encoded JSON snapshot of a record's scalar
/// attributes (see [`crate::cursor`]); clients must treat it as an
/// opaque token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub value: String,
}

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Pagination direction derived from the argument form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Pagination parameters for list queries.
///
/// Supports forward pagination (`first`/`after`) and backward
/// pagination (`last`/`before`). Exactly one of the two forms may be
/// used per request; `include_cursor` makes the cursor position itself
/// part of the window.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Number of items to fetch (forward pagination).
    pub first: Option<u64>,
    /// Cursor to start after (forward pagination).
    pub after: Option<Cursor>,
    /// Number of items to fetch (backward pagination).
    pub last: Option<u64>,
    /// Cursor to end before (backward pagination).
    pub before: Option<Cursor>,
    /// Include the record at the cursor position in the window.
    pub include_cursor: bool,
}

impl Pagination {
    /// Forward pagination window.
    pub fn forward(first: u64, after: Option<Cursor>) -> Self {
        Self {
            first: Some(first),
            after,
            ..Default::default()
        }
    }

    /// Backward pagination window.
    pub fn backward(last: u64, before: Option<Cursor>) -> Self {
        Self {
            last: Some(last),
            before,
            ..Default::default()
        }
    }

    /// Validate the argument combination and derive the direction.
    ///
    /// Legal forms are: no arguments at all (default forward), `first`
    /// with optional `after`, or `last` with optional `before`. Any mix
    /// of the two forms - and a bare cursor without its page size - is
    /// rejected before any data source is contacted.
    pub fn validate(&self) -> Result<Direction, QueryError> {
        let empty = self.first.is_none()
            && self.after.is_none()
            && self.last.is_none()
            && self.before.is_none();
        if empty {
            return Ok(Direction::Forward);
        }

        let forward_form =
            self.first.is_some() && self.last.is_none() && self.before.is_none();
        let backward_form =
            self.last.is_some() && self.first.is_none() && self.after.is_none();

        match (forward_form, backward_form) {
            (true, false) => Ok(Direction::Forward),
            (false, true) => Ok(Direction::Backward),
            _ => Err(QueryError::InvalidPaginationArgs),
        }
    }
}

/// Information about the current page in a paginated result.
///
/// For federated reads this is computed relative to the *global merged*
/// result, not any single adapter's local page.
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether there are items before this page.
    pub has_previous_page: bool,
    /// Cursor of the first item in this page.
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last item in this page.
    pub end_cursor: Option<Cursor>,
}

/// A single item in a paginated result.
#[derive(Debug, Clone)]
pub struct Edge {
    /// The record itself.
    pub node: Record,
    /// Cursor for this record.
    pub cursor: Cursor,
}

/// Paginated result set with edges, page info, and collected failures.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    /// List of edges (node + cursor pairs).
    pub edges: Vec<Edge>,
    /// Information about the current page.
    pub page_info: PageInfo,
    /// Non-fatal per-adapter failures gathered during the fan-out.
    /// Empty for single-source reads.
    pub errors: Vec<AdapterError>,
}

/// Aggregate result of a distributed count.
#[derive(Debug, Default)]
pub struct CountResult {
    /// Arithmetic sum of all successful per-adapter counts.
    pub sum: u64,
    /// Non-fatal per-adapter failures.
    pub errors: Vec<AdapterError>,
}
