//! The adapter contract.
//!
//! Every storage binding - the local SQL store, remote peer services,
//! nested federations - implements [`Adapter`]. The aggregator depends
//! only on this trait, never on a storage-type tag; the single
//! behavioral difference between plain and federating adapters is the
//! [`Adapter::supports_nested_exclusion`] capability flag.

use async_trait::async_trait;

use crate::error::AdapterResult;
use crate::models::{ModelDefinition, Record};
use serde_json::Value;

use super::pagination::{Connection, CountResult, Pagination};
use super::search::Search;
use super::OrderItem;

/// One association maintenance step attached to a mutation.
///
/// Associations are expressed through foreign-key attributes; an update
/// sets or clears that attribute *after* the primary record write has
/// committed. This is deliberately not one atomic unit: a failed
/// association step leaves the committed primary write in place.
#[derive(Debug, Clone)]
pub struct AssociationUpdate {
    /// Foreign-key attribute of the association.
    pub field: String,
    /// Operation to apply.
    pub op: AssociationOp,
}

/// Association operation kind.
#[derive(Debug, Clone)]
pub enum AssociationOp {
    /// Point the foreign key at `value`.
    Add(Value),
    /// Clear the foreign key, which must currently hold `value`.
    Remove(Value),
}

/// Input for `add_one`/`update_one`.
#[derive(Debug, Clone, Default)]
pub struct MutationInput {
    /// Attribute values; must include the id attribute.
    pub values: Record,
    /// Association maintenance steps, applied after the primary write.
    pub associations: Vec<AssociationUpdate>,
}

impl MutationInput {
    pub fn from_values(values: Record) -> Self {
        Self {
            values,
            associations: Vec::new(),
        }
    }
}

/// A concrete storage binding for one partition of a logical model's
/// id space.
///
/// Implementations own their local consistency story (transactions for
/// the SQL adapter, request semantics for remote peers). All operations
/// report failures as [`crate::error::AdapterError`] values so the
/// aggregator can collect them without aborting sibling calls.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Unique adapter name within the catalog.
    fn adapter_name(&self) -> &str;

    /// Shape of the model this adapter stores.
    fn definition(&self) -> &ModelDefinition;

    /// Whether this adapter owns the given id.
    ///
    /// Must be deterministic and side-effect-free - a pure predicate,
    /// never a network call. Across a model's registry the predicates
    /// must partition the id space: at most one adapter may claim any
    /// id.
    fn recognize_id(&self, id: &str) -> bool;

    /// Whether this adapter itself federates or delegates, and
    /// therefore needs the caller's registry added to the search
    /// exclusion list to prevent recursion and double counting.
    fn supports_nested_exclusion(&self) -> bool {
        false
    }

    /// Count records matching the search.
    ///
    /// A federating adapter answers with its own nested per-adapter
    /// failures attached to the sum, so a partial count is never
    /// mistaken for a complete one. Plain adapters leave the error list
    /// empty.
    async fn count_records(&self, search: &Search) -> AdapterResult<CountResult>;

    /// Read one cursor-paginated window of records.
    async fn read_all_cursor(
        &self,
        search: &Search,
        order: Option<&[OrderItem]>,
        pagination: Option<&Pagination>,
    ) -> AdapterResult<Connection>;

    /// Read a single record by id, `None` if absent.
    async fn read_by_id(&self, id: &str) -> AdapterResult<Option<Record>>;

    /// Create a record, then apply association steps.
    async fn add_one(&self, input: &MutationInput) -> AdapterResult<Record>;

    /// Update a record, then apply association steps.
    async fn update_one(&self, input: &MutationInput) -> AdapterResult<Record>;

    /// Delete a record by id.
    async fn delete_one(&self, id: &str) -> AdapterResult<()>;
}
