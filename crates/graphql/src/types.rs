//! Shared GraphQL input and output types.
//!
//! Every per-model extension reuses these shapes for its list queries,
//! so the inputs any two federation servers expose are identical and
//! the webservice adapter can delegate between them.

use async_graphql::{Enum, InputObject, SimpleObject};
use serde_json::Value;

use cenote_core::error::AdapterError;
use cenote_core::ports::{
    Cursor, FieldOperator, LogicalOperator, OrderDirection, OrderItem, PageInfo, Pagination,
    Search, SearchArgument,
};

// -----------------------------------------------------------------------------
// Search
// -----------------------------------------------------------------------------

/// Operator of a search node: comparison operators for leaves,
/// `and`/`or` for logical nodes.
#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
#[graphql(rename_items = "camelCase")]
pub enum SearchOperator {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    In,
    NotIn,
}

/// Recursive search expression.
///
/// A node is either a leaf (`field` + comparison `operator` + `value`)
/// or a logical node (`and`/`or` `operator` + `search` operands). The
/// adapter exclusion list of nested federations rides on the top node.
#[derive(InputObject, Clone, Debug, Default)]
pub struct SearchInput {
    pub field: Option<String>,
    pub operator: Option<SearchOperator>,
    pub value: Option<Value>,
    pub search: Option<Vec<SearchInput>>,
    pub exclude_adapter_names: Option<Vec<String>>,
}

impl SearchInput {
    /// Convert into the core search representation, validating the node
    /// shapes.
    pub fn into_search(self) -> async_graphql::Result<Search> {
        let exclude_adapter_names = self.exclude_adapter_names.clone().unwrap_or_default();
        let argument = self.into_argument()?;
        Ok(Search {
            argument,
            exclude_adapter_names,
        })
    }

    fn into_argument(self) -> async_graphql::Result<Option<SearchArgument>> {
        let empty = self.field.is_none() && self.operator.is_none() && self.search.is_none();
        if empty {
            return Ok(None);
        }

        let operator = self
            .operator
            .ok_or_else(|| async_graphql::Error::new("search node is missing its operator"))?;

        if let Some(operands) = self.search {
            if self.field.is_some() || self.value.is_some() {
                return Err(async_graphql::Error::new(
                    "a logical search node cannot also carry field/value",
                ));
            }
            let logical = match operator {
                SearchOperator::And => LogicalOperator::And,
                SearchOperator::Or => LogicalOperator::Or,
                other => {
                    return Err(async_graphql::Error::new(format!(
                        "operator {other:?} requires field/value, not nested search"
                    )))
                }
            };
            let search = operands
                .into_iter()
                .map(|operand| {
                    operand.into_argument()?.ok_or_else(|| {
                        async_graphql::Error::new("logical search node has an empty operand")
                    })
                })
                .collect::<async_graphql::Result<Vec<_>>>()?;
            if search.is_empty() {
                return Err(async_graphql::Error::new(
                    "logical search node has no operands",
                ));
            }
            return Ok(Some(SearchArgument::Logical {
                operator: logical,
                search,
            }));
        }

        let field = self
            .field
            .ok_or_else(|| async_graphql::Error::new("search leaf is missing its field"))?;
        let comparison = match operator {
            SearchOperator::Eq => FieldOperator::Eq,
            SearchOperator::Ne => FieldOperator::Ne,
            SearchOperator::Lt => FieldOperator::Lt,
            SearchOperator::Lte => FieldOperator::Lte,
            SearchOperator::Gt => FieldOperator::Gt,
            SearchOperator::Gte => FieldOperator::Gte,
            SearchOperator::Like => FieldOperator::Like,
            SearchOperator::NotLike => FieldOperator::NotLike,
            SearchOperator::In => FieldOperator::In,
            SearchOperator::NotIn => FieldOperator::NotIn,
            SearchOperator::And | SearchOperator::Or => {
                return Err(async_graphql::Error::new(
                    "and/or require nested search operands",
                ))
            }
        };
        Ok(Some(SearchArgument::Field {
            field,
            operator: comparison,
            value: self.value.unwrap_or(Value::Null),
        }))
    }
}

// -----------------------------------------------------------------------------
// Order
// -----------------------------------------------------------------------------

/// Ordering direction.
#[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[graphql(rename_items = "UPPERCASE")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// One ordering key.
#[derive(InputObject, Clone, Debug)]
pub struct OrderInput {
    pub field: String,
    #[graphql(default)]
    pub order: Order,
}

impl From<OrderInput> for OrderItem {
    fn from(input: OrderInput) -> Self {
        OrderItem {
            field: input.field,
            direction: match input.order {
                Order::Asc => OrderDirection::Asc,
                Order::Desc => OrderDirection::Desc,
            },
        }
    }
}

/// Convert an optional order list.
pub fn into_order(order: Option<Vec<OrderInput>>) -> Option<Vec<OrderItem>> {
    order.map(|items| items.into_iter().map(OrderItem::from).collect())
}

// -----------------------------------------------------------------------------
// Pagination
// -----------------------------------------------------------------------------

/// Cursor pagination arguments, forward (`first`/`after`) or backward
/// (`last`/`before`).
#[derive(InputObject, Clone, Debug, Default)]
pub struct PaginationInput {
    pub first: Option<i32>,
    pub after: Option<String>,
    pub last: Option<i32>,
    pub before: Option<String>,
    #[graphql(default = false)]
    pub include_cursor: bool,
}

impl PaginationInput {
    pub fn into_pagination(self) -> async_graphql::Result<Pagination> {
        let page_size = |value: Option<i32>, name: &str| match value {
            Some(v) if v < 0 => Err(async_graphql::Error::new(format!(
                "\"{name}\" must not be negative"
            ))),
            Some(v) => Ok(Some(v as u64)),
            None => Ok(None),
        };
        Ok(Pagination {
            first: page_size(self.first, "first")?,
            after: self.after.map(Cursor::new),
            last: page_size(self.last, "last")?,
            before: self.before.map(Cursor::new),
            include_cursor: self.include_cursor,
        })
    }
}

// -----------------------------------------------------------------------------
// Output types
// -----------------------------------------------------------------------------

/// Relay-style page information of the merged result.
#[derive(SimpleObject, Clone)]
pub struct PageInfoType {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

impl From<PageInfo> for PageInfoType {
    fn from(info: PageInfo) -> Self {
        Self {
            has_next_page: info.has_next_page,
            has_previous_page: info.has_previous_page,
            start_cursor: info.start_cursor.map(|c| c.value),
            end_cursor: info.end_cursor.map(|c| c.value),
        }
    }
}

/// One non-fatal per-adapter failure collected during a distributed
/// read. Carried next to the partial data instead of aborting it.
#[derive(SimpleObject, Clone)]
pub struct AdapterFailure {
    /// Name of the failing adapter.
    pub adapter: String,
    /// Operation that failed.
    pub operation: String,
    /// Failure classification (`storage`, `remote`, `timeout`, ...).
    pub kind: String,
    /// Human-readable details.
    pub message: String,
}

impl From<AdapterError> for AdapterFailure {
    fn from(err: AdapterError) -> Self {
        Self {
            adapter: err.adapter,
            operation: err.operation,
            kind: err.kind.to_string(),
            message: err.message,
        }
    }
}
