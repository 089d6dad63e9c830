//! Wire representation shared with peer federation servers.
//!
//! Search, order and pagination arguments are rendered into the JSON
//! variable shapes of the peer's GraphQL schema, and connection/count
//! payloads are parsed back into core types. The shapes here mirror the
//! inputs exposed by the local GraphQL surface, so any two federation
//! servers can delegate to each other.

use serde_json::{json, Map, Value};

use cenote_core::error::{AdapterError, AdapterErrorKind, RemoteError, RemoteResult};
use cenote_core::models::Record;
use cenote_core::ports::{
    Connection, CountResult, Cursor, Edge, FieldOperator, LogicalOperator, OrderDirection,
    OrderItem, PageInfo, Pagination, Search, SearchArgument,
};

/// Render a search into the peer's `SearchInput` variable shape.
///
/// Leaves become `{field, operator, value}`, logical nodes become
/// `{operator, search: [...]}`, and the exclusion list rides on the top
/// node. An empty search without exclusions renders as JSON null.
pub fn search_to_wire(search: &Search) -> Value {
    let mut wire = match &search.argument {
        Some(argument) => argument_to_wire(argument),
        None => Value::Object(Map::new()),
    };
    if !search.exclude_adapter_names.is_empty() {
        if let Value::Object(map) = &mut wire {
            map.insert(
                "excludeAdapterNames".into(),
                json!(search.exclude_adapter_names),
            );
        }
    }
    match &wire {
        Value::Object(map) if map.is_empty() => Value::Null,
        _ => wire,
    }
}

fn argument_to_wire(argument: &SearchArgument) -> Value {
    match argument {
        SearchArgument::Field {
            field,
            operator,
            value,
        } => json!({
            "field": field,
            "operator": operator_name(*operator),
            "value": value,
        }),
        SearchArgument::Logical { operator, search } => json!({
            "operator": match operator {
                LogicalOperator::And => "and",
                LogicalOperator::Or => "or",
            },
            "search": search.iter().map(argument_to_wire).collect::<Vec<_>>(),
        }),
    }
}

fn operator_name(operator: FieldOperator) -> &'static str {
    match operator {
        FieldOperator::Eq => "eq",
        FieldOperator::Ne => "ne",
        FieldOperator::Lt => "lt",
        FieldOperator::Lte => "lte",
        FieldOperator::Gt => "gt",
        FieldOperator::Gte => "gte",
        FieldOperator::Like => "like",
        FieldOperator::NotLike => "notLike",
        FieldOperator::In => "in",
        FieldOperator::NotIn => "notIn",
    }
}

/// Render an order specification into `[{field, order}]`.
pub fn order_to_wire(order: &[OrderItem]) -> Value {
    Value::Array(
        order
            .iter()
            .map(|item| {
                json!({
                    "field": item.field,
                    "order": match item.direction {
                        OrderDirection::Asc => "ASC",
                        OrderDirection::Desc => "DESC",
                    },
                })
            })
            .collect(),
    )
}

/// Render pagination arguments, omitting unset fields.
pub fn pagination_to_wire(pagination: &Pagination) -> Value {
    let mut map = Map::new();
    if let Some(first) = pagination.first {
        map.insert("first".into(), json!(first));
    }
    if let Some(after) = &pagination.after {
        map.insert("after".into(), json!(after.value));
    }
    if let Some(last) = pagination.last {
        map.insert("last".into(), json!(last));
    }
    if let Some(before) = &pagination.before {
        map.insert("before".into(), json!(before.value));
    }
    if pagination.include_cursor {
        map.insert("includeCursor".into(), json!(true));
    }
    Value::Object(map)
}

/// Parse one record object.
pub fn parse_record(value: &Value) -> RemoteResult<Record> {
    serde_json::from_value(value.clone())
        .map_err(|e| RemoteError::Decode(format!("invalid record payload: {e}")))
}

/// Parse a `{sum, errors}` count payload, carried errors included.
pub fn parse_count(value: &Value) -> RemoteResult<CountResult> {
    let sum = value
        .get("sum")
        .and_then(Value::as_u64)
        .ok_or_else(|| RemoteError::Decode("count payload carries no sum".into()))?;
    Ok(CountResult {
        sum,
        errors: parse_errors(value.get("errors")),
    })
}

/// Parse a connection payload with edges, pageInfo and carried errors.
pub fn parse_connection(value: &Value) -> RemoteResult<Connection> {
    let edges = value
        .get("edges")
        .and_then(Value::as_array)
        .ok_or_else(|| RemoteError::Decode("connection payload carries no edges".into()))?
        .iter()
        .map(|edge| {
            let node = parse_record(
                edge.get("node")
                    .ok_or_else(|| RemoteError::Decode("edge carries no node".into()))?,
            )?;
            let cursor = edge
                .get("cursor")
                .and_then(Value::as_str)
                .ok_or_else(|| RemoteError::Decode("edge carries no cursor".into()))?;
            Ok(Edge {
                node,
                cursor: Cursor::new(cursor),
            })
        })
        .collect::<RemoteResult<Vec<_>>>()?;

    let info = value
        .get("pageInfo")
        .ok_or_else(|| RemoteError::Decode("connection payload carries no pageInfo".into()))?;
    let page_info = PageInfo {
        has_next_page: info
            .get("hasNextPage")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        has_previous_page: info
            .get("hasPreviousPage")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        start_cursor: info
            .get("startCursor")
            .and_then(Value::as_str)
            .map(Cursor::new),
        end_cursor: info
            .get("endCursor")
            .and_then(Value::as_str)
            .map(Cursor::new),
    };

    Ok(Connection {
        edges,
        page_info,
        errors: parse_errors(value.get("errors")),
    })
}

/// Parse the carried per-adapter failures of a distributed peer answer.
fn parse_errors(value: Option<&Value>) -> Vec<AdapterError> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| {
            let text = |key: &str| {
                entry
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string()
            };
            AdapterError {
                adapter: text("adapter"),
                operation: text("operation"),
                kind: parse_kind(entry.get("kind").and_then(Value::as_str)),
                message: text("message"),
            }
        })
        .collect()
}

fn parse_kind(kind: Option<&str>) -> AdapterErrorKind {
    match kind {
        Some("storage") => AdapterErrorKind::Storage,
        Some("timeout") => AdapterErrorKind::Timeout,
        Some("validation") => AdapterErrorKind::Validation,
        Some("internal") => AdapterErrorKind::Internal,
        _ => AdapterErrorKind::Remote,
    }
}
