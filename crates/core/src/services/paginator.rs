//! Single-source cursor pagination.
//!
//! Given one [`RecordSource`], [`paginate`] computes a consistent
//! forward or backward pagination window plus its `pageInfo` block. The
//! SQL adapter runs this against a live table; the aggregator runs the
//! very same code against an in-memory source holding a merged result
//! set, so both levels window records identically.
//!
//! Consistency note: the window is derived from two counts and one
//! fetch issued sequentially against a store that may mutate in
//! between. There is no snapshot isolation across these steps; a page
//! may reflect data as of an indeterminate point within the request's
//! lifetime. This is an accepted weak-consistency window, not a defect
//! to paper over here.

use crate::cursor::{decode_cursor, encode_record};
use crate::error::{QueryError, QueryResult};
use crate::models::Record;
use crate::ports::{
    and_option, normalize_order, Connection, Cursor, Direction, Edge, FieldOperator, OrderDirection,
    OrderItem, PageInfo, Pagination, RecordSource, SearchArgument,
};
use serde_json::Value;

/// Paginator configuration.
#[derive(Debug, Clone)]
pub struct PaginatorConfig {
    /// Maximum number of records a single window may request. An
    /// unbounded read past this fails with [`QueryError::LimitExceeded`]
    /// instead of silently truncating.
    pub limit_records: u64,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            limit_records: 10_000,
        }
    }
}

/// Compute one pagination window over a single source.
///
/// Validates the pagination arguments, normalizes the order with the id
/// tie-breaker, translates an `after`/`before` cursor into a composite
/// position filter, and derives the `pageInfo` flags from the
/// unfiltered (`count_a`) and position-filtered (`count_b`) counts.
pub async fn paginate(
    source: &dyn RecordSource,
    search: Option<&SearchArgument>,
    order: Option<&[OrderItem]>,
    pagination: Option<&Pagination>,
    config: &PaginatorConfig,
) -> QueryResult<Connection> {
    let default_pagination = Pagination::default();
    let pagination = pagination.unwrap_or(&default_pagination);
    let direction = pagination.validate()?;

    let definition = source.definition();
    let normalized_order = normalize_order(order.unwrap_or(&[]), &definition.id_attribute);

    // Informational count, ignoring any cursor position.
    let count_a = source.count(search).await?;

    // Translate the cursor into a strictly-after / strictly-before
    // filter consistent with the multi-field order.
    let cursor = match direction {
        Direction::Forward => pagination.after.as_ref(),
        Direction::Backward => pagination.before.as_ref(),
    };
    let positioned: Option<SearchArgument> = match cursor {
        Some(cursor) => {
            let snapshot = decode_cursor(cursor)?;
            let filter = cursor_filter(
                &normalized_order,
                &snapshot,
                direction,
                pagination.include_cursor,
            );
            Some(and_option(search, filter))
        }
        None => None,
    };
    let positioned = positioned.as_ref().or(search);

    let count_b = source.count(positioned).await?;

    let (limit, offset) = match direction {
        Direction::Forward => (pagination.first.unwrap_or(count_a), 0),
        Direction::Backward => {
            let last = pagination.last.unwrap_or(count_a);
            (last, count_b.saturating_sub(last))
        }
    };

    if limit > config.limit_records {
        return Err(QueryError::LimitExceeded {
            requested: limit,
            max: config.limit_records,
        });
    }

    let records = source
        .fetch(positioned, &normalized_order, offset, Some(limit))
        .await?;

    let edges: Vec<Edge> = records
        .into_iter()
        .map(|node| {
            let cursor = encode_record(&node, definition);
            Edge { node, cursor }
        })
        .collect();

    let page_info = match direction {
        Direction::Forward => PageInfo {
            has_previous_page: count_a > count_b,
            has_next_page: pagination.first.map(|f| count_b > f).unwrap_or(false),
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        },
        Direction::Backward => PageInfo {
            has_previous_page: pagination.last.map(|l| count_b > l).unwrap_or(false),
            has_next_page: count_a > count_b,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        },
    };

    Ok(Connection {
        edges,
        page_info,
        errors: Vec::new(),
    })
}

/// Build the composite filter selecting records strictly after (forward)
/// or strictly before (backward) the cursor position.
///
/// For an order `[(f1, d1), (f2, d2), ...]` and cursor values `v1, v2,
/// ...` the forward filter is
///
/// ```text
/// f1 > v1  OR  (f1 = v1 AND (f2 > v2 OR (f2 = v2 AND ...)))
/// ```
///
/// with `>` flipped to `<` for descending keys, and the innermost
/// comparison made inclusive when `include_cursor` is set. A `null`
/// cursor value never satisfies a relational comparison, which matches
/// the nulls-last policy: nothing sorts strictly after a null in
/// ascending order.
pub fn cursor_filter(
    order: &[OrderItem],
    snapshot: &Record,
    direction: Direction,
    include_cursor: bool,
) -> SearchArgument {
    fn build(
        order: &[OrderItem],
        snapshot: &Record,
        direction: Direction,
        include_cursor: bool,
    ) -> SearchArgument {
        let item = &order[0];
        let value: Value = snapshot.get(&item.field).cloned().unwrap_or(Value::Null);

        let strict = strict_operator(item.direction, direction);
        let leaf = |operator| SearchArgument::Field {
            field: item.field.clone(),
            operator,
            value: value.clone(),
        };

        if order.len() == 1 {
            let operator = if include_cursor {
                inclusive(strict)
            } else {
                strict
            };
            return leaf(operator);
        }

        SearchArgument::or(
            leaf(strict),
            SearchArgument::and(
                leaf(FieldOperator::Eq),
                build(&order[1..], snapshot, direction, include_cursor),
            ),
        )
    }

    build(order, snapshot, direction, include_cursor)
}

fn strict_operator(key_direction: OrderDirection, paging: Direction) -> FieldOperator {
    match (key_direction, paging) {
        (OrderDirection::Asc, Direction::Forward) => FieldOperator::Gt,
        (OrderDirection::Desc, Direction::Forward) => FieldOperator::Lt,
        (OrderDirection::Asc, Direction::Backward) => FieldOperator::Lt,
        (OrderDirection::Desc, Direction::Backward) => FieldOperator::Gt,
    }
}

fn inclusive(op: FieldOperator) -> FieldOperator {
    match op {
        FieldOperator::Gt => FieldOperator::Gte,
        FieldOperator::Lt => FieldOperator::Lte,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeDef, ModelDefinition, ScalarType};
    use crate::ports::MemorySource;
    use serde_json::json;

    fn definition() -> ModelDefinition {
        ModelDefinition {
            name: "individual".into(),
            name_plural: "individuals".into(),
            attributes: vec![
                AttributeDef::new("name", ScalarType::String),
                AttributeDef::new("origin", ScalarType::String),
            ],
            id_attribute: "name".into(),
            label_attribute: "name".into(),
        }
    }

    fn source(names: &[&str]) -> MemorySource {
        let records = names
            .iter()
            .map(|n| Record::new().with("name", json!(n)).with("origin", json!("MX")))
            .collect();
        MemorySource::new(definition(), records)
    }

    fn names(connection: &Connection) -> Vec<String> {
        connection
            .edges
            .iter()
            .map(|e| e.node.get("name").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    // Test critique: parcourir toutes les pages via after=endCursor
    // reconstitue l'ensemble complet, sans doublon ni trou, et termine
    // sur hasNextPage=false
    #[tokio::test]
    async fn test_forward_walk_is_gapless() {
        let all = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf"];
        let src = source(&all);
        let config = PaginatorConfig::default();

        let mut collected = Vec::new();
        let mut after: Option<Cursor> = None;
        loop {
            let pagination = Pagination {
                first: Some(3),
                after: after.clone(),
                ..Default::default()
            };
            let page = paginate(&src, None, None, Some(&pagination), &config)
                .await
                .unwrap();
            collected.extend(names(&page));
            if !page.page_info.has_next_page {
                break;
            }
            after = page.page_info.end_cursor.clone();
        }

        assert_eq!(collected, all);
    }

    #[tokio::test]
    async fn test_forward_page_info() {
        let src = source(&["alpha", "bravo", "charlie", "delta", "echo"]);
        let config = PaginatorConfig::default();

        // Première page
        let page = paginate(
            &src,
            None,
            None,
            Some(&Pagination::forward(2, None)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(names(&page), ["alpha", "bravo"]);
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);

        // Page du milieu
        let after = page.page_info.end_cursor.clone();
        let page = paginate(
            &src,
            None,
            None,
            Some(&Pagination::forward(2, after)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(names(&page), ["charlie", "delta"]);
        assert!(page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    // Test critique: la pagination arrière est symétrique - offset
    // max(countB - last, 0) et drapeaux inversés
    #[tokio::test]
    async fn test_backward_window() {
        let src = source(&["alpha", "bravo", "charlie", "delta", "echo"]);
        let config = PaginatorConfig::default();

        let page = paginate(
            &src,
            None,
            None,
            Some(&Pagination::backward(2, None)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(names(&page), ["delta", "echo"]);
        assert!(page.page_info.has_previous_page);
        assert!(!page.page_info.has_next_page);

        // Avant "delta": les deux précédents
        let before = page.page_info.start_cursor.clone();
        let page = paginate(
            &src,
            None,
            None,
            Some(&Pagination::backward(2, before)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(names(&page), ["bravo", "charlie"]);
        assert!(page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_include_cursor() {
        let src = source(&["alpha", "bravo", "charlie"]);
        let config = PaginatorConfig::default();

        let page = paginate(
            &src,
            None,
            None,
            Some(&Pagination::forward(3, None)),
            &config,
        )
        .await
        .unwrap();
        let first_cursor = page.edges[0].cursor.clone();

        let pagination = Pagination {
            first: Some(2),
            after: Some(first_cursor),
            include_cursor: true,
            ..Default::default()
        };
        let page = paginate(&src, None, None, Some(&pagination), &config)
            .await
            .unwrap();
        assert_eq!(names(&page), ["alpha", "bravo"]);
    }

    // Test critique: une lecture non bornée au-delà du maximum échoue
    // explicitement au lieu de tronquer en silence
    #[tokio::test]
    async fn test_limit_guard() {
        let src = source(&["alpha", "bravo", "charlie"]);
        let config = PaginatorConfig { limit_records: 2 };

        // Pas de pagination: limite implicite = countA = 3 > 2
        let err = paginate(&src, None, None, None, &config).await.unwrap_err();
        assert!(matches!(err, QueryError::LimitExceeded { requested: 3, max: 2 }));

        // first explicite sous la limite: OK
        let page = paginate(
            &src,
            None,
            None,
            Some(&Pagination::forward(2, None)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(page.edges.len(), 2);
    }

    #[tokio::test]
    async fn test_mixed_args_rejected_before_any_count() {
        let src = source(&["alpha"]);
        let pagination = Pagination {
            first: Some(1),
            last: Some(1),
            ..Default::default()
        };
        let err = paginate(&src, None, None, Some(&pagination), &PaginatorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidPaginationArgs));
    }

    #[tokio::test]
    async fn test_malformed_cursor_surfaces() {
        let src = source(&["alpha"]);
        let pagination = Pagination {
            first: Some(1),
            after: Some(Cursor::new("@@@not-base64@@@")),
            ..Default::default()
        };
        let err = paginate(&src, None, None, Some(&pagination), &PaginatorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::MalformedCursor(_)));
    }

    // Test critique: ordre descendant - le filtre de curseur suit la
    // direction de chaque clé
    #[tokio::test]
    async fn test_descending_order_walk() {
        let src = source(&["alpha", "bravo", "charlie", "delta"]);
        let config = PaginatorConfig::default();
        let order = vec![OrderItem::desc("name")];

        let page = paginate(
            &src,
            None,
            Some(&order),
            Some(&Pagination::forward(2, None)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(names(&page), ["delta", "charlie"]);

        let after = page.page_info.end_cursor.clone();
        let page = paginate(
            &src,
            None,
            Some(&order),
            Some(&Pagination::forward(2, after)),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(names(&page), ["bravo", "alpha"]);
        assert!(!page.page_info.has_next_page);
    }
}
