//! Translation of search and order specifications into parameterized SQL.
//!
//! The adapter builds its WHERE and ORDER BY clauses dynamically from
//! the caller's search tree. Everything interpolated into the SQL text
//! is validated against the model definition first; all values travel
//! as bind parameters.

use chrono::{DateTime, Utc};
use serde_json::Value;

use cenote_core::error::{StorageError, StorageResult};
use cenote_core::models::{ModelDefinition, ScalarType};
use cenote_core::ports::{FieldOperator, LogicalOperator, OrderDirection, OrderItem, SearchArgument};

/// A typed bind parameter.
///
/// JSON values are converted to the concrete SQL type of the target
/// column before binding, so Postgres never sees an untyped parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Convert a JSON value for a column of the given scalar type.
    pub fn from_json(value: &Value, scalar: ScalarType, field: &str) -> StorageResult<Self> {
        let converted = match (scalar, value) {
            (ScalarType::String, Value::String(s)) => Some(SqlValue::Text(s.clone())),
            (ScalarType::Int, Value::Number(n)) => n.as_i64().map(SqlValue::Int),
            (ScalarType::Float, Value::Number(n)) => n.as_f64().map(SqlValue::Float),
            (ScalarType::Boolean, Value::Bool(b)) => Some(SqlValue::Bool(*b)),
            (ScalarType::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| SqlValue::Timestamp(dt.with_timezone(&Utc))),
            _ => None,
        };
        converted.ok_or_else(|| {
            StorageError::InvalidSearch(format!(
                "value {value} is not valid for {scalar:?} field '{field}'"
            ))
        })
    }
}

/// A rendered WHERE clause plus its bind parameters in placeholder order.
#[derive(Debug, Default)]
pub struct WhereClause {
    /// SQL fragment without the leading `WHERE`, empty when the search
    /// selects everything.
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl WhereClause {
    /// Full `WHERE ...` prefix, or empty string for an empty clause.
    pub fn prefixed(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.sql)
        }
    }
}

/// Render a search tree into a parameterized WHERE clause.
///
/// SAFETY: This dynamic SQL is safe from injection because:
/// 1. Column names are checked against the model definition and quoted;
///    undeclared fields are rejected before any SQL is built
/// 2. Operators and connectives are hardcoded mappings from enums
/// 3. All VALUES are parameterized via $1, $2, etc. and bound separately
pub fn where_clause(
    argument: Option<&SearchArgument>,
    definition: &ModelDefinition,
) -> StorageResult<WhereClause> {
    let mut clause = WhereClause::default();
    if let Some(argument) = argument {
        clause.sql = render(argument, definition, &mut clause.params)?;
    }
    Ok(clause)
}

fn render(
    argument: &SearchArgument,
    definition: &ModelDefinition,
    params: &mut Vec<SqlValue>,
) -> StorageResult<String> {
    match argument {
        SearchArgument::Logical { operator, search } => {
            if search.is_empty() {
                return Err(StorageError::InvalidSearch(
                    "logical search node has no operands".into(),
                ));
            }
            let connective = match operator {
                LogicalOperator::And => " AND ",
                LogicalOperator::Or => " OR ",
            };
            let parts: Vec<String> = search
                .iter()
                .map(|s| render(s, definition, params))
                .collect::<StorageResult<_>>()?;
            Ok(format!("({})", parts.join(connective)))
        }
        SearchArgument::Field {
            field,
            operator,
            value,
        } => {
            let scalar = definition.scalar_of(field).ok_or_else(|| {
                StorageError::InvalidSearch(format!(
                    "field '{field}' is not an attribute of model '{}'",
                    definition.name
                ))
            })?;
            render_leaf(field, *operator, value, scalar, params)
        }
    }
}

fn render_leaf(
    field: &str,
    operator: FieldOperator,
    value: &Value,
    scalar: ScalarType,
    params: &mut Vec<SqlValue>,
) -> StorageResult<String> {
    let column = quote_ident(field);

    // Null comparisons never bind a parameter.
    if value.is_null() {
        return match operator {
            FieldOperator::Eq => Ok(format!("{column} IS NULL")),
            FieldOperator::Ne => Ok(format!("{column} IS NOT NULL")),
            _ => Err(StorageError::InvalidSearch(format!(
                "operator {operator:?} cannot compare '{field}' against null"
            ))),
        };
    }

    match operator {
        FieldOperator::Eq => {
            params.push(SqlValue::from_json(value, scalar, field)?);
            Ok(format!("{column} = ${}", params.len()))
        }
        // IS DISTINCT FROM keeps null rows in the result, matching the
        // in-memory evaluator where null != value.
        FieldOperator::Ne => {
            params.push(SqlValue::from_json(value, scalar, field)?);
            Ok(format!("{column} IS DISTINCT FROM ${}", params.len()))
        }
        FieldOperator::Lt | FieldOperator::Lte | FieldOperator::Gt | FieldOperator::Gte => {
            let op = match operator {
                FieldOperator::Lt => "<",
                FieldOperator::Lte => "<=",
                FieldOperator::Gt => ">",
                _ => ">=",
            };
            params.push(SqlValue::from_json(value, scalar, field)?);
            Ok(format!("{column} {op} ${}", params.len()))
        }
        FieldOperator::Like | FieldOperator::NotLike => {
            if scalar != ScalarType::String {
                return Err(StorageError::InvalidSearch(format!(
                    "LIKE requires a string field, '{field}' is {scalar:?}"
                )));
            }
            let op = if operator == FieldOperator::Like {
                "LIKE"
            } else {
                "NOT LIKE"
            };
            params.push(SqlValue::from_json(value, scalar, field)?);
            Ok(format!("{column} {op} ${}", params.len()))
        }
        FieldOperator::In | FieldOperator::NotIn => {
            let Value::Array(items) = value else {
                return Err(StorageError::InvalidSearch(format!(
                    "operator {operator:?} on '{field}' requires an array value"
                )));
            };
            if items.is_empty() {
                // Empty list: IN selects nothing, NOT IN everything.
                return Ok(if operator == FieldOperator::In {
                    "FALSE".into()
                } else {
                    "TRUE".into()
                });
            }
            let mut placeholders = Vec::with_capacity(items.len());
            for item in items {
                params.push(SqlValue::from_json(item, scalar, field)?);
                placeholders.push(format!("${}", params.len()));
            }
            let list = placeholders.join(", ");
            if operator == FieldOperator::In {
                Ok(format!("{column} IN ({list})"))
            } else {
                // Null rows satisfy NOT IN under the shared semantics.
                Ok(format!("({column} IS NULL OR {column} NOT IN ({list}))"))
            }
        }
    }
}

/// Render an order specification into an ORDER BY clause body.
///
/// Every key gets an explicit `NULLS LAST` so SQL ordering agrees with
/// the in-memory merge ordering.
pub fn order_clause(order: &[OrderItem], definition: &ModelDefinition) -> StorageResult<String> {
    let parts: Vec<String> = order
        .iter()
        .map(|item| {
            if !definition.has_attribute(&item.field) {
                return Err(StorageError::InvalidSearch(format!(
                    "order field '{}' is not an attribute of model '{}'",
                    item.field, definition.name
                )));
            }
            let dir = match item.direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            Ok(format!("{} {dir} NULLS LAST", quote_ident(&item.field)))
        })
        .collect::<StorageResult<_>>()?;
    Ok(parts.join(", "))
}

/// Comma-separated quoted column list of all declared attributes.
pub fn column_list(definition: &ModelDefinition) -> String {
    definition
        .attribute_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cenote_core::models::AttributeDef;
    use serde_json::json;

    fn definition() -> ModelDefinition {
        ModelDefinition {
            name: "individual".into(),
            name_plural: "individuals".into(),
            attributes: vec![
                AttributeDef::new("name", ScalarType::String),
                AttributeDef::new("origin", ScalarType::String),
                AttributeDef::new("genotype_id", ScalarType::Int),
            ],
            id_attribute: "name".into(),
            label_attribute: "name".into(),
        }
    }

    // Test critique: les valeurs passent toujours en paramètres liés,
    // jamais interpolées dans le texte SQL
    #[test]
    fn test_values_are_parameterized() {
        let arg = SearchArgument::field_eq("name", json!("A-001'; DROP TABLE"));
        let clause = where_clause(Some(&arg), &definition()).unwrap();
        assert_eq!(clause.sql, "\"name\" = $1");
        assert_eq!(
            clause.params,
            vec![SqlValue::Text("A-001'; DROP TABLE".into())]
        );
    }

    #[test]
    fn test_nested_tree_numbers_params_in_order() {
        let arg = SearchArgument::or(
            SearchArgument::field_eq("origin", json!("MX")),
            SearchArgument::and(
                SearchArgument::Field {
                    field: "genotype_id".into(),
                    operator: FieldOperator::Gte,
                    value: json!(5),
                },
                SearchArgument::Field {
                    field: "name".into(),
                    operator: FieldOperator::Like,
                    value: json!("A-%"),
                },
            ),
        );
        let clause = where_clause(Some(&arg), &definition()).unwrap();
        assert_eq!(
            clause.sql,
            "(\"origin\" = $1 OR (\"genotype_id\" >= $2 AND \"name\" LIKE $3))"
        );
        assert_eq!(clause.params.len(), 3);
        assert_eq!(clause.params[1], SqlValue::Int(5));
    }

    // Test critique: un champ non déclaré est rejeté avant toute
    // construction de SQL
    #[test]
    fn test_undeclared_field_rejected() {
        let arg = SearchArgument::field_eq("password", json!("x"));
        let err = where_clause(Some(&arg), &definition()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSearch(_)));

        let order = vec![OrderItem::asc("password")];
        assert!(order_clause(&order, &definition()).is_err());
    }

    // Test critique: même sémantique des nulls qu'en mémoire -
    // eq null -> IS NULL, ne garde les lignes nulles
    #[test]
    fn test_null_semantics() {
        let arg = SearchArgument::field_eq("origin", json!(null));
        let clause = where_clause(Some(&arg), &definition()).unwrap();
        assert_eq!(clause.sql, "\"origin\" IS NULL");
        assert!(clause.params.is_empty());

        let arg = SearchArgument::Field {
            field: "origin".into(),
            operator: FieldOperator::Ne,
            value: json!("MX"),
        };
        let clause = where_clause(Some(&arg), &definition()).unwrap();
        assert_eq!(clause.sql, "\"origin\" IS DISTINCT FROM $1");
    }

    #[test]
    fn test_in_expansion() {
        let arg = SearchArgument::Field {
            field: "origin".into(),
            operator: FieldOperator::In,
            value: json!(["MX", "PE", "CO"]),
        };
        let clause = where_clause(Some(&arg), &definition()).unwrap();
        assert_eq!(clause.sql, "\"origin\" IN ($1, $2, $3)");

        let arg = SearchArgument::Field {
            field: "origin".into(),
            operator: FieldOperator::In,
            value: json!([]),
        };
        let clause = where_clause(Some(&arg), &definition()).unwrap();
        assert_eq!(clause.sql, "FALSE");
    }

    // Test critique: NULLS LAST explicite sur chaque clé, pour que
    // l'ordre SQL coïncide avec l'ordre de fusion en mémoire
    #[test]
    fn test_order_clause_nulls_last() {
        let order = vec![OrderItem::desc("origin"), OrderItem::asc("name")];
        let sql = order_clause(&order, &definition()).unwrap();
        assert_eq!(sql, "\"origin\" DESC NULLS LAST, \"name\" ASC NULLS LAST");
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let arg = SearchArgument::field_eq("genotype_id", json!("not-a-number"));
        let err = where_clause(Some(&arg), &definition()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSearch(_)));
    }

    #[test]
    fn test_empty_search_selects_everything() {
        let clause = where_clause(None, &definition()).unwrap();
        assert!(clause.sql.is_empty());
        assert_eq!(clause.prefixed(), "");
    }
}
