//! Search argument trees.
//!
//! A [`SearchArgument`] is a recursive boolean expression: leaves test
//! one field against a value, internal nodes combine sub-expressions
//! with `and`/`or`. The tree translates losslessly into each adapter's
//! native filter representation - parameterized SQL in the sql-adapter,
//! GraphQL variables for remote peers, and a direct evaluator here for
//! in-memory sources.
//!
//! [`Search`] wraps the optional tree together with the adapter
//! exclusion list that delegating (federating) adapters use to prevent
//! infinite recursion and double counting across nested federations.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::order::compare_values;
use crate::models::Record;

/// Comparison operator of a leaf search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldOperator {
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

/// Connective of an internal search node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

/// Recursive boolean search expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchArgument {
    /// Internal node: `and`/`or` over sub-expressions.
    Logical {
        operator: LogicalOperator,
        search: Vec<SearchArgument>,
    },
    /// Leaf: one field compared against a value.
    Field {
        field: String,
        operator: FieldOperator,
        value: Value,
    },
}

impl SearchArgument {
    /// Leaf testing `field == value`.
    pub fn field_eq(field: impl Into<String>, value: Value) -> Self {
        SearchArgument::Field {
            field: field.into(),
            operator: FieldOperator::Eq,
            value,
        }
    }

    /// Conjunction of two expressions.
    pub fn and(a: SearchArgument, b: SearchArgument) -> Self {
        SearchArgument::Logical {
            operator: LogicalOperator::And,
            search: vec![a, b],
        }
    }

    /// Disjunction of two expressions.
    pub fn or(a: SearchArgument, b: SearchArgument) -> Self {
        SearchArgument::Logical {
            operator: LogicalOperator::Or,
            search: vec![a, b],
        }
    }

    /// Evaluate the expression against a record (in-memory filter).
    ///
    /// Missing attributes behave like JSON `null`: they satisfy `eq
    /// null` and `ne <value>`, and never satisfy a relational operator.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            SearchArgument::Logical { operator, search } => match operator {
                LogicalOperator::And => search.iter().all(|s| s.matches(record)),
                LogicalOperator::Or => search.iter().any(|s| s.matches(record)),
            },
            SearchArgument::Field {
                field,
                operator,
                value,
            } => {
                let null = Value::Null;
                let actual = record.get(field).unwrap_or(&null);
                match operator {
                    FieldOperator::Eq => actual == value,
                    FieldOperator::Ne => actual != value,
                    FieldOperator::Lt => relational(actual, value, Ordering::is_lt),
                    FieldOperator::Lte => relational(actual, value, Ordering::is_le),
                    FieldOperator::Gt => relational(actual, value, Ordering::is_gt),
                    FieldOperator::Gte => relational(actual, value, Ordering::is_ge),
                    FieldOperator::Like => like(actual, value, false),
                    FieldOperator::NotLike => like(actual, value, true),
                    FieldOperator::In => contains(value, actual),
                    FieldOperator::NotIn => !contains(value, actual),
                }
            }
        }
    }
}

fn relational(actual: &Value, expected: &Value, accept: fn(Ordering) -> bool) -> bool {
    if actual.is_null() || expected.is_null() {
        return false;
    }
    accept(compare_values(actual, expected))
}

fn contains(list: &Value, actual: &Value) -> bool {
    match list {
        Value::Array(items) => items.iter().any(|item| item == actual),
        _ => false,
    }
}

/// SQL-style `LIKE` with `%` wildcards (no `_` support), evaluated on
/// string values only.
fn like(actual: &Value, pattern: &Value, negate: bool) -> bool {
    let (Some(text), Some(pattern)) = (actual.as_str(), pattern.as_str()) else {
        return false;
    };
    let matched = like_match(text, pattern);
    matched != negate
}

fn like_match(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }

    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// A search request: the optional expression tree plus the adapter
/// exclusion list threaded through nested federations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Search {
    /// Boolean filter expression; `None` selects everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<SearchArgument>,
    /// Adapters already visited by enclosing federations. An aggregator
    /// must skip these, and a delegating adapter forwards its own
    /// registry here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_adapter_names: Vec<String>,
}

impl Search {
    /// Search selecting every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Search with a filter expression and no exclusions.
    pub fn filtered(argument: SearchArgument) -> Self {
        Self {
            argument: Some(argument),
            exclude_adapter_names: Vec::new(),
        }
    }

    /// Copy of this search with additional excluded adapter names
    /// (deduplicated, order-preserving).
    pub fn with_exclusions<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = self.clone();
        for name in names {
            let name = name.into();
            if !out.exclude_adapter_names.contains(&name) {
                out.exclude_adapter_names.push(name);
            }
        }
        out
    }

    /// Copy of this search with `extra` AND-ed onto the expression.
    pub fn and_argument(&self, extra: SearchArgument) -> Self {
        let argument = match &self.argument {
            Some(existing) => SearchArgument::and(existing.clone(), extra),
            None => extra,
        };
        Self {
            argument: Some(argument),
            exclude_adapter_names: self.exclude_adapter_names.clone(),
        }
    }
}

/// AND an optional expression with an extra term.
pub fn and_option(argument: Option<&SearchArgument>, extra: SearchArgument) -> SearchArgument {
    match argument {
        Some(existing) => SearchArgument::and(existing.clone(), extra),
        None => extra,
    }
}
