//! Ordering of federated records.
//!
//! The merge phase of a distributed read sorts records coming from
//! several adapters in memory; the SQL adapter translates the same
//! order specification into `ORDER BY` clauses. Both sides share one
//! comparison policy so a merged page is ordered exactly like a
//! single-source page:
//!
//! - multi-key comparison, keys applied left to right;
//! - missing attributes and JSON `null` sort *last*, regardless of
//!   direction (the SQL translation emits explicit `NULLS LAST`);
//! - values of different JSON types rank `Bool < Number < String <
//!   other`, numbers compare as f64, strings lexicographically.

use std::cmp::Ordering;

use serde_json::Value;

use crate::models::{ModelDefinition, Record};

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

/// One `(field, direction)` entry of an order specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub field: String,
    pub direction: OrderDirection,
}

impl OrderItem {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Normalize a caller-supplied order into a total order.
///
/// If the caller's order omits the id attribute, `(id_attribute, ASC)`
/// is appended as the final deterministic tie-breaker. Without it two
/// records equal under every caller key could interleave differently
/// between pages.
pub fn normalize_order(order: &[OrderItem], id_attribute: &str) -> Vec<OrderItem> {
    let mut normalized: Vec<OrderItem> = order.to_vec();
    if !normalized.iter().any(|item| item.field == id_attribute) {
        normalized.push(OrderItem::asc(id_attribute));
    }
    normalized
}

/// Default order for merged reads when the caller supplies none:
/// the model's label attribute, ascending.
pub fn default_order(definition: &ModelDefinition) -> Vec<OrderItem> {
    vec![OrderItem::asc(&definition.label_attribute)]
}

/// Compare two JSON values under the shared ordering policy.
///
/// Callers must handle nulls beforehand; this function ranks `Null`
/// lowest only as an arbitrary fallback for completeness.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => {
            let rank = type_rank(a).cmp(&type_rank(b));
            if rank != Ordering::Equal {
                rank
            } else {
                // Same composite type: fall back to serialized form.
                a.to_string().cmp(&b.to_string())
            }
        }
    }
}

/// Compare two records by a multi-key order, nulls last.
pub fn compare_records(a: &Record, b: &Record, order: &[OrderItem]) -> Ordering {
    for item in order {
        let va = a.get(&item.field).filter(|v| !v.is_null());
        let vb = b.get(&item.field).filter(|v| !v.is_null());

        let cmp = match (va, vb) {
            (None, None) => Ordering::Equal,
            // Nulls last, independent of direction.
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let cmp = compare_values(x, y);
                match item.direction {
                    OrderDirection::Asc => cmp,
                    OrderDirection::Desc => cmp.reverse(),
                }
            }
        };

        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

/// Stable in-place sort of records by the given order.
pub fn sort_records(records: &mut [Record], order: &[OrderItem]) {
    records.sort_by(|a, b| compare_records(a, b, order));
}
