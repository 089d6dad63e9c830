//! Opaque pagination cursor codec.
//!
//! A cursor is a base64-encoded JSON snapshot of a record's scalar
//! attributes at the moment of paging. Because it carries the ordering
//! key *values* rather than an offset, iteration resumes
//! deterministically even if results mutate between pages. Cursors are
//! not guaranteed valid across schema versions.
//!
//! Only this module and the paginator interpret cursor contents;
//! everything else treats them as opaque strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::QueryError;
use crate::models::{ModelDefinition, Record};
use crate::ports::Cursor;

/// Encode a record into an opaque cursor.
///
/// Association-valued fields are stripped first so the snapshot holds
/// only scalar attributes.
pub fn encode_record(record: &Record, definition: &ModelDefinition) -> Cursor {
    let snapshot = record.strip_associations(definition);
    // BTreeMap-backed records serialize deterministically.
    let json = serde_json::to_string(&snapshot)
        .expect("record snapshots are plain JSON maps and always serialize");
    Cursor::new(STANDARD.encode(json))
}

/// Decode a cursor back into the record snapshot it was taken from.
pub fn decode_cursor(cursor: &Cursor) -> Result<Record, QueryError> {
    let bytes = STANDARD
        .decode(&cursor.value)
        .map_err(|e| QueryError::MalformedCursor(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| QueryError::MalformedCursor(format!("invalid JSON payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeDef, ScalarType};
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

    // Test critique: aller-retour exact sur les attributs scalaires -
    // le paginateur reconstruit sa position depuis ces valeurs
    #[test]
    fn test_round_trip_preserves_scalars() {
        let record = Record::new()
            .with("name", json!("A-001"))
            .with("origin", json!("MX"))
            .with("genotype_id", json!(7))
            .with("measurements", json!([1, 2, 3]));

        let cursor = encode_record(&record, &definition());
        let decoded = decode_cursor(&cursor).unwrap();

        assert_eq!(decoded.get("name"), Some(&json!("A-001")));
        assert_eq!(decoded.get("origin"), Some(&json!("MX")));
        assert_eq!(decoded.get("genotype_id"), Some(&json!(7)));
        // Les associations ne font pas partie du snapshot
        assert!(decoded.get("measurements").is_none());
    }

    // Test critique: un curseur corrompu est rejeté proprement, jamais
    // interprété partiellement
    #[test]
    fn test_malformed_cursor_rejected() {
        let err = decode_cursor(&Cursor::new("not//valid=base64!!")).unwrap_err();
        assert!(matches!(err, QueryError::MalformedCursor(_)));

        // Base64 valide mais pas du JSON
        let garbage = Cursor::new(STANDARD.encode("plain text"));
        let err = decode_cursor(&garbage).unwrap_err();
        assert!(matches!(err, QueryError::MalformedCursor(_)));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let record = Record::new()
            .with("origin", json!("MX"))
            .with("name", json!("A-001"));
        let a = encode_record(&record, &definition());
        let b = encode_record(&record, &definition());
        assert_eq!(a, b);
    }
}
