//! Parsed schema documents and structural comparison

use std::fmt;

use serde_json::{Map, Number, Value};

use crate::error::{Result, SchemaError, SpecOrigin};
use crate::fingerprint::Fingerprint;

/// An immutable, parsed Avro schema definition.
///
/// Two documents are equal when their JSON content is equal after
/// canonicalisation: object keys are order-insensitive, whitespace is
/// irrelevant and `1.0` equals `1`. Array order is significant, since the order of record fields
/// and union branches changes the binary encoding.
#[derive(Clone)]
pub struct SchemaDocument {
    /// Canonical JSON form (object keys sorted recursively)
    content: Value,
    /// Compiled schema used for encoding and decoding
    avro: apache_avro::Schema,
    fingerprint: Fingerprint,
}

impl SchemaDocument {
    /// Parse a textual schema definition.
    ///
    /// The text must be valid JSON and a valid Avro schema. `subject` and
    /// `origin` only feed the error context.
    pub fn parse(text: &str, subject: &str, origin: SpecOrigin) -> Result<Self> {
        let parse_err = |reason: String| SchemaError::SpecParse {
            origin,
            subject: subject.to_string(),
            reason,
        };

        let raw: Value = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;
        let avro = apache_avro::Schema::parse(&raw).map_err(|e| parse_err(e.to_string()))?;
        let content = canonicalize(raw);
        let fingerprint = Fingerprint::from_json(&content);

        Ok(Self {
            content,
            avro,
            fingerprint,
        })
    }

    /// The canonical JSON content
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// The compiled Avro schema
    pub fn avro(&self) -> &apache_avro::Schema {
        &self.avro
    }

    /// Fingerprint of the canonical content
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Compact canonical text, suitable for sending to the registry
    pub fn canonical_text(&self) -> String {
        self.content.to_string()
    }

    /// Structural equality against another document
    pub fn is_structurally_equal(&self, other: &SchemaDocument) -> bool {
        self.fingerprint == other.fingerprint && self.content == other.content
    }
}

impl PartialEq for SchemaDocument {
    fn eq(&self, other: &Self) -> bool {
        self.is_structurally_equal(other)
    }
}

impl Eq for SchemaDocument {}

impl fmt::Debug for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDocument")
            .field("fingerprint", &self.fingerprint.short())
            .field("content", &self.content)
            .finish()
    }
}

/// Integral floats within this bound convert to integers without loss
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Rebuild a JSON value with every object's keys in sorted order and every
/// integral float (`1.0`, `1e2`) written as an integer.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Number(n) => Value::Number(canonical_number(n)),
        other => other,
    }
}

fn canonical_number(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER => {
            Number::from(f as i64)
        }
        _ => n,
    }
}

/// Compare two textual schema definitions structurally.
pub fn is_equal_spec(a: &str, b: &str, subject: &str) -> Result<bool> {
    let a = SchemaDocument::parse(a, subject, SpecOrigin::Registry)?;
    let b = SchemaDocument::parse(b, subject, SpecOrigin::Local)?;
    Ok(a.is_structurally_equal(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPACT: &str = r#"{"type":"record","name":"T","fields":[{"name":"a","type":"int"}]}"#;

    #[test]
    fn test_reordered_keys_and_whitespace_are_equal() {
        let pretty = r#"
            {
                "name": "T",
                "fields": [ { "type": "int", "name": "a" } ],
                "type": "record"
            }
        "#;
        assert!(is_equal_spec(COMPACT, pretty, "t-value").unwrap());
    }

    #[test]
    fn test_different_field_type_is_not_equal() {
        let other = r#"{"type":"record","name":"T","fields":[{"name":"a","type":"long"}]}"#;
        assert!(!is_equal_spec(COMPACT, other, "t-value").unwrap());
    }

    #[test]
    fn test_reordered_record_fields_are_not_equal() {
        let a = r#"{"type":"record","name":"T",
            "fields":[{"name":"a","type":"int"},{"name":"b","type":"int"}]}"#;
        let b = r#"{"type":"record","name":"T",
            "fields":[{"name":"b","type":"int"},{"name":"a","type":"int"}]}"#;
        assert!(!is_equal_spec(a, b, "t-value").unwrap());
    }

    fn double_with_default(default: &str) -> String {
        let field = format!(r#"{{"name":"a","type":"double","default":{default}}}"#);
        format!(r#"{{"type":"record","name":"T","fields":[{field}]}}"#)
    }

    #[test]
    fn test_integral_float_default_equals_integer_default() {
        let int_default = double_with_default("1");
        assert!(is_equal_spec(&int_default, &double_with_default("1.0"), "t-value").unwrap());
        assert!(is_equal_spec(&int_default, &double_with_default("1e0"), "t-value").unwrap());
    }

    #[test]
    fn test_fractional_default_is_not_equal() {
        let int_default = double_with_default("1");
        assert!(!is_equal_spec(&int_default, &double_with_default("1.5"), "t-value").unwrap());
    }

    #[test]
    fn test_invalid_json_is_spec_parse_error() {
        let err = SchemaDocument::parse("{not json", "t-value", SpecOrigin::Local).unwrap_err();
        match err {
            SchemaError::SpecParse { origin, subject, .. } => {
                assert_eq!(origin, SpecOrigin::Local);
                assert_eq!(subject, "t-value");
            }
            other => panic!("Expected SpecParse, got {:?}", other),
        }
    }

    #[test]
    fn test_json_that_is_not_avro_is_rejected() {
        let err = SchemaDocument::parse(r#"{"type":"record"}"#, "t-value", SpecOrigin::Registry)
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::SpecParse {
                origin: SpecOrigin::Registry,
                ..
            }
        ));
    }

    #[test]
    fn test_canonical_text_is_compact_and_sorted() {
        let doc = SchemaDocument::parse(COMPACT, "t-value", SpecOrigin::Local).unwrap();
        assert_eq!(
            doc.canonical_text(),
            r#"{"fields":[{"name":"a","type":"int"}],"name":"T","type":"record"}"#
        );
    }
}
