/*!
Runtime literal values of the Iceberg type system (spec §3.1, §4.2).

[Value] is the single representation used for partition tuples, equality
delete row values, and statistics bounds/literals. It intentionally
mirrors the set of primitives the binary codec knows how to encode —
nested values are out of scope for literals (only primitive columns
participate in bounds, partitioning, and equality deletes).
*/

use std::cmp::Ordering;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::decimal::Decimal;

/// A single primitive literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit IEEE-754 float.
    Float(f32),
    /// 64-bit IEEE-754 float.
    Double(f64),
    /// Unscaled decimal.
    Decimal(Decimal),
    /// Days since 1970-01-01.
    Date(i32),
    /// Microseconds since midnight.
    Time(i64),
    /// Microseconds since 1970-01-01T00:00:00, no timezone.
    Timestamp(i64),
    /// Microseconds since 1970-01-01T00:00:00 UTC.
    Timestamptz(i64),
    /// UTF-8 string.
    String(String),
    /// 16-byte UUID.
    Uuid(Uuid),
    /// Fixed-length byte array.
    Fixed(Vec<u8>),
    /// Variable-length byte array.
    Binary(Vec<u8>),
}

impl Value {
    /// Compares two values of the same logical type. Returns `None` for
    /// mismatched variants or for float NaN (which never orders, and per
    /// spec §4.3 never participates in min/max).
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.partial_cmp(b),
            (Int(a), Int(b)) => a.partial_cmp(b),
            (Long(a), Long(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => {
                if a.is_nan() || b.is_nan() {
                    None
                } else {
                    a.partial_cmp(b)
                }
            }
            (Double(a), Double(b)) => {
                if a.is_nan() || b.is_nan() {
                    None
                } else {
                    a.partial_cmp(b)
                }
            }
            (Date(a), Date(b)) => a.partial_cmp(b),
            (Time(a), Time(b)) => a.partial_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.partial_cmp(b),
            (Timestamptz(a), Timestamptz(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            (Uuid(a), Uuid(b)) => a.partial_cmp(b),
            (Fixed(a), Fixed(b)) => a.partial_cmp(b),
            (Binary(a), Binary(b)) => a.partial_cmp(b),
            (Decimal(a), Decimal(b)) if a.scale() == b.scale() => {
                a.unscaled().partial_cmp(b.unscaled())
            }
            _ => None,
        }
    }

    /// True if this value is a NaN float/double, which is tracked separately
    /// from nulls and never updates min/max bounds (spec §4.3).
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan()) || matches!(self, Value::Double(f) if f.is_nan())
    }

    /// Renders this value as a canonical, stably-ordered JSON value, used as
    /// the lookup key for equality deletes (spec §4.5).
    pub fn to_canonical_json(&self) -> JsonValue {
        use Value::*;
        match self {
            Null => JsonValue::Null,
            Boolean(b) => JsonValue::Bool(*b),
            Int(i) => JsonValue::from(*i),
            Long(i) => JsonValue::from(*i),
            Float(f) => JsonValue::from(*f as f64),
            Double(f) => JsonValue::from(*f),
            Decimal(d) => JsonValue::String(format!("{}e-{}", d.unscaled(), d.scale())),
            Date(d) => JsonValue::from(*d),
            Time(t) => JsonValue::from(*t),
            Timestamp(t) => JsonValue::from(*t),
            Timestamptz(t) => JsonValue::from(*t),
            String(s) => JsonValue::String(s.clone()),
            Uuid(u) => JsonValue::String(u.to_string()),
            Fixed(b) | Binary(b) => JsonValue::String(hex::encode(b)),
        }
    }
}

/// Minimal hex encoding helper, avoiding a dependency on the `hex` crate for one call site.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Canonicalizes a tuple of named equality-delete field values into one
/// stable JSON object whose key order is the field name order, used as a
/// hash-map key by [crate::delete::equality::EqualityDeleteLookup].
pub fn canonical_row_key(fields: &[(String, Value)]) -> String {
    let mut obj = serde_json::Map::new();
    for (name, value) in fields {
        obj.insert(name.clone(), value.to_canonical_json());
    }
    serde_json::to_string(&JsonValue::Object(obj)).expect("serializing a JSON map cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_never_orders() {
        assert_eq!(Value::Double(f64::NAN).partial_compare(&Value::Double(1.0)), None);
    }

    #[test]
    fn test_canonical_row_key_stable_order() {
        let a = vec![
            ("name".to_string(), Value::String("Alice".to_string())),
            ("id".to_string(), Value::Int(1)),
        ];
        let b = vec![
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::String("Alice".to_string())),
        ];
        assert_eq!(canonical_row_key(&a), canonical_row_key(&b));
    }

    #[test]
    fn test_canonical_row_key_distinguishes_values() {
        let a = vec![("id".to_string(), Value::Int(1))];
        let b = vec![("id".to_string(), Value::Int(2))];
        assert_ne!(canonical_row_key(&a), canonical_row_key(&b));
    }
}
