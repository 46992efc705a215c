/*!
Canonical per-type encoding for the `lower-bounds`/`upper-bounds` statistics
maps (spec §4.3). This is a narrower wire format than [super::avro_value]'s
general Avro encoding: fixed-width little-endian for numerics, matching the
single-value (non-Avro-framed) binary literal encoding the Iceberg spec
defines for stats bounds.
*/

use crate::error::{IcebergError, Result};
use crate::types::{Decimal, PrimitiveType, Value};

/// Encodes `value` as its canonical statistics-bound byte representation.
pub fn encode_bound(value: &Value) -> Result<Vec<u8>> {
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Boolean(b) => vec![if *b { 1 } else { 0 }],
        Value::Int(i) => i.to_le_bytes().to_vec(),
        Value::Long(i) => i.to_le_bytes().to_vec(),
        Value::Float(f) => f.to_le_bytes().to_vec(),
        Value::Double(f) => f.to_le_bytes().to_vec(),
        Value::Decimal(d) => d.to_be_bytes(),
        Value::Date(d) => d.to_le_bytes().to_vec(),
        Value::Time(t) => t.to_le_bytes().to_vec(),
        Value::Timestamp(t) => t.to_le_bytes().to_vec(),
        Value::Timestamptz(t) => t.to_le_bytes().to_vec(),
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Uuid(u) => u.as_bytes().to_vec(),
        Value::Fixed(b) | Value::Binary(b) => b.clone(),
    })
}

/// Decodes a statistics-bound byte slice back into a [Value] of the given type.
pub fn decode_bound(bytes: &[u8], type_: &PrimitiveType) -> Result<Value> {
    fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
        bytes
            .try_into()
            .map_err(|_| IcebergError::InvalidInput(format!("bound for {what} must be {N} bytes")))
    }

    Ok(match type_ {
        PrimitiveType::Boolean => Value::Boolean(bytes.first().copied().unwrap_or(0) != 0),
        PrimitiveType::Int => Value::Int(i32::from_le_bytes(fixed(bytes, "int")?)),
        PrimitiveType::Long => Value::Long(i64::from_le_bytes(fixed(bytes, "long")?)),
        PrimitiveType::Float => Value::Float(f32::from_le_bytes(fixed(bytes, "float")?)),
        PrimitiveType::Double => Value::Double(f64::from_le_bytes(fixed(bytes, "double")?)),
        PrimitiveType::Decimal { precision, scale } => {
            Value::Decimal(Decimal::from_be_bytes(bytes, *precision, *scale)?)
        }
        PrimitiveType::Date => Value::Date(i32::from_le_bytes(fixed(bytes, "date")?)),
        PrimitiveType::Time => Value::Time(i64::from_le_bytes(fixed(bytes, "time")?)),
        PrimitiveType::Timestamp => Value::Timestamp(i64::from_le_bytes(fixed(bytes, "timestamp")?)),
        PrimitiveType::Timestamptz => Value::Timestamptz(i64::from_le_bytes(fixed(bytes, "timestamptz")?)),
        PrimitiveType::String => Value::String(
            String::from_utf8(bytes.to_vec()).map_err(|e| IcebergError::InvalidInput(e.to_string()))?,
        ),
        PrimitiveType::Uuid => {
            let raw: [u8; 16] = fixed(bytes, "uuid")?;
            Value::Uuid(uuid::Uuid::from_bytes(raw))
        }
        PrimitiveType::Fixed(_) => Value::Fixed(bytes.to_vec()),
        PrimitiveType::Binary => Value::Binary(bytes.to_vec()),
        other => {
            return Err(IcebergError::InvalidInput(format!(
                "{other} has no statistics-bound encoding"
            )))
        }
    })
}

/// Produces a truncated, still-valid upper bound for a string longer than
/// `max_len` characters (spec §4.3): truncate to `max_len` characters, then
/// increment the last character's code point so the result compares
/// strictly greater than any value sharing that prefix. Returns `None` if
/// the prefix cannot be incremented (every character is already
/// `char::MAX`), meaning no shorter upper bound exists and the original
/// value must be kept.
pub fn truncate_upper_bound_string(s: &str, max_len: usize) -> Option<String> {
    let mut chars: Vec<char> = s.chars().take(max_len).collect();
    if chars.len() < s.chars().count() {
        while let Some(&last) = chars.last() {
            if let Some(incremented) = char::from_u32(last as u32 + 1) {
                *chars.last_mut().unwrap() = incremented;
                return Some(chars.into_iter().collect());
            }
            chars.pop();
        }
        None
    } else {
        Some(s.to_string())
    }
}

/// Truncates a binary upper bound the same way: shorten to `max_len` bytes
/// then increment the last byte, carrying/popping on overflow.
pub fn truncate_upper_bound_bytes(bytes: &[u8], max_len: usize) -> Option<Vec<u8>> {
    if bytes.len() <= max_len {
        return Some(bytes.to_vec());
    }
    let mut out = bytes[..max_len].to_vec();
    while let Some(last) = out.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(out);
        }
        out.pop();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip() {
        let bytes = encode_bound(&Value::Int(-7)).unwrap();
        assert_eq!(decode_bound(&bytes, &PrimitiveType::Int).unwrap(), Value::Int(-7));
    }

    #[test]
    fn test_decimal_roundtrip() {
        let d = Decimal::new(num_bigint::BigInt::from(12345), 9, 2).unwrap();
        let bytes = encode_bound(&Value::Decimal(d.clone())).unwrap();
        let back = decode_bound(&bytes, &PrimitiveType::Decimal { precision: 9, scale: 2 }).unwrap();
        assert_eq!(back, Value::Decimal(d));
    }

    #[test]
    fn test_string_roundtrip() {
        let bytes = encode_bound(&Value::String("hello".to_string())).unwrap();
        assert_eq!(
            decode_bound(&bytes, &PrimitiveType::String).unwrap(),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn test_truncate_upper_bound_string_increments_last_char() {
        assert_eq!(
            truncate_upper_bound_string("abcdef", 3).unwrap(),
            "abd".to_string()
        );
    }

    #[test]
    fn test_truncate_upper_bound_string_keeps_short_values() {
        assert_eq!(truncate_upper_bound_string("ab", 3).unwrap(), "ab".to_string());
    }

    #[test]
    fn test_truncate_upper_bound_bytes_carries_on_overflow() {
        let bytes = vec![0x01, 0xff, 0xff];
        assert_eq!(truncate_upper_bound_bytes(&bytes, 2).unwrap(), vec![0x02]);
    }

    #[test]
    fn test_truncate_upper_bound_bytes_none_when_unincrementable() {
        let bytes = vec![0xff, 0xff, 0xff];
        assert!(truncate_upper_bound_bytes(&bytes, 2).is_none());
    }
}
