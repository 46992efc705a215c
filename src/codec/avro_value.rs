/*!
A tagged Avro type descriptor ([AvroSchema]) and value ([AvroValue]), with
encode/decode routines for exactly the primitive and complex wire shapes
Iceberg's manifest formats use (spec §4.2).

The encoder/decoder branch on the tagged [AvroSchema] rather than using
virtual dispatch per design note §9 — there is one recursive match, not a
trait per Avro type.
*/

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use crate::error::{IcebergError, Result};

use super::varint::{read_varint, write_varint};

/// A field within an [AvroSchema::Record], optionally carrying Iceberg's
/// `field-id` schema annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// Field name.
    pub name: String,
    /// Iceberg `field-id` property, when this field corresponds to a stable column id.
    pub field_id: Option<i64>,
    /// Field's Avro type.
    pub schema: AvroSchema,
}

impl RecordField {
    /// Convenience constructor for a field with no `field-id` annotation.
    pub fn new(name: &str, schema: AvroSchema) -> Self {
        RecordField {
            name: name.to_string(),
            field_id: None,
            schema,
        }
    }

    /// Convenience constructor for a field carrying a `field-id` annotation.
    pub fn with_id(name: &str, field_id: i64, schema: AvroSchema) -> Self {
        RecordField {
            name: name.to_string(),
            field_id: Some(field_id),
            schema,
        }
    }
}

/// A tagged Avro type descriptor covering exactly the shapes Iceberg needs.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    /// The Avro `null` type.
    Null,
    /// `boolean`.
    Boolean,
    /// `int`, 32-bit.
    Int,
    /// `long`, 64-bit.
    Long,
    /// `float`, IEEE-754 32-bit.
    Float,
    /// `double`, IEEE-754 64-bit.
    Double,
    /// `bytes`, a zig-zag length prefix followed by raw bytes.
    Bytes,
    /// `string`, a zig-zag length prefix followed by UTF-8 bytes.
    String,
    /// `fixed`, a named type of exactly `size` raw bytes.
    Fixed {
        /// Avro type name.
        name: String,
        /// Byte length.
        size: usize,
    },
    /// `array<items>`.
    Array(Box<AvroSchema>),
    /// `map<string, values>`.
    Map(Box<AvroSchema>),
    /// `["null", T]` — Iceberg's only union shape, used for optional fields.
    Nullable(Box<AvroSchema>),
    /// A named record with ordered, field-id-annotatable fields.
    Record {
        /// Avro type name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<RecordField>,
    },
}

impl AvroSchema {
    /// Renders this schema as Avro schema JSON, with Iceberg's `field-id`
    /// property attached to each annotated record field (spec §4.2).
    pub fn to_json(&self) -> JsonValue {
        match self {
            AvroSchema::Null => json!("null"),
            AvroSchema::Boolean => json!("boolean"),
            AvroSchema::Int => json!("int"),
            AvroSchema::Long => json!("long"),
            AvroSchema::Float => json!("float"),
            AvroSchema::Double => json!("double"),
            AvroSchema::Bytes => json!("bytes"),
            AvroSchema::String => json!("string"),
            AvroSchema::Fixed { name, size } => json!({
                "type": "fixed",
                "name": name,
                "size": size,
            }),
            AvroSchema::Array(items) => json!({
                "type": "array",
                "items": items.to_json(),
            }),
            AvroSchema::Map(values) => json!({
                "type": "map",
                "values": values.to_json(),
            }),
            AvroSchema::Nullable(inner) => json!(["null", inner.to_json()]),
            AvroSchema::Record { name, fields } => {
                let field_json: Vec<JsonValue> = fields
                    .iter()
                    .map(|f| {
                        let mut obj = serde_json::Map::new();
                        obj.insert("name".to_string(), json!(f.name));
                        obj.insert("type".to_string(), f.schema.to_json());
                        if let Some(id) = f.field_id {
                            obj.insert("field-id".to_string(), json!(id));
                        }
                        JsonValue::Object(obj)
                    })
                    .collect();
                json!({
                    "type": "record",
                    "name": name,
                    "fields": field_json,
                })
            }
        }
    }
}

/// A decoded/to-be-encoded Avro value, tagged to match [AvroSchema].
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    /// The Avro `null` value.
    Null,
    /// `boolean`.
    Boolean(bool),
    /// `int`.
    Int(i32),
    /// `long`.
    Long(i64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `bytes`/`fixed`.
    Bytes(Vec<u8>),
    /// `string`.
    String(String),
    /// `array`.
    Array(Vec<AvroValue>),
    /// `map`, preserving insertion order (Avro does not mandate key order).
    Map(Vec<(String, AvroValue)>),
    /// A present value inside a `["null", T]` union.
    Some(Box<AvroValue>),
    /// A `record`, field values in schema-declaration order.
    Record(Vec<(String, AvroValue)>),
}

impl AvroValue {
    /// Builds a record value from a name-keyed map, ordering fields to
    /// match `schema` (records encode positionally, not by name).
    pub fn record_from_fields(schema: &AvroSchema, values: BTreeMap<String, AvroValue>) -> Result<AvroValue> {
        let AvroSchema::Record { fields, name } = schema else {
            return Err(IcebergError::InvalidInput(
                "record_from_fields requires a Record schema".to_string(),
            ));
        };
        let mut ordered = Vec::with_capacity(fields.len());
        let mut values = values;
        for field in fields {
            let value = values.remove(&field.name).ok_or_else(|| {
                IcebergError::InvalidInput(format!(
                    "record {name} missing field {}",
                    field.name
                ))
            })?;
            ordered.push((field.name.clone(), value));
        }
        Ok(AvroValue::Record(ordered))
    }

    /// Looks up a field by name in a decoded [AvroValue::Record].
    pub fn get_field(&self, name: &str) -> Option<&AvroValue> {
        match self {
            AvroValue::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Encodes `value` according to `schema` and appends the result to `out`.
pub fn encode(schema: &AvroSchema, value: &AvroValue, out: &mut Vec<u8>) -> Result<()> {
    match (schema, value) {
        (AvroSchema::Null, AvroValue::Null) => Ok(()),
        (AvroSchema::Boolean, AvroValue::Boolean(b)) => {
            out.push(if *b { 1 } else { 0 });
            Ok(())
        }
        (AvroSchema::Int, AvroValue::Int(i)) => {
            write_varint(*i as i64, out);
            Ok(())
        }
        (AvroSchema::Long, AvroValue::Long(i)) => {
            write_varint(*i, out);
            Ok(())
        }
        (AvroSchema::Float, AvroValue::Float(f)) => {
            out.extend_from_slice(&f.to_le_bytes());
            Ok(())
        }
        (AvroSchema::Double, AvroValue::Double(f)) => {
            out.extend_from_slice(&f.to_le_bytes());
            Ok(())
        }
        (AvroSchema::String, AvroValue::String(s)) => {
            write_varint(s.len() as i64, out);
            out.extend_from_slice(s.as_bytes());
            Ok(())
        }
        (AvroSchema::Bytes, AvroValue::Bytes(b)) => {
            write_varint(b.len() as i64, out);
            out.extend_from_slice(b);
            Ok(())
        }
        (AvroSchema::Fixed { size, .. }, AvroValue::Bytes(b)) => {
            if b.len() != *size {
                return Err(IcebergError::InvalidInput(format!(
                    "fixed value has length {} but schema declares {size}",
                    b.len()
                )));
            }
            out.extend_from_slice(b);
            Ok(())
        }
        (AvroSchema::Array(items), AvroValue::Array(values)) => {
            if !values.is_empty() {
                write_varint(values.len() as i64, out);
                for v in values {
                    encode(items, v, out)?;
                }
            }
            write_varint(0, out);
            Ok(())
        }
        (AvroSchema::Map(values_schema), AvroValue::Map(entries)) => {
            if !entries.is_empty() {
                write_varint(entries.len() as i64, out);
                for (k, v) in entries {
                    write_varint(k.len() as i64, out);
                    out.extend_from_slice(k.as_bytes());
                    encode(values_schema, v, out)?;
                }
            }
            write_varint(0, out);
            Ok(())
        }
        (AvroSchema::Nullable(_), AvroValue::Null) => {
            write_varint(0, out);
            Ok(())
        }
        (AvroSchema::Nullable(inner), AvroValue::Some(v)) => {
            write_varint(1, out);
            encode(inner, v, out)
        }
        (AvroSchema::Record { fields, name }, AvroValue::Record(values)) => {
            if fields.len() != values.len() {
                return Err(IcebergError::InvalidInput(format!(
                    "record {name} expected {} fields, got {}",
                    fields.len(),
                    values.len()
                )));
            }
            for (field, (vname, value)) in fields.iter().zip(values.iter()) {
                if &field.name != vname {
                    return Err(IcebergError::InvalidInput(format!(
                        "record {name} field order mismatch: expected {} got {vname}",
                        field.name
                    )));
                }
                encode(&field.schema, value, out)?;
            }
            Ok(())
        }
        (s, v) => Err(IcebergError::InvalidInput(format!(
            "schema/value mismatch encoding {s:?} from {v:?}"
        ))),
    }
}

/// Decodes a value matching `schema` from `input`, advancing `pos`.
pub fn decode(schema: &AvroSchema, input: &[u8], pos: &mut usize) -> Result<AvroValue> {
    match schema {
        AvroSchema::Null => Ok(AvroValue::Null),
        AvroSchema::Boolean => {
            let b = *input
                .get(*pos)
                .ok_or_else(|| IcebergError::InvalidInput("truncated boolean".to_string()))?;
            *pos += 1;
            Ok(AvroValue::Boolean(b != 0))
        }
        AvroSchema::Int => Ok(AvroValue::Int(read_varint(input, pos)? as i32)),
        AvroSchema::Long => Ok(AvroValue::Long(read_varint(input, pos)?)),
        AvroSchema::Float => {
            let bytes: [u8; 4] = input
                .get(*pos..*pos + 4)
                .ok_or_else(|| IcebergError::InvalidInput("truncated float".to_string()))?
                .try_into()
                .unwrap();
            *pos += 4;
            Ok(AvroValue::Float(f32::from_le_bytes(bytes)))
        }
        AvroSchema::Double => {
            let bytes: [u8; 8] = input
                .get(*pos..*pos + 8)
                .ok_or_else(|| IcebergError::InvalidInput("truncated double".to_string()))?
                .try_into()
                .unwrap();
            *pos += 8;
            Ok(AvroValue::Double(f64::from_le_bytes(bytes)))
        }
        AvroSchema::String => {
            let len = read_varint(input, pos)? as usize;
            let bytes = input
                .get(*pos..*pos + len)
                .ok_or_else(|| IcebergError::InvalidInput("truncated string".to_string()))?;
            let s = String::from_utf8(bytes.to_vec())
                .map_err(|e| IcebergError::InvalidInput(e.to_string()))?;
            *pos += len;
            Ok(AvroValue::String(s))
        }
        AvroSchema::Bytes => {
            let len = read_varint(input, pos)? as usize;
            let bytes = input
                .get(*pos..*pos + len)
                .ok_or_else(|| IcebergError::InvalidInput("truncated bytes".to_string()))?;
            *pos += len;
            Ok(AvroValue::Bytes(bytes.to_vec()))
        }
        AvroSchema::Fixed { size, .. } => {
            let bytes = input
                .get(*pos..*pos + size)
                .ok_or_else(|| IcebergError::InvalidInput("truncated fixed".to_string()))?;
            *pos += size;
            Ok(AvroValue::Bytes(bytes.to_vec()))
        }
        AvroSchema::Array(items) => {
            let mut out = Vec::new();
            loop {
                let count = read_varint(input, pos)?;
                if count == 0 {
                    break;
                }
                // negative count means a block-size follows; consume it though
                // this encoder never emits negative counts.
                let n = count.unsigned_abs();
                if count < 0 {
                    let _size = read_varint(input, pos)?;
                }
                for _ in 0..n {
                    out.push(decode(items, input, pos)?);
                }
            }
            Ok(AvroValue::Array(out))
        }
        AvroSchema::Map(values_schema) => {
            let mut out = Vec::new();
            loop {
                let count = read_varint(input, pos)?;
                if count == 0 {
                    break;
                }
                let n = count.unsigned_abs();
                if count < 0 {
                    let _size = read_varint(input, pos)?;
                }
                for _ in 0..n {
                    let klen = read_varint(input, pos)? as usize;
                    let kbytes = input
                        .get(*pos..*pos + klen)
                        .ok_or_else(|| IcebergError::InvalidInput("truncated map key".to_string()))?;
                    let key = String::from_utf8(kbytes.to_vec())
                        .map_err(|e| IcebergError::InvalidInput(e.to_string()))?;
                    *pos += klen;
                    let value = decode(values_schema, input, pos)?;
                    out.push((key, value));
                }
            }
            Ok(AvroValue::Map(out))
        }
        AvroSchema::Nullable(inner) => {
            let branch = read_varint(input, pos)?;
            match branch {
                0 => Ok(AvroValue::Null),
                1 => Ok(AvroValue::Some(Box::new(decode(inner, input, pos)?))),
                other => Err(IcebergError::InvalidInput(format!(
                    "unexpected union branch {other}"
                ))),
            }
        }
        AvroSchema::Record { fields, .. } => {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                values.push((field.name.clone(), decode(&field.schema, input, pos)?));
            }
            Ok(AvroValue::Record(values))
        }
    }
}
