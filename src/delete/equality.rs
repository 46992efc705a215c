/*!
Equality deletes: rows identified by a set of `equality-ids[]` resolved
against the table schema, matching any data row whose named fields equal
the delete row's values (spec §4.5).
*/

use std::collections::BTreeMap;

use crate::codec::avro_value::{AvroSchema, AvroValue, RecordField};
use crate::codec::bounds::encode_bound;
use crate::codec::ContainerWriter;
use crate::error::{IcebergError, Result};
use crate::stats::ColumnStatsCollector;
use crate::types::{AllType, Decimal, PrimitiveType, Schema, Value};

fn primitive_to_avro_schema(p: &PrimitiveType) -> AvroSchema {
    match p {
        PrimitiveType::Boolean => AvroSchema::Boolean,
        PrimitiveType::Int => AvroSchema::Int,
        PrimitiveType::Long => AvroSchema::Long,
        PrimitiveType::Float => AvroSchema::Float,
        PrimitiveType::Double => AvroSchema::Double,
        PrimitiveType::Date => AvroSchema::Int,
        PrimitiveType::Time
        | PrimitiveType::Timestamp
        | PrimitiveType::Timestamptz
        | PrimitiveType::TimestampNs
        | PrimitiveType::TimestamptzNs => AvroSchema::Long,
        PrimitiveType::String => AvroSchema::String,
        PrimitiveType::Decimal { .. } | PrimitiveType::Binary | PrimitiveType::Variant => AvroSchema::Bytes,
        PrimitiveType::Uuid => AvroSchema::Fixed {
            name: "uuid_fixed".to_string(),
            size: 16,
        },
        PrimitiveType::Fixed(l) => AvroSchema::Fixed {
            name: format!("fixed_{l}"),
            size: *l as usize,
        },
        PrimitiveType::Unknown => AvroSchema::Null,
        PrimitiveType::Geometry { .. } | PrimitiveType::Geography { .. } => AvroSchema::Bytes,
    }
}

fn value_to_avro(value: &Value) -> AvroValue {
    match value {
        Value::Null => AvroValue::Null,
        Value::Boolean(b) => AvroValue::Boolean(*b),
        Value::Int(i) => AvroValue::Int(*i),
        Value::Long(i) => AvroValue::Long(*i),
        Value::Float(f) => AvroValue::Float(*f),
        Value::Double(f) => AvroValue::Double(*f),
        Value::Decimal(d) => AvroValue::Bytes(d.to_be_bytes()),
        Value::Date(d) => AvroValue::Int(*d),
        Value::Time(t) | Value::Timestamp(t) | Value::Timestamptz(t) => AvroValue::Long(*t),
        Value::String(s) => AvroValue::String(s.clone()),
        Value::Uuid(u) => AvroValue::Bytes(u.as_bytes().to_vec()),
        Value::Fixed(b) | Value::Binary(b) => AvroValue::Bytes(b.clone()),
    }
}

fn avro_to_value(av: &AvroValue, type_: &PrimitiveType) -> Result<Value> {
    let mismatch = || IcebergError::InvalidInput(format!("avro value {av:?} does not match type {type_}"));
    Ok(match (type_, av) {
        (PrimitiveType::Boolean, AvroValue::Boolean(b)) => Value::Boolean(*b),
        (PrimitiveType::Int, AvroValue::Int(i)) => Value::Int(*i),
        (PrimitiveType::Long, AvroValue::Long(i)) => Value::Long(*i),
        (PrimitiveType::Float, AvroValue::Float(f)) => Value::Float(*f),
        (PrimitiveType::Double, AvroValue::Double(f)) => Value::Double(*f),
        (PrimitiveType::Decimal { precision, scale }, AvroValue::Bytes(b)) => {
            Value::Decimal(Decimal::from_be_bytes(b, *precision, *scale)?)
        }
        (PrimitiveType::Date, AvroValue::Int(i)) => Value::Date(*i),
        (PrimitiveType::Time, AvroValue::Long(i)) => Value::Time(*i),
        (PrimitiveType::Timestamp, AvroValue::Long(i)) => Value::Timestamp(*i),
        (PrimitiveType::Timestamptz, AvroValue::Long(i)) => Value::Timestamptz(*i),
        (PrimitiveType::String, AvroValue::String(s)) => Value::String(s.clone()),
        (PrimitiveType::Uuid, AvroValue::Bytes(b)) => {
            Value::Uuid(uuid::Uuid::from_slice(b).map_err(|e| IcebergError::InvalidInput(e.to_string()))?)
        }
        (PrimitiveType::Fixed(_), AvroValue::Bytes(b)) => Value::Fixed(b.clone()),
        (PrimitiveType::Binary, AvroValue::Bytes(b)) => Value::Binary(b.clone()),
        _ => return Err(mismatch()),
    })
}

/// One equality-delete field: its resolved name, field-id, and type.
#[derive(Debug, Clone)]
struct EqualityField {
    id: i32,
    name: String,
    type_: PrimitiveType,
}

/// Manifest-facing metadata for a written equality-delete file (spec §4.5,
/// content class 2).
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityDeleteFile {
    /// Path to the delete file.
    pub file_path: String,
    /// Size of the serialized delete file in bytes.
    pub file_size_in_bytes: i64,
    /// Number of delete rows.
    pub record_count: i64,
    /// Sequence number every row in this delete file shares.
    pub sequence_number: i64,
    /// Field-ids used for row equality.
    pub equality_ids: Vec<i32>,
    /// Per-field null counts, keyed by field-id.
    pub null_value_counts: BTreeMap<i32, i64>,
    /// Per-field canonical-encoded lower bounds, keyed by field-id.
    pub lower_bounds: BTreeMap<i32, Vec<u8>>,
    /// Per-field canonical-encoded upper bounds, keyed by field-id.
    pub upper_bounds: BTreeMap<i32, Vec<u8>>,
}

/// Accumulates rows identified by `equality-ids[]` and emits an
/// equality-delete file (spec §4.5).
pub struct EqualityDeleteBuilder {
    sequence_number: i64,
    fields: Vec<EqualityField>,
    rows: Vec<Vec<Value>>,
    collectors: Vec<ColumnStatsCollector>,
}

impl EqualityDeleteBuilder {
    /// Resolves `equality_ids` against `schema`'s top-level fields and
    /// creates a builder for deletes written at `sequence_number`.
    pub fn new(schema: &Schema, equality_ids: &[i32], sequence_number: i64) -> Result<Self> {
        let mut fields = Vec::with_capacity(equality_ids.len());
        let mut collectors = Vec::with_capacity(equality_ids.len());
        for &id in equality_ids {
            let field = schema.field_by_id(id).ok_or_else(|| {
                IcebergError::InvalidInput(format!("equality id {id} not found in schema"))
            })?;
            let AllType::Primitive(type_) = &field.field_type else {
                return Err(IcebergError::InvalidInput(format!(
                    "equality field {} must be primitive",
                    field.name
                )));
            };
            collectors.push(ColumnStatsCollector::new(id, type_.clone()));
            fields.push(EqualityField {
                id,
                name: field.name.clone(),
                type_: type_.clone(),
            });
        }
        Ok(EqualityDeleteBuilder {
            sequence_number,
            fields,
            rows: Vec::new(),
            collectors,
        })
    }

    /// Adds one row, keyed by field name. Rejects a row missing any
    /// equality field; extra, non-equality columns are dropped.
    pub fn add_row(&mut self, row: &BTreeMap<String, Value>) -> Result<()> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (field, collector) in self.fields.iter().zip(self.collectors.iter_mut()) {
            let value = row.get(&field.name).ok_or_else(|| {
                IcebergError::InvalidInput(format!(
                    "row missing equality field {}",
                    field.name
                ))
            })?;
            collector.update(value);
            values.push(value.clone());
        }
        self.rows.push(values);
        Ok(())
    }

    /// Number of buffered rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows have been buffered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn record_schema(&self) -> AvroSchema {
        AvroSchema::Record {
            name: "equality_delete".to_string(),
            fields: self
                .fields
                .iter()
                .map(|f| RecordField::with_id(&f.name, f.id as i64, primitive_to_avro_schema(&f.type_)))
                .collect(),
        }
    }

    /// Serializes the buffered rows into an Avro container, returning the
    /// bytes plus the manifest-facing metadata (counts, bounds, null counts).
    pub fn build(self, file_path: String, upper_bound_truncate_len: usize) -> Result<(Vec<u8>, EqualityDeleteFile)> {
        let schema = self.record_schema();
        let mut writer = ContainerWriter::new(&schema);
        for row in &self.rows {
            let fields = self
                .fields
                .iter()
                .zip(row.iter())
                .map(|(f, v)| (f.name.clone(), value_to_avro(v)))
                .collect();
            writer.append(&AvroValue::Record(fields))?;
        }
        let record_count = self.rows.len() as i64;
        let equality_ids: Vec<i32> = self.fields.iter().map(|f| f.id).collect();
        let mut null_value_counts = BTreeMap::new();
        let mut lower_bounds = BTreeMap::new();
        let mut upper_bounds = BTreeMap::new();
        for collector in &self.collectors {
            let stats = collector.finalize(upper_bound_truncate_len)?;
            if stats.null_count > 0 {
                null_value_counts.insert(stats.field_id, stats.null_count);
            }
            if let Some(b) = stats.lower_bound {
                lower_bounds.insert(stats.field_id, b);
            }
            if let Some(b) = stats.upper_bound {
                upper_bounds.insert(stats.field_id, b);
            }
        }
        let sequence_number_str = self.sequence_number.to_string();
        let bytes = writer.finish(&[("content", "equality-deletes"), ("sequence-number", &sequence_number_str)]);
        let metadata = EqualityDeleteFile {
            file_size_in_bytes: bytes.len() as i64,
            record_count,
            sequence_number: self.sequence_number,
            equality_ids,
            null_value_counts,
            lower_bounds,
            upper_bounds,
            file_path,
        };
        Ok((bytes, metadata))
    }
}

/// Indexes equality-delete rows by their canonicalized field values for
/// O(1) membership checks on the read side (spec §4.5).
#[derive(Debug, Clone)]
pub struct EqualityDeleteLookup {
    sequence_number: i64,
    keys: std::collections::HashSet<String>,
}

impl EqualityDeleteLookup {
    /// Builds a lookup from decoded rows (already resolved to `(name, value)`
    /// pairs), all sharing `sequence_number`.
    pub fn new(sequence_number: i64, rows: &[Vec<(String, Value)>]) -> Self {
        let keys = rows.iter().map(|r| crate::types::canonical_row_key(r)).collect();
        EqualityDeleteLookup { sequence_number, keys }
    }

    /// Parses a lookup directly from an equality-delete file's Avro bytes.
    pub fn from_container(bytes: &[u8], fields: &[(i32, String, PrimitiveType)], sequence_number: i64) -> Result<Self> {
        let schema = AvroSchema::Record {
            name: "equality_delete".to_string(),
            fields: fields
                .iter()
                .map(|(id, name, type_)| RecordField::with_id(name, *id as i64, primitive_to_avro_schema(type_)))
                .collect(),
        };
        let reader = crate::codec::ContainerReader::parse(bytes)?;
        let records = reader.read_records(&schema)?;
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let mut row = Vec::with_capacity(fields.len());
            for (_, name, type_) in fields {
                let av = record
                    .get_field(name)
                    .ok_or_else(|| IcebergError::InvalidInput(format!("missing equality field {name}")))?;
                row.push((name.clone(), avro_to_value(av, type_)?));
            }
            rows.push(row);
        }
        Ok(Self::new(sequence_number, &rows))
    }

    /// Whether a row's equality-field values match a buffered delete.
    pub fn is_deleted(&self, row_values: &[(String, Value)]) -> bool {
        self.keys.contains(&crate::types::canonical_row_key(row_values))
    }

    /// The sequence number shared by every delete this lookup indexes.
    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NestedField, Struct};

    fn schema() -> Schema {
        Schema {
            schema_id: 0,
            identifier_field_ids: None,
            struct_fields: Struct {
                fields: vec![
                    NestedField {
                        id: 1,
                        name: "id".to_string(),
                        required: true,
                        field_type: AllType::Primitive(PrimitiveType::Int),
                        doc: None,
                        initial_default: None,
                        write_default: None,
                    },
                    NestedField {
                        id: 2,
                        name: "name".to_string(),
                        required: false,
                        field_type: AllType::Primitive(PrimitiveType::String),
                        doc: None,
                        initial_default: None,
                        write_default: None,
                    },
                ],
            },
        }
    }

    #[test]
    fn test_rejects_row_missing_equality_field() {
        let mut b = EqualityDeleteBuilder::new(&schema(), &[1, 2], 3).unwrap();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::Int(1));
        assert!(b.add_row(&row).is_err());
    }

    #[test]
    fn test_build_and_lookup_roundtrip() {
        let mut b = EqualityDeleteBuilder::new(&schema(), &[1, 2], 3).unwrap();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("name".to_string(), Value::String("alice".to_string()));
        row.insert("extra".to_string(), Value::Boolean(true));
        b.add_row(&row).unwrap();
        let (bytes, meta) = b.build("metadata/eq-delete-1.avro".to_string(), 16).unwrap();
        assert_eq!(meta.record_count, 1);
        assert_eq!(meta.equality_ids, vec![1, 2]);

        let fields = vec![(1, "id".to_string(), PrimitiveType::Int), (2, "name".to_string(), PrimitiveType::String)];
        let lookup = EqualityDeleteLookup::from_container(&bytes, &fields, 3).unwrap();
        let key = vec![("id".to_string(), Value::Int(1)), ("name".to_string(), Value::String("alice".to_string()))];
        assert!(lookup.is_deleted(&key));
        let other = vec![("id".to_string(), Value::Int(2)), ("name".to_string(), Value::String("bob".to_string()))];
        assert!(!lookup.is_deleted(&other));
        assert_eq!(lookup.sequence_number(), 3);
    }
}
