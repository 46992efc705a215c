/*!
The polymorphic [DataFile] entity and the [ManifestEntry] that wraps it
(spec §3.4). `content` is the discriminator tag (per design note §9):
a data file, a position-delete file, or an equality-delete file, modeled
as one struct rather than three, with the irrelevant fields left `None`.
*/

use std::collections::BTreeMap;

use crate::codec::avro_value::AvroValue;
use crate::error::{IcebergError, Result};
use crate::types::{AllType, Decimal, PartitionSpec, PrimitiveType, Schema, Value};

use crate::codec::manifest_schema::transform_result_type;

/// Tracks whether a manifest entry's file was pre-existing, newly added, or
/// deleted by the snapshot that wrote this manifest (spec §3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Carried over unchanged from a prior manifest.
    Existing,
    /// Added by the snapshot that wrote this manifest.
    Added,
    /// Logically removed by the snapshot that wrote this manifest.
    Deleted,
}

impl Status {
    /// The wire value used in the `status` Avro field.
    pub fn to_i32(self) -> i32 {
        match self {
            Status::Existing => 0,
            Status::Added => 1,
            Status::Deleted => 2,
        }
    }

    /// Parses the `status` Avro field's integer.
    pub fn from_i32(v: i32) -> Result<Self> {
        match v {
            0 => Ok(Status::Existing),
            1 => Ok(Status::Added),
            2 => Ok(Status::Deleted),
            other => Err(IcebergError::InvalidInput(format!(
                "unknown manifest entry status {other}"
            ))),
        }
    }
}

/// The content class of a data file (spec §3.4): the `content` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    /// An ordinary data file.
    Data,
    /// A position-delete file.
    PositionDeletes,
    /// An equality-delete file.
    EqualityDeletes,
}

impl Content {
    /// The wire value used in the `content` Avro field.
    pub fn to_i32(self) -> i32 {
        match self {
            Content::Data => 0,
            Content::PositionDeletes => 1,
            Content::EqualityDeletes => 2,
        }
    }

    /// Parses the `content` Avro field's integer.
    pub fn from_i32(v: i32) -> Result<Self> {
        match v {
            0 => Ok(Content::Data),
            1 => Ok(Content::PositionDeletes),
            2 => Ok(Content::EqualityDeletes),
            other => Err(IcebergError::InvalidInput(format!(
                "unknown data file content {other}"
            ))),
        }
    }
}

/// On-disk format of a data or delete file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Apache Parquet.
    Parquet,
    /// Avro object container file.
    Avro,
    /// Apache ORC.
    Orc,
}

impl FileFormat {
    /// Lowercase wire name, used both as the Avro `file_format` string and
    /// the manifest's `content` metadata key.
    pub fn as_str(self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
            FileFormat::Avro => "avro",
            FileFormat::Orc => "orc",
        }
    }

    /// Parses the lowercase wire name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "parquet" => Ok(FileFormat::Parquet),
            "avro" => Ok(FileFormat::Avro),
            "orc" => Ok(FileFormat::Orc),
            other => Err(IcebergError::InvalidInput(format!(
                "unknown file format {other}"
            ))),
        }
    }
}

/// A data, position-delete, or equality-delete file, as referenced by a
/// [ManifestEntry] (spec §3.4).
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// Content class discriminator.
    pub content: Content,
    /// Fully qualified path to the file.
    pub file_path: String,
    /// On-disk format.
    pub file_format: FileFormat,
    /// Partition tuple, one entry per field of the manifest's partition spec,
    /// `None` where the value is null.
    pub partition: Vec<Option<Value>>,
    /// Number of rows in the file.
    pub record_count: i64,
    /// File size in bytes.
    pub file_size_in_bytes: i64,
    /// Per-column on-disk size in bytes, keyed by field-id.
    pub column_sizes: Option<BTreeMap<i32, i64>>,
    /// Per-column value counts (including nulls), keyed by field-id.
    pub value_counts: Option<BTreeMap<i32, i64>>,
    /// Per-column null counts, keyed by field-id.
    pub null_value_counts: Option<BTreeMap<i32, i64>>,
    /// Per-column NaN counts, keyed by field-id.
    pub nan_value_counts: Option<BTreeMap<i32, i64>>,
    /// Per-column canonical-encoded lower bounds, keyed by field-id.
    pub lower_bounds: Option<BTreeMap<i32, Vec<u8>>>,
    /// Per-column canonical-encoded upper bounds, keyed by field-id.
    pub upper_bounds: Option<BTreeMap<i32, Vec<u8>>>,
    /// Implementation-specific encryption key metadata.
    pub key_metadata: Option<Vec<u8>>,
    /// Byte offsets of split boundaries, if the writer recorded any.
    pub split_offsets: Option<Vec<i64>>,
    /// Field-ids used for row equality, present only on equality-delete files (v2+).
    pub equality_ids: Option<Vec<i32>>,
    /// Sort order id under which the file's rows are physically sorted.
    pub sort_order_id: Option<i32>,
    /// v3: stable row-id of the first row, for row lineage.
    pub first_row_id: Option<i64>,
    /// v3 deletion vector: the data file this delete vector applies to.
    pub referenced_data_file: Option<String>,
    /// v3 deletion vector: byte offset of the Puffin blob.
    pub content_offset: Option<i64>,
    /// v3 deletion vector: byte length of the Puffin blob.
    pub content_size_in_bytes: Option<i64>,
}

impl DataFile {
    /// v3 deletion vectors require all three of `referenced_data_file`,
    /// `content_offset`, `content_size_in_bytes` together or none at all
    /// (spec §4.5).
    pub fn validate_deletion_vector(&self) -> Result<()> {
        let present = [
            self.referenced_data_file.is_some(),
            self.content_offset.is_some(),
            self.content_size_in_bytes.is_some(),
        ];
        if present.iter().any(|p| *p) && !present.iter().all(|p| *p) {
            return Err(IcebergError::InvalidInput(
                "deletion vector fields (referenced_data_file, content_offset, content_size_in_bytes) must all be present or all absent".to_string(),
            ));
        }
        Ok(())
    }
}

/// Converts a runtime [Value] into the [AvroValue] shape its Avro physical
/// type uses. Partition source types and bound encodings share this
/// mapping; the only case requiring a type hint on decode is `Decimal`'s
/// precision/scale and `Fixed`/`Binary`'s byte length, both recovered from
/// context the caller already has.
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
        Value::Time(t) => AvroValue::Long(*t),
        Value::Timestamp(t) => AvroValue::Long(*t),
        Value::Timestamptz(t) => AvroValue::Long(*t),
        Value::String(s) => AvroValue::String(s.clone()),
        Value::Uuid(u) => AvroValue::Bytes(u.as_bytes().to_vec()),
        Value::Fixed(b) | Value::Binary(b) => AvroValue::Bytes(b.clone()),
    }
}

/// Converts an [AvroValue] back into a [Value] of the given logical type.
fn avro_to_value(av: &AvroValue, type_: &PrimitiveType) -> Result<Value> {
    let mismatch = || {
        IcebergError::InvalidInput(format!("avro value {av:?} does not match type {type_}"))
    };
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

fn encode_partition(partition: &[Option<Value>], spec: &PartitionSpec) -> AvroValue {
    let fields = spec
        .fields
        .iter()
        .zip(partition.iter())
        .map(|(pf, v)| {
            let av = match v {
                None => AvroValue::Null,
                Some(val) => AvroValue::Some(Box::new(value_to_avro(val))),
            };
            (pf.name.clone(), av)
        })
        .collect();
    AvroValue::Record(fields)
}

fn decode_partition(av: &AvroValue, spec: &PartitionSpec, schema: &Schema) -> Result<Vec<Option<Value>>> {
    let AvroValue::Record(fields) = av else {
        return Err(IcebergError::InvalidInput("partition value must be a record".to_string()));
    };
    let mut out = Vec::with_capacity(spec.fields.len());
    for (pf, (_, fv)) in spec.fields.iter().zip(fields.iter()) {
        let source = schema.field_by_id(pf.source_id).ok_or_else(|| {
            IcebergError::InvalidInput(format!("unknown partition source id {}", pf.source_id))
        })?;
        let AllType::Primitive(source_type) = &source.field_type else {
            return Err(IcebergError::InvalidInput("partition source must be primitive".to_string()));
        };
        let result_type = transform_result_type(&pf.transform, source_type);
        let value = match fv {
            AvroValue::Null => None,
            AvroValue::Some(inner) => Some(avro_to_value(inner, &result_type)?),
            other => return Err(IcebergError::InvalidInput(format!("bad partition field value {other:?}"))),
        };
        out.push(value);
    }
    Ok(out)
}

fn encode_kv_i64(map: &BTreeMap<i32, i64>) -> AvroValue {
    AvroValue::Array(
        map.iter()
            .map(|(k, v)| AvroValue::Record(vec![("key".to_string(), AvroValue::Int(*k)), ("value".to_string(), AvroValue::Long(*v))]))
            .collect(),
    )
}

fn decode_kv_i64(av: &AvroValue) -> Result<BTreeMap<i32, i64>> {
    let AvroValue::Array(items) = av else {
        return Err(IcebergError::InvalidInput("expected kv array".to_string()));
    };
    let mut out = BTreeMap::new();
    for item in items {
        let key = item.get_field("key").and_then(|v| if let AvroValue::Int(i) = v { Some(*i) } else { None });
        let value = item.get_field("value").and_then(|v| if let AvroValue::Long(i) = v { Some(*i) } else { None });
        match (key, value) {
            (Some(k), Some(v)) => {
                out.insert(k, v);
            }
            _ => return Err(IcebergError::InvalidInput("malformed kv entry".to_string())),
        }
    }
    Ok(out)
}

fn encode_kv_bytes(map: &BTreeMap<i32, Vec<u8>>) -> AvroValue {
    AvroValue::Array(
        map.iter()
            .map(|(k, v)| {
                AvroValue::Record(vec![
                    ("key".to_string(), AvroValue::Int(*k)),
                    ("value".to_string(), AvroValue::Bytes(v.clone())),
                ])
            })
            .collect(),
    )
}

fn decode_kv_bytes(av: &AvroValue) -> Result<BTreeMap<i32, Vec<u8>>> {
    let AvroValue::Array(items) = av else {
        return Err(IcebergError::InvalidInput("expected kv array".to_string()));
    };
    let mut out = BTreeMap::new();
    for item in items {
        let key = item.get_field("key").and_then(|v| if let AvroValue::Int(i) = v { Some(*i) } else { None });
        let value = item.get_field("value").and_then(|v| if let AvroValue::Bytes(b) = v { Some(b.clone()) } else { None });
        match (key, value) {
            (Some(k), Some(v)) => {
                out.insert(k, v);
            }
            _ => return Err(IcebergError::InvalidInput("malformed kv entry".to_string())),
        }
    }
    Ok(out)
}

fn opt_nullable(v: &AvroValue) -> Result<Option<&AvroValue>> {
    match v {
        AvroValue::Null => Ok(None),
        AvroValue::Some(inner) => Ok(Some(inner.as_ref())),
        other => Err(IcebergError::InvalidInput(format!("expected nullable value, got {other:?}"))),
    }
}

fn nullable(v: Option<AvroValue>) -> AvroValue {
    match v {
        None => AvroValue::Null,
        Some(v) => AvroValue::Some(Box::new(v)),
    }
}

impl DataFile {
    /// Encodes this data file as the `data_file` record of spec §4.2,
    /// for the given partition spec and format version.
    pub fn to_avro_value(&self, spec: &PartitionSpec, format_version: u8) -> AvroValue {
        let mut fields = vec![
            ("content".to_string(), AvroValue::Int(self.content.to_i32())),
            ("file_path".to_string(), AvroValue::String(self.file_path.clone())),
            ("file_format".to_string(), AvroValue::String(self.file_format.as_str().to_string())),
            ("partition".to_string(), encode_partition(&self.partition, spec)),
            ("record_count".to_string(), AvroValue::Long(self.record_count)),
            ("file_size_in_bytes".to_string(), AvroValue::Long(self.file_size_in_bytes)),
            ("column_sizes".to_string(), nullable(self.column_sizes.as_ref().map(encode_kv_i64))),
            ("value_counts".to_string(), nullable(self.value_counts.as_ref().map(encode_kv_i64))),
            ("null_value_counts".to_string(), nullable(self.null_value_counts.as_ref().map(encode_kv_i64))),
            ("nan_value_counts".to_string(), nullable(self.nan_value_counts.as_ref().map(encode_kv_i64))),
            ("lower_bounds".to_string(), nullable(self.lower_bounds.as_ref().map(encode_kv_bytes))),
            ("upper_bounds".to_string(), nullable(self.upper_bounds.as_ref().map(encode_kv_bytes))),
            ("key_metadata".to_string(), nullable(self.key_metadata.clone().map(AvroValue::Bytes))),
            (
                "split_offsets".to_string(),
                nullable(
                    self.split_offsets
                        .as_ref()
                        .map(|v| AvroValue::Array(v.iter().map(|o| AvroValue::Long(*o)).collect())),
                ),
            ),
            (
                "equality_ids".to_string(),
                nullable(
                    self.equality_ids
                        .as_ref()
                        .map(|v| AvroValue::Array(v.iter().map(|i| AvroValue::Int(*i)).collect())),
                ),
            ),
            ("sort_order_id".to_string(), nullable(self.sort_order_id.map(AvroValue::Int))),
        ];
        if format_version >= 3 {
            fields.push(("first_row_id".to_string(), nullable(self.first_row_id.map(AvroValue::Long))));
            fields.push((
                "referenced_data_file".to_string(),
                nullable(self.referenced_data_file.clone().map(AvroValue::String)),
            ));
            fields.push(("content_offset".to_string(), nullable(self.content_offset.map(AvroValue::Long))));
            fields.push((
                "content_size_in_bytes".to_string(),
                nullable(self.content_size_in_bytes.map(AvroValue::Long)),
            ));
        }
        AvroValue::Record(fields)
    }

    /// Decodes a `data_file` record back into a [DataFile].
    pub fn from_avro_value(
        av: &AvroValue,
        spec: &PartitionSpec,
        schema: &Schema,
        format_version: u8,
    ) -> Result<DataFile> {
        let field = |name: &str| {
            av.get_field(name)
                .ok_or_else(|| IcebergError::InvalidInput(format!("data_file missing field {name}")))
        };
        let AvroValue::Int(content) = field("content")? else {
            return Err(IcebergError::InvalidInput("content must be int".to_string()));
        };
        let AvroValue::String(file_path) = field("file_path")? else {
            return Err(IcebergError::InvalidInput("file_path must be string".to_string()));
        };
        let AvroValue::String(file_format) = field("file_format")? else {
            return Err(IcebergError::InvalidInput("file_format must be string".to_string()));
        };
        let partition = decode_partition(field("partition")?, spec, schema)?;
        let AvroValue::Long(record_count) = field("record_count")? else {
            return Err(IcebergError::InvalidInput("record_count must be long".to_string()));
        };
        let AvroValue::Long(file_size_in_bytes) = field("file_size_in_bytes")? else {
            return Err(IcebergError::InvalidInput("file_size_in_bytes must be long".to_string()));
        };
        let column_sizes = opt_nullable(field("column_sizes")?)?.map(decode_kv_i64).transpose()?;
        let value_counts = opt_nullable(field("value_counts")?)?.map(decode_kv_i64).transpose()?;
        let null_value_counts = opt_nullable(field("null_value_counts")?)?.map(decode_kv_i64).transpose()?;
        let nan_value_counts = opt_nullable(field("nan_value_counts")?)?.map(decode_kv_i64).transpose()?;
        let lower_bounds = opt_nullable(field("lower_bounds")?)?.map(decode_kv_bytes).transpose()?;
        let upper_bounds = opt_nullable(field("upper_bounds")?)?.map(decode_kv_bytes).transpose()?;
        let key_metadata = opt_nullable(field("key_metadata")?)?
            .map(|v| match v {
                AvroValue::Bytes(b) => Ok(b.clone()),
                other => Err(IcebergError::InvalidInput(format!("bad key_metadata {other:?}"))),
            })
            .transpose()?;
        let split_offsets = opt_nullable(field("split_offsets")?)?
            .map(|v| match v {
                AvroValue::Array(items) => items
                    .iter()
                    .map(|i| match i {
                        AvroValue::Long(l) => Ok(*l),
                        other => Err(IcebergError::InvalidInput(format!("bad split offset {other:?}"))),
                    })
                    .collect::<Result<Vec<_>>>(),
                other => Err(IcebergError::InvalidInput(format!("bad split_offsets {other:?}"))),
            })
            .transpose()?;
        let equality_ids = opt_nullable(field("equality_ids")?)?
            .map(|v| match v {
                AvroValue::Array(items) => items
                    .iter()
                    .map(|i| match i {
                        AvroValue::Int(n) => Ok(*n),
                        other => Err(IcebergError::InvalidInput(format!("bad equality id {other:?}"))),
                    })
                    .collect::<Result<Vec<_>>>(),
                other => Err(IcebergError::InvalidInput(format!("bad equality_ids {other:?}"))),
            })
            .transpose()?;
        let sort_order_id = opt_nullable(field("sort_order_id")?)?
            .map(|v| match v {
                AvroValue::Int(i) => Ok(*i),
                other => Err(IcebergError::InvalidInput(format!("bad sort_order_id {other:?}"))),
            })
            .transpose()?;

        let (mut first_row_id, mut referenced_data_file, mut content_offset, mut content_size_in_bytes) =
            (None, None, None, None);
        if format_version >= 3 {
            first_row_id = opt_nullable(field("first_row_id")?)?
                .map(|v| match v {
                    AvroValue::Long(l) => Ok(*l),
                    other => Err(IcebergError::InvalidInput(format!("bad first_row_id {other:?}"))),
                })
                .transpose()?;
            referenced_data_file = opt_nullable(field("referenced_data_file")?)?
                .map(|v| match v {
                    AvroValue::String(s) => Ok(s.clone()),
                    other => Err(IcebergError::InvalidInput(format!("bad referenced_data_file {other:?}"))),
                })
                .transpose()?;
            content_offset = opt_nullable(field("content_offset")?)?
                .map(|v| match v {
                    AvroValue::Long(l) => Ok(*l),
                    other => Err(IcebergError::InvalidInput(format!("bad content_offset {other:?}"))),
                })
                .transpose()?;
            content_size_in_bytes = opt_nullable(field("content_size_in_bytes")?)?
                .map(|v| match v {
                    AvroValue::Long(l) => Ok(*l),
                    other => Err(IcebergError::InvalidInput(format!("bad content_size_in_bytes {other:?}"))),
                })
                .transpose()?;
        }

        Ok(DataFile {
            content: Content::from_i32(*content)?,
            file_path: file_path.clone(),
            file_format: FileFormat::parse(file_format)?,
            partition,
            record_count: *record_count,
            file_size_in_bytes: *file_size_in_bytes,
            column_sizes,
            value_counts,
            null_value_counts,
            nan_value_counts,
            lower_bounds,
            upper_bounds,
            key_metadata,
            split_offsets,
            equality_ids,
            sort_order_id,
            first_row_id,
            referenced_data_file,
            content_offset,
            content_size_in_bytes,
        })
    }
}

/// A manifest entry: one [DataFile] plus its tracking metadata (spec §3.4).
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Existing / added / deleted.
    pub status: Status,
    /// Snapshot id that wrote this entry. Inherited (left `None`) for
    /// existing entries carried over from a prior manifest.
    pub snapshot_id: Option<i64>,
    /// Data sequence number, inherited when `None`.
    pub sequence_number: Option<i64>,
    /// Sequence number of the snapshot that wrote the file itself (distinct
    /// from `sequence_number`, which tracks the row's data sequence).
    pub file_sequence_number: Option<i64>,
    /// The wrapped data, position-delete, or equality-delete file.
    pub data_file: DataFile,
}

impl ManifestEntry {
    /// Encodes this entry as a `manifest_entry` Avro record.
    pub fn to_avro_value(&self, spec: &PartitionSpec, format_version: u8) -> AvroValue {
        AvroValue::Record(vec![
            ("status".to_string(), AvroValue::Int(self.status.to_i32())),
            ("snapshot_id".to_string(), nullable(self.snapshot_id.map(AvroValue::Long))),
            ("sequence_number".to_string(), nullable(self.sequence_number.map(AvroValue::Long))),
            (
                "file_sequence_number".to_string(),
                nullable(self.file_sequence_number.map(AvroValue::Long)),
            ),
            ("data_file".to_string(), self.data_file.to_avro_value(spec, format_version)),
        ])
    }

    /// Decodes a `manifest_entry` Avro record.
    pub fn from_avro_value(
        av: &AvroValue,
        spec: &PartitionSpec,
        schema: &Schema,
        format_version: u8,
    ) -> Result<ManifestEntry> {
        let field = |name: &str| {
            av.get_field(name)
                .ok_or_else(|| IcebergError::InvalidInput(format!("manifest_entry missing field {name}")))
        };
        let AvroValue::Int(status) = field("status")? else {
            return Err(IcebergError::InvalidInput("status must be int".to_string()));
        };
        let snapshot_id = opt_nullable(field("snapshot_id")?)?
            .map(|v| match v {
                AvroValue::Long(l) => Ok(*l),
                other => Err(IcebergError::InvalidInput(format!("bad snapshot_id {other:?}"))),
            })
            .transpose()?;
        let sequence_number = opt_nullable(field("sequence_number")?)?
            .map(|v| match v {
                AvroValue::Long(l) => Ok(*l),
                other => Err(IcebergError::InvalidInput(format!("bad sequence_number {other:?}"))),
            })
            .transpose()?;
        let file_sequence_number = opt_nullable(field("file_sequence_number")?)?
            .map(|v| match v {
                AvroValue::Long(l) => Ok(*l),
                other => Err(IcebergError::InvalidInput(format!("bad file_sequence_number {other:?}"))),
            })
            .transpose()?;
        let data_file = DataFile::from_avro_value(field("data_file")?, spec, schema, format_version)?;
        Ok(ManifestEntry {
            status: Status::from_i32(*status)?,
            snapshot_id,
            sequence_number,
            file_sequence_number,
            data_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NestedField, AllType as AT, PartitionField, Struct, Transform};

    fn schema() -> Schema {
        Schema {
            schema_id: 0,
            identifier_field_ids: None,
            struct_fields: Struct {
                fields: vec![NestedField {
                    id: 1,
                    name: "id".to_string(),
                    required: true,
                    field_type: AT::Primitive(PrimitiveType::Long),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                }],
            },
        }
    }

    fn spec() -> PartitionSpec {
        PartitionSpec {
            spec_id: 0,
            fields: vec![PartitionField {
                source_id: 1,
                field_id: 1000,
                name: "id_bucket".to_string(),
                transform: Transform::Bucket(8),
            }],
        }
    }

    fn sample_file() -> DataFile {
        DataFile {
            content: Content::Data,
            file_path: "s3://b/data/part-001.parquet".to_string(),
            file_format: FileFormat::Parquet,
            partition: vec![Some(Value::Int(3))],
            record_count: 100,
            file_size_in_bytes: 1024,
            column_sizes: Some(BTreeMap::from([(1, 512)])),
            value_counts: Some(BTreeMap::from([(1, 100)])),
            null_value_counts: Some(BTreeMap::from([(1, 0)])),
            nan_value_counts: None,
            lower_bounds: Some(BTreeMap::from([(1, 1i64.to_le_bytes().to_vec())])),
            upper_bounds: Some(BTreeMap::from([(1, 100i64.to_le_bytes().to_vec())])),
            key_metadata: None,
            split_offsets: Some(vec![0, 512]),
            equality_ids: None,
            sort_order_id: None,
            first_row_id: None,
            referenced_data_file: None,
            content_offset: None,
            content_size_in_bytes: None,
        }
    }

    #[test]
    fn test_data_file_roundtrip_v2() {
        let file = sample_file();
        let av = file.to_avro_value(&spec(), 2);
        let back = DataFile::from_avro_value(&av, &spec(), &schema(), 2).unwrap();
        assert_eq!(file, back);
    }

    #[test]
    fn test_data_file_roundtrip_v3_with_deletion_vector() {
        let mut file = sample_file();
        file.content = Content::PositionDeletes;
        file.referenced_data_file = Some("part-001.parquet".to_string());
        file.content_offset = Some(4);
        file.content_size_in_bytes = Some(128);
        file.validate_deletion_vector().unwrap();
        let av = file.to_avro_value(&spec(), 3);
        let back = DataFile::from_avro_value(&av, &spec(), &schema(), 3).unwrap();
        assert_eq!(file, back);
    }

    #[test]
    fn test_deletion_vector_requires_all_three_fields() {
        let mut file = sample_file();
        file.content_offset = Some(4);
        assert!(file.validate_deletion_vector().is_err());
    }

    #[test]
    fn test_manifest_entry_roundtrip() {
        let entry = ManifestEntry {
            status: Status::Added,
            snapshot_id: Some(42),
            sequence_number: Some(3),
            file_sequence_number: Some(3),
            data_file: sample_file(),
        };
        let av = entry.to_avro_value(&spec(), 2);
        let back = ManifestEntry::from_avro_value(&av, &spec(), &schema(), 2).unwrap();
        assert_eq!(entry, back);
    }
}
