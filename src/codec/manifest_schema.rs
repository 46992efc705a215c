/*!
Builds the concrete Avro record schema for Iceberg's `manifest_entry`
object type (spec §4.2), including the per-partition-spec partition
struct generated at encode time.

Column-id-keyed maps (`column_sizes`, `value_counts`, ...) are Avro
`array<record{key,value}>`, not the native Avro `map` type, because their
keys are Iceberg field ids (integers) rather than strings — matching how
the real Iceberg Avro schemas represent them.
*/

use crate::error::{IcebergError, Result};
use crate::types::{AllType, PartitionSpec, PrimitiveType, Schema, Transform};

use super::avro_value::{AvroSchema, RecordField};

/// Iceberg v3 format version; schemas below this value omit the v3-only fields.
pub const FORMAT_VERSION_V3: u8 = 3;

fn primitive_to_avro(p: &PrimitiveType) -> AvroSchema {
    match p {
        PrimitiveType::Boolean => AvroSchema::Boolean,
        PrimitiveType::Int => AvroSchema::Int,
        PrimitiveType::Long => AvroSchema::Long,
        PrimitiveType::Float => AvroSchema::Float,
        PrimitiveType::Double => AvroSchema::Double,
        PrimitiveType::Decimal { .. } => AvroSchema::Bytes,
        PrimitiveType::Date => AvroSchema::Int,
        PrimitiveType::Time => AvroSchema::Long,
        PrimitiveType::Timestamp
        | PrimitiveType::Timestamptz
        | PrimitiveType::TimestampNs
        | PrimitiveType::TimestamptzNs => AvroSchema::Long,
        PrimitiveType::String => AvroSchema::String,
        PrimitiveType::Uuid => AvroSchema::Fixed {
            name: "uuid_fixed".to_string(),
            size: 16,
        },
        PrimitiveType::Fixed(l) => AvroSchema::Fixed {
            name: format!("fixed_{l}"),
            size: *l as usize,
        },
        PrimitiveType::Binary => AvroSchema::Bytes,
        PrimitiveType::Variant => AvroSchema::Bytes,
        PrimitiveType::Unknown => AvroSchema::Null,
        PrimitiveType::Geometry { .. } | PrimitiveType::Geography { .. } => AvroSchema::Bytes,
    }
}

/// The Avro type a [Transform] produces when applied to a `source` primitive
/// (spec §3.3): bucket/year/month/hour produce `int`, day produces the
/// date type, identity/truncate/void preserve the source type.
pub(crate) fn transform_result_type(transform: &Transform, source: &PrimitiveType) -> PrimitiveType {
    match transform {
        Transform::Bucket(_) | Transform::Year | Transform::Month | Transform::Hour => {
            PrimitiveType::Int
        }
        Transform::Day => PrimitiveType::Date,
        Transform::Identity | Transform::Truncate(_) | Transform::Void => source.clone(),
    }
}

/// Generates the partition-tuple record for one partition spec, resolving
/// each field's result type against the schema's source column.
pub fn partition_struct_schema(spec: &PartitionSpec, schema: &Schema) -> Result<AvroSchema> {
    let mut fields = Vec::with_capacity(spec.fields.len());
    for pf in &spec.fields {
        let source = schema.field_by_id(pf.source_id).ok_or_else(|| {
            IcebergError::InvalidInput(format!(
                "partition field {} references unknown source id {}",
                pf.name, pf.source_id
            ))
        })?;
        let AllType::Primitive(source_type) = &source.field_type else {
            return Err(IcebergError::InvalidInput(format!(
                "partition source field {} must be primitive",
                pf.name
            )));
        };
        let result_type = transform_result_type(&pf.transform, source_type);
        fields.push(RecordField::with_id(
            &pf.name,
            pf.field_id as i64,
            AvroSchema::Nullable(Box::new(primitive_to_avro(&result_type))),
        ));
    }
    Ok(AvroSchema::Record {
        name: format!("r{}_partition", spec.spec_id),
        fields,
    })
}

fn kv_array(name: &str, key_field_id: i64, value_field_id: i64, value: AvroSchema) -> AvroSchema {
    AvroSchema::Array(Box::new(AvroSchema::Record {
        name: name.to_string(),
        fields: vec![
            RecordField::with_id("key", key_field_id, AvroSchema::Int),
            RecordField::with_id("value", value_field_id, value),
        ],
    }))
}

/// Generates the `data_file` record used inside `manifest_entry`, varying
/// by format version (spec §3.4, §4.2).
pub fn data_file_schema(format_version: u8, partition_schema: AvroSchema) -> AvroSchema {
    let mut fields = vec![
        RecordField::with_id("content", 134, AvroSchema::Int),
        RecordField::with_id("file_path", 100, AvroSchema::String),
        RecordField::with_id("file_format", 101, AvroSchema::String),
        RecordField::with_id("partition", 102, partition_schema),
        RecordField::with_id("record_count", 103, AvroSchema::Long),
        RecordField::with_id("file_size_in_bytes", 104, AvroSchema::Long),
        RecordField::with_id(
            "column_sizes",
            108,
            AvroSchema::Nullable(Box::new(kv_array(
                "k117_v118",
                117,
                118,
                AvroSchema::Long,
            ))),
        ),
        RecordField::with_id(
            "value_counts",
            109,
            AvroSchema::Nullable(Box::new(kv_array(
                "k119_v120",
                119,
                120,
                AvroSchema::Long,
            ))),
        ),
        RecordField::with_id(
            "null_value_counts",
            110,
            AvroSchema::Nullable(Box::new(kv_array(
                "k121_v122",
                121,
                122,
                AvroSchema::Long,
            ))),
        ),
        RecordField::with_id(
            "nan_value_counts",
            137,
            AvroSchema::Nullable(Box::new(kv_array(
                "k138_v139",
                138,
                139,
                AvroSchema::Long,
            ))),
        ),
        RecordField::with_id(
            "lower_bounds",
            125,
            AvroSchema::Nullable(Box::new(kv_array(
                "k126_v127",
                126,
                127,
                AvroSchema::Bytes,
            ))),
        ),
        RecordField::with_id(
            "upper_bounds",
            128,
            AvroSchema::Nullable(Box::new(kv_array(
                "k129_v130",
                129,
                130,
                AvroSchema::Bytes,
            ))),
        ),
        RecordField::with_id("key_metadata", 131, AvroSchema::Nullable(Box::new(AvroSchema::Bytes))),
        RecordField::with_id(
            "split_offsets",
            132,
            AvroSchema::Nullable(Box::new(AvroSchema::Array(Box::new(AvroSchema::Long)))),
        ),
        RecordField::with_id(
            "equality_ids",
            135,
            AvroSchema::Nullable(Box::new(AvroSchema::Array(Box::new(AvroSchema::Int)))),
        ),
        RecordField::with_id("sort_order_id", 140, AvroSchema::Nullable(Box::new(AvroSchema::Int))),
    ];
    if format_version >= FORMAT_VERSION_V3 {
        fields.push(RecordField::with_id(
            "first_row_id",
            142,
            AvroSchema::Nullable(Box::new(AvroSchema::Long)),
        ));
        fields.push(RecordField::with_id(
            "referenced_data_file",
            143,
            AvroSchema::Nullable(Box::new(AvroSchema::String)),
        ));
        fields.push(RecordField::with_id(
            "content_offset",
            144,
            AvroSchema::Nullable(Box::new(AvroSchema::Long)),
        ));
        fields.push(RecordField::with_id(
            "content_size_in_bytes",
            145,
            AvroSchema::Nullable(Box::new(AvroSchema::Long)),
        ));
    }
    AvroSchema::Record {
        name: "data_file".to_string(),
        fields,
    }
}

/// Generates the `manifest_entry` record that wraps a `data_file` with
/// status/snapshot/sequence tracking (spec §3.4).
pub fn manifest_entry_schema(format_version: u8, partition_schema: AvroSchema) -> AvroSchema {
    AvroSchema::Record {
        name: "manifest_entry".to_string(),
        fields: vec![
            RecordField::with_id("status", 0, AvroSchema::Int),
            RecordField::with_id("snapshot_id", 1, AvroSchema::Nullable(Box::new(AvroSchema::Long))),
            RecordField::with_id(
                "sequence_number",
                3,
                AvroSchema::Nullable(Box::new(AvroSchema::Long)),
            ),
            RecordField::with_id(
                "file_sequence_number",
                4,
                AvroSchema::Nullable(Box::new(AvroSchema::Long)),
            ),
            RecordField::with_id("data_file", 2, data_file_schema(format_version, partition_schema)),
        ],
    }
}
