/*!
Builds the concrete Avro record schema for Iceberg's `manifest_file`
object type (spec §3.5, §4.2) — the row shape of a manifest-list file.
*/

use super::avro_value::{AvroSchema, RecordField};

/// Iceberg v3 format version; schemas below this value omit the v3-only fields.
pub const FORMAT_VERSION_V3: u8 = 3;

fn field_summary_schema() -> AvroSchema {
    AvroSchema::Record {
        name: "field_summary".to_string(),
        fields: vec![
            RecordField::with_id("contains_null", 509, AvroSchema::Boolean),
            RecordField::with_id(
                "contains_nan",
                518,
                AvroSchema::Nullable(Box::new(AvroSchema::Boolean)),
            ),
            RecordField::with_id("lower_bound", 510, AvroSchema::Nullable(Box::new(AvroSchema::Bytes))),
            RecordField::with_id("upper_bound", 511, AvroSchema::Nullable(Box::new(AvroSchema::Bytes))),
        ],
    }
}

/// Generates the `manifest_file` record written into manifest-list files.
pub fn manifest_file_schema(format_version: u8) -> AvroSchema {
    let mut fields = vec![
        RecordField::with_id("manifest_path", 500, AvroSchema::String),
        RecordField::with_id("manifest_length", 501, AvroSchema::Long),
        RecordField::with_id("partition_spec_id", 502, AvroSchema::Int),
        RecordField::with_id("content", 517, AvroSchema::Int),
        RecordField::with_id("sequence_number", 515, AvroSchema::Long),
        RecordField::with_id("min_sequence_number", 516, AvroSchema::Long),
        RecordField::with_id("added_snapshot_id", 503, AvroSchema::Long),
        RecordField::with_id("added_files_count", 504, AvroSchema::Nullable(Box::new(AvroSchema::Int))),
        RecordField::with_id(
            "existing_files_count",
            505,
            AvroSchema::Nullable(Box::new(AvroSchema::Int)),
        ),
        RecordField::with_id(
            "deleted_files_count",
            506,
            AvroSchema::Nullable(Box::new(AvroSchema::Int)),
        ),
        RecordField::with_id("added_rows_count", 512, AvroSchema::Nullable(Box::new(AvroSchema::Long))),
        RecordField::with_id(
            "existing_rows_count",
            513,
            AvroSchema::Nullable(Box::new(AvroSchema::Long)),
        ),
        RecordField::with_id(
            "deleted_rows_count",
            514,
            AvroSchema::Nullable(Box::new(AvroSchema::Long)),
        ),
        RecordField::with_id(
            "partitions",
            507,
            AvroSchema::Nullable(Box::new(AvroSchema::Array(Box::new(field_summary_schema())))),
        ),
        RecordField::with_id("key_metadata", 520, AvroSchema::Nullable(Box::new(AvroSchema::Bytes))),
    ];
    if format_version >= FORMAT_VERSION_V3 {
        fields.push(RecordField::with_id(
            "first_row_id",
            519,
            AvroSchema::Nullable(Box::new(AvroSchema::Long)),
        ));
    }
    AvroSchema::Record {
        name: "manifest_file".to_string(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v3_adds_first_row_id() {
        let AvroSchema::Record { fields: v2, .. } = manifest_file_schema(2) else { unreachable!() };
        let AvroSchema::Record { fields: v3, .. } = manifest_file_schema(3) else { unreachable!() };
        assert_eq!(v2.len(), 14);
        assert_eq!(v3.len(), 15);
        assert!(v3.iter().any(|f| f.name == "first_row_id" && f.field_id == Some(519)));
    }

    #[test]
    fn test_field_summary_nested_in_partitions() {
        let schema = manifest_file_schema(2);
        let AvroSchema::Record { fields, .. } = schema else { unreachable!() };
        let partitions = fields.iter().find(|f| f.name == "partitions").unwrap();
        let AvroSchema::Nullable(inner) = &partitions.schema else { panic!() };
        let AvroSchema::Array(item) = inner.as_ref() else { panic!() };
        assert!(matches!(item.as_ref(), AvroSchema::Record { .. }));
    }
}
