/*!
[ManifestListBuilder] appends [ManifestFileRow]s and emits the manifest-list
Avro container that a [crate::manifest::snapshot::Snapshot] points at
(spec §3.5, §4.4).
*/

use crate::codec::avro_value::AvroValue;
use crate::codec::manifest_list_schema::manifest_file_schema;
use crate::codec::ContainerWriter;
use crate::error::{IcebergError, Result};

use super::builder::{FieldSummary, ManifestFileRow};

fn nullable<T>(v: Option<T>, f: impl FnOnce(T) -> AvroValue) -> AvroValue {
    match v {
        None => AvroValue::Null,
        Some(v) => AvroValue::Some(Box::new(f(v))),
    }
}

fn field_summary_to_avro(s: &FieldSummary) -> AvroValue {
    AvroValue::Record(vec![
        ("contains_null".to_string(), AvroValue::Boolean(s.contains_null)),
        ("contains_nan".to_string(), nullable(s.contains_nan, AvroValue::Boolean)),
        ("lower_bound".to_string(), nullable(s.lower_bound.clone(), AvroValue::Bytes)),
        ("upper_bound".to_string(), nullable(s.upper_bound.clone(), AvroValue::Bytes)),
    ])
}

fn field_summary_from_avro(av: &AvroValue) -> Result<FieldSummary> {
    let get = |name: &str| {
        av.get_field(name)
            .ok_or_else(|| IcebergError::InvalidInput(format!("field_summary missing {name}")))
    };
    let AvroValue::Boolean(contains_null) = get("contains_null")? else {
        return Err(IcebergError::InvalidInput("contains_null must be boolean".to_string()));
    };
    let contains_nan = match get("contains_nan")? {
        AvroValue::Null => None,
        AvroValue::Some(b) => match b.as_ref() {
            AvroValue::Boolean(v) => Some(*v),
            _ => return Err(IcebergError::InvalidInput("bad contains_nan".to_string())),
        },
        _ => return Err(IcebergError::InvalidInput("bad contains_nan".to_string())),
    };
    let bound = |name: &str| -> Result<Option<Vec<u8>>> {
        match get(name)? {
            AvroValue::Null => Ok(None),
            AvroValue::Some(b) => match b.as_ref() {
                AvroValue::Bytes(v) => Ok(Some(v.clone())),
                _ => Err(IcebergError::InvalidInput(format!("bad {name}"))),
            },
            _ => Err(IcebergError::InvalidInput(format!("bad {name}"))),
        }
    };
    Ok(FieldSummary {
        contains_null: *contains_null,
        contains_nan,
        lower_bound: bound("lower_bound")?,
        upper_bound: bound("upper_bound")?,
    })
}

fn row_to_avro(row: &ManifestFileRow) -> AvroValue {
    let mut fields = vec![
        ("manifest_path".to_string(), AvroValue::String(row.manifest_path.clone())),
        ("manifest_length".to_string(), AvroValue::Long(row.manifest_length)),
        ("partition_spec_id".to_string(), AvroValue::Int(row.partition_spec_id)),
        ("content".to_string(), AvroValue::Int(row.content)),
        ("sequence_number".to_string(), AvroValue::Long(row.sequence_number)),
        ("min_sequence_number".to_string(), AvroValue::Long(row.min_sequence_number)),
        ("added_snapshot_id".to_string(), AvroValue::Long(row.added_snapshot_id)),
        ("added_files_count".to_string(), AvroValue::Some(Box::new(AvroValue::Int(row.added_files_count)))),
        (
            "existing_files_count".to_string(),
            AvroValue::Some(Box::new(AvroValue::Int(row.existing_files_count))),
        ),
        (
            "deleted_files_count".to_string(),
            AvroValue::Some(Box::new(AvroValue::Int(row.deleted_files_count))),
        ),
        (
            "added_rows_count".to_string(),
            AvroValue::Some(Box::new(AvroValue::Long(row.added_rows_count))),
        ),
        (
            "existing_rows_count".to_string(),
            AvroValue::Some(Box::new(AvroValue::Long(row.existing_rows_count))),
        ),
        (
            "deleted_rows_count".to_string(),
            AvroValue::Some(Box::new(AvroValue::Long(row.deleted_rows_count))),
        ),
        (
            "partitions".to_string(),
            if row.partitions.is_empty() {
                AvroValue::Null
            } else {
                AvroValue::Some(Box::new(AvroValue::Array(row.partitions.iter().map(field_summary_to_avro).collect())))
            },
        ),
        ("key_metadata".to_string(), AvroValue::Null),
    ];
    fields.push(("first_row_id".to_string(), nullable(row.first_row_id, AvroValue::Long)));
    AvroValue::Record(fields)
}

fn row_from_avro(av: &AvroValue) -> Result<ManifestFileRow> {
    let get = |name: &str| {
        av.get_field(name)
            .ok_or_else(|| IcebergError::InvalidInput(format!("manifest_file missing {name}")))
    };
    let req_str = |name: &str| -> Result<String> {
        match get(name)? {
            AvroValue::String(s) => Ok(s.clone()),
            other => Err(IcebergError::InvalidInput(format!("{name} must be string, got {other:?}"))),
        }
    };
    let req_long = |name: &str| -> Result<i64> {
        match get(name)? {
            AvroValue::Long(l) => Ok(*l),
            other => Err(IcebergError::InvalidInput(format!("{name} must be long, got {other:?}"))),
        }
    };
    let req_int = |name: &str| -> Result<i32> {
        match get(name)? {
            AvroValue::Int(i) => Ok(*i),
            other => Err(IcebergError::InvalidInput(format!("{name} must be int, got {other:?}"))),
        }
    };
    let opt_int = |name: &str| -> Result<i32> {
        match get(name)? {
            AvroValue::Null => Ok(0),
            AvroValue::Some(b) => match b.as_ref() {
                AvroValue::Int(i) => Ok(*i),
                _ => Err(IcebergError::InvalidInput(format!("bad {name}"))),
            },
            _ => Err(IcebergError::InvalidInput(format!("bad {name}"))),
        }
    };
    let opt_long = |name: &str| -> Result<i64> {
        match get(name)? {
            AvroValue::Null => Ok(0),
            AvroValue::Some(b) => match b.as_ref() {
                AvroValue::Long(l) => Ok(*l),
                _ => Err(IcebergError::InvalidInput(format!("bad {name}"))),
            },
            _ => Err(IcebergError::InvalidInput(format!("bad {name}"))),
        }
    };
    let partitions = match get("partitions")? {
        AvroValue::Null => Vec::new(),
        AvroValue::Some(b) => match b.as_ref() {
            AvroValue::Array(items) => items.iter().map(field_summary_from_avro).collect::<Result<Vec<_>>>()?,
            _ => return Err(IcebergError::InvalidInput("bad partitions".to_string())),
        },
        _ => return Err(IcebergError::InvalidInput("bad partitions".to_string())),
    };
    let first_row_id = match av.get_field("first_row_id") {
        None | Some(AvroValue::Null) => None,
        Some(AvroValue::Some(b)) => match b.as_ref() {
            AvroValue::Long(l) => Some(*l),
            _ => return Err(IcebergError::InvalidInput("bad first_row_id".to_string())),
        },
        _ => return Err(IcebergError::InvalidInput("bad first_row_id".to_string())),
    };

    Ok(ManifestFileRow {
        manifest_path: req_str("manifest_path")?,
        manifest_length: req_long("manifest_length")?,
        partition_spec_id: req_int("partition_spec_id")?,
        content: req_int("content")?,
        sequence_number: req_long("sequence_number")?,
        min_sequence_number: req_long("min_sequence_number")?,
        added_snapshot_id: req_long("added_snapshot_id")?,
        added_files_count: opt_int("added_files_count")?,
        existing_files_count: opt_int("existing_files_count")?,
        deleted_files_count: opt_int("deleted_files_count")?,
        added_rows_count: opt_long("added_rows_count")?,
        existing_rows_count: opt_long("existing_rows_count")?,
        deleted_rows_count: opt_long("deleted_rows_count")?,
        partitions,
        first_row_id,
    })
}

/// Builds a manifest-list: an Avro container of [ManifestFileRow]s, one per
/// manifest contributed to a snapshot (spec §3.5).
pub struct ManifestListBuilder {
    format_version: u8,
    rows: Vec<ManifestFileRow>,
}

impl ManifestListBuilder {
    /// Creates an empty builder for the given format version.
    pub fn new(format_version: u8) -> Self {
        ManifestListBuilder {
            format_version,
            rows: Vec::new(),
        }
    }

    /// Appends one manifest's summary row.
    pub fn append(&mut self, row: ManifestFileRow) {
        self.rows.push(row);
    }

    /// Serializes the accumulated rows into an Avro container.
    pub fn build(&self, snapshot_id: i64) -> Result<Vec<u8>> {
        let schema = manifest_file_schema(self.format_version);
        let mut writer = ContainerWriter::new(&schema);
        for row in &self.rows {
            writer.append(&row_to_avro(row))?;
        }
        let snapshot_id_str = snapshot_id.to_string();
        let format_version_str = self.format_version.to_string();
        Ok(writer.finish(&[("snapshot-id", &snapshot_id_str), ("format-version", &format_version_str)]))
    }

    /// Parses a manifest-list Avro container back into its rows.
    pub fn parse(bytes: &[u8], format_version: u8) -> Result<Vec<ManifestFileRow>> {
        let reader = crate::codec::ContainerReader::parse(bytes)?;
        let schema = manifest_file_schema(format_version);
        reader.read_records(&schema)?.iter().map(row_from_avro).collect()
    }

    /// Builds a stable content-addressed manifest-list path (spec §6.2:
    /// `snap-<snapshot-id>-<uuid>.avro`).
    pub fn new_manifest_list_path(location: &str, snapshot_id: i64) -> Result<String> {
        crate::util::join_path(
            location,
            &format!("metadata/snap-{snapshot_id}-{}.avro", uuid::Uuid::new_v4()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ManifestFileRow {
        ManifestFileRow {
            manifest_path: "metadata/m1.avro".to_string(),
            manifest_length: 123,
            partition_spec_id: 0,
            content: 0,
            sequence_number: 3,
            min_sequence_number: 1,
            added_snapshot_id: 42,
            added_files_count: 2,
            existing_files_count: 0,
            deleted_files_count: 0,
            added_rows_count: 100,
            existing_rows_count: 0,
            deleted_rows_count: 0,
            partitions: vec![FieldSummary {
                contains_null: false,
                contains_nan: Some(false),
                lower_bound: Some(vec![1]),
                upper_bound: Some(vec![9]),
            }],
            first_row_id: None,
        }
    }

    #[test]
    fn test_roundtrip_manifest_list() {
        let mut builder = ManifestListBuilder::new(2);
        builder.append(sample_row());
        let bytes = builder.build(42).unwrap();
        let rows = ManifestListBuilder::parse(&bytes, 2).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], sample_row());
    }

    #[test]
    fn test_empty_manifest_list() {
        let builder = ManifestListBuilder::new(2);
        let bytes = builder.build(1).unwrap();
        let rows = ManifestListBuilder::parse(&bytes, 2).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_v3_first_row_id_roundtrips() {
        let mut row = sample_row();
        row.first_row_id = Some(77);
        let mut builder = ManifestListBuilder::new(3);
        builder.append(row.clone());
        let bytes = builder.build(42).unwrap();
        let rows = ManifestListBuilder::parse(&bytes, 3).unwrap();
        assert_eq!(rows[0].first_row_id, Some(77));
    }
}
