/*!
[ManifestBuilder] assembles a manifest's Avro container bytes plus the
manifest-list row that summarizes it (spec §4.4): counts and per-partition-
field `(contains_null, contains_nan, lower, upper)` summaries, unioned
incrementally as each file is added rather than computed in a second pass.
*/

use uuid::Uuid;

use crate::codec::bounds::decode_bound;
use crate::codec::manifest_schema::{manifest_entry_schema, partition_struct_schema};
use crate::codec::ContainerWriter;
use crate::error::Result;
use crate::types::{AllType, PartitionSpec, Schema, Value};

use super::entry::{Content, DataFile, ManifestEntry, Status};

/// Per-partition-field union of `(contains_null, contains_nan, lower, upper)`
/// across every file added to a manifest (spec §3.5, §4.4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldSummary {
    /// Whether any file's partition tuple had a null in this field.
    pub contains_null: bool,
    /// Whether any file's partition tuple had a NaN in this field.
    pub contains_nan: Option<bool>,
    /// Canonical-encoded lower bound across all added files.
    pub lower_bound: Option<Vec<u8>>,
    /// Canonical-encoded upper bound across all added files.
    pub upper_bound: Option<Vec<u8>>,
}

impl FieldSummary {
    fn fold(&mut self, value: &Option<Value>) {
        match value {
            None => self.contains_null = true,
            Some(v) => {
                if v.is_nan() {
                    self.contains_nan = Some(true);
                    return;
                }
                if self.contains_nan.is_none() {
                    self.contains_nan = Some(false);
                }
                self.update_typed(v);
            }
        }
    }

    fn update_typed(&mut self, v: &Value) {
        // Bounds are compared using the value's own ordering, then re-encoded,
        // since raw little-endian bytes do not compare lexicographically for
        // every type (e.g. negative ints).
        let lower_val = self
            .lower_bound
            .as_ref()
            .and_then(|b| decode_bound(b, &value_type(v)).ok());
        let replace_lower = match &lower_val {
            None => true,
            Some(cur) => matches!(v.partial_compare(cur), Some(std::cmp::Ordering::Less)),
        };
        if replace_lower {
            self.lower_bound = crate::codec::bounds::encode_bound(v).ok();
        }
        let upper_val = self
            .upper_bound
            .as_ref()
            .and_then(|b| decode_bound(b, &value_type(v)).ok());
        let replace_upper = match &upper_val {
            None => true,
            Some(cur) => matches!(v.partial_compare(cur), Some(std::cmp::Ordering::Greater)),
        };
        if replace_upper {
            self.upper_bound = crate::codec::bounds::encode_bound(v).ok();
        }
    }
}

fn value_type(v: &Value) -> crate::types::PrimitiveType {
    use crate::types::PrimitiveType as P;
    match v {
        Value::Null => P::Unknown,
        Value::Boolean(_) => P::Boolean,
        Value::Int(_) => P::Int,
        Value::Long(_) => P::Long,
        Value::Float(_) => P::Float,
        Value::Double(_) => P::Double,
        Value::Decimal(d) => P::Decimal { precision: d.precision(), scale: d.scale() },
        Value::Date(_) => P::Date,
        Value::Time(_) => P::Time,
        Value::Timestamp(_) => P::Timestamp,
        Value::Timestamptz(_) => P::Timestamptz,
        Value::String(_) => P::String,
        Value::Uuid(_) => P::Uuid,
        Value::Fixed(b) => P::Fixed(b.len() as u64),
        Value::Binary(_) => P::Binary,
    }
}

/// Manifest-list row summarizing one manifest (spec §3.5).
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestFileRow {
    /// Path to the manifest's Avro container.
    pub manifest_path: String,
    /// Size of the manifest file in bytes.
    pub manifest_length: i64,
    /// Partition spec id every entry in the manifest shares.
    pub partition_spec_id: i32,
    /// Content class: data (0) or deletes (1).
    pub content: i32,
    /// Largest sequence number found among this manifest's entries.
    pub sequence_number: i64,
    /// Smallest sequence number found among this manifest's entries.
    pub min_sequence_number: i64,
    /// Snapshot id that added this manifest.
    pub added_snapshot_id: i64,
    /// Count of entries with `status == Added`.
    pub added_files_count: i32,
    /// Count of entries with `status == Existing`.
    pub existing_files_count: i32,
    /// Count of entries with `status == Deleted`.
    pub deleted_files_count: i32,
    /// Sum of `record_count` over added entries.
    pub added_rows_count: i64,
    /// Sum of `record_count` over existing entries.
    pub existing_rows_count: i64,
    /// Sum of `record_count` over deleted entries.
    pub deleted_rows_count: i64,
    /// Per-partition-field summaries, in partition-spec field order.
    pub partitions: Vec<FieldSummary>,
    /// v3: stable row-id of the first row contributed by this manifest.
    pub first_row_id: Option<i64>,
}

/// Builds one manifest: a sequence of [ManifestEntry] sharing a partition
/// spec and content class, emitted as an Avro container plus the
/// manifest-list row that will reference it (spec §4.4).
pub struct ManifestBuilder<'a> {
    spec: &'a PartitionSpec,
    schema: &'a Schema,
    format_version: u8,
    snapshot_id: i64,
    sequence_number: i64,
    content: Content,
    entries: Vec<ManifestEntry>,
    partitions: Vec<FieldSummary>,
}

impl<'a> ManifestBuilder<'a> {
    /// Creates a builder for a manifest written by `snapshot_id` at
    /// `sequence_number`, over `spec`/`schema`, for the given content class.
    pub fn new(
        spec: &'a PartitionSpec,
        schema: &'a Schema,
        format_version: u8,
        snapshot_id: i64,
        sequence_number: i64,
        content: Content,
    ) -> Self {
        ManifestBuilder {
            spec,
            schema,
            format_version,
            snapshot_id,
            sequence_number,
            content,
            entries: Vec::new(),
            partitions: vec![FieldSummary::default(); spec.fields.len()],
        }
    }

    /// Adds one data file as a new (`status = Added`) entry, inheriting this
    /// builder's snapshot id and sequence number, and folds its partition
    /// tuple into the running field summaries.
    pub fn add_data_file(&mut self, file: DataFile) -> Result<()> {
        file.validate_deletion_vector()?;
        for (summary, value) in self.partitions.iter_mut().zip(file.partition.iter()) {
            summary.fold(value);
        }
        self.entries.push(ManifestEntry {
            status: Status::Added,
            snapshot_id: Some(self.snapshot_id),
            sequence_number: Some(self.sequence_number),
            file_sequence_number: Some(self.sequence_number),
            data_file: file,
        });
        Ok(())
    }

    /// Carries over an entry unchanged from a prior manifest (`status = Existing`).
    pub fn add_existing_entry(&mut self, entry: ManifestEntry) -> Result<()> {
        entry.data_file.validate_deletion_vector()?;
        for (summary, value) in self.partitions.iter_mut().zip(entry.data_file.partition.iter()) {
            summary.fold(value);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Marks a prior entry's file as deleted by this manifest (`status = Deleted`).
    pub fn add_deleted_entry(&mut self, entry: ManifestEntry) -> Result<()> {
        let mut entry = entry;
        entry.status = Status::Deleted;
        entry.snapshot_id = Some(self.snapshot_id);
        self.entries.push(entry);
        Ok(())
    }

    /// Serializes the accumulated entries into an Avro container and
    /// produces the corresponding manifest-list row. Returns
    /// `(container_bytes, manifest_list_row)`; the caller chooses the
    /// content-addressed path (spec §6.2: `<manifest-id>.avro`).
    pub fn build(self, manifest_path: String) -> Result<(Vec<u8>, ManifestFileRow)> {
        let partition_schema = partition_struct_schema(self.spec, self.schema)?;
        let entry_schema = manifest_entry_schema(self.format_version, partition_schema);

        let mut writer = ContainerWriter::new(&entry_schema);
        let mut added_files_count = 0;
        let mut existing_files_count = 0;
        let mut deleted_files_count = 0;
        let mut added_rows_count = 0i64;
        let mut existing_rows_count = 0i64;
        let mut deleted_rows_count = 0i64;
        let mut min_seq = i64::MAX;
        let mut max_seq = i64::MIN;

        for entry in &self.entries {
            let value = entry.to_avro_value(self.spec, self.format_version);
            writer.append(&value)?;
            match entry.status {
                Status::Added => {
                    added_files_count += 1;
                    added_rows_count += entry.data_file.record_count;
                }
                Status::Existing => {
                    existing_files_count += 1;
                    existing_rows_count += entry.data_file.record_count;
                }
                Status::Deleted => {
                    deleted_files_count += 1;
                    deleted_rows_count += entry.data_file.record_count;
                }
            }
            if let Some(seq) = entry.sequence_number {
                min_seq = min_seq.min(seq);
                max_seq = max_seq.max(seq);
            }
        }
        if self.entries.is_empty() {
            min_seq = self.sequence_number;
            max_seq = self.sequence_number;
        }

        let schema_json = self.schema_json_cached();
        let spec_id_str = self.spec.spec_id.to_string();
        let content_str = match self.content {
            Content::Data => "data",
            Content::PositionDeletes | Content::EqualityDeletes => "deletes",
        };
        let format_version_str = self.format_version.to_string();
        let real_meta: Vec<(&str, &str)> = vec![
            ("schema", &schema_json),
            ("schema-id", "0"),
            ("partition-spec-id", &spec_id_str),
            ("format-version", &format_version_str),
            ("content", content_str),
        ];
        let bytes = writer.finish(&real_meta);

        let row = ManifestFileRow {
            manifest_path,
            manifest_length: bytes.len() as i64,
            partition_spec_id: self.spec.spec_id,
            content: if matches!(self.content, Content::Data) { 0 } else { 1 },
            sequence_number: max_seq,
            min_sequence_number: min_seq,
            added_snapshot_id: self.snapshot_id,
            added_files_count,
            existing_files_count,
            deleted_files_count,
            added_rows_count,
            existing_rows_count,
            deleted_rows_count,
            partitions: self.partitions,
            first_row_id: None,
        };
        Ok((bytes, row))
    }

    fn schema_json_cached(&self) -> String {
        serde_json::to_string(self.schema).unwrap_or_default()
    }

    /// Builds a stable content-addressed manifest path from the table
    /// location and a freshly generated manifest id.
    pub fn new_manifest_path(location: &str) -> Result<String> {
        crate::util::join_path(location, &format!("metadata/{}.avro", Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NestedField, AllType, PartitionField, Struct, Transform};
    use std::collections::BTreeMap;

    use crate::manifest::entry::FileFormat;

    fn schema() -> Schema {
        Schema {
            schema_id: 0,
            identifier_field_ids: None,
            struct_fields: Struct {
                fields: vec![NestedField {
                    id: 1,
                    name: "id".to_string(),
                    required: true,
                    field_type: AllType::Primitive(crate::types::PrimitiveType::Int),
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
                name: "id".to_string(),
                transform: Transform::Identity,
            }],
        }
    }

    fn file(partition_value: i32, count: i64) -> DataFile {
        DataFile {
            content: Content::Data,
            file_path: format!("data/part-{partition_value}.parquet"),
            file_format: FileFormat::Parquet,
            partition: vec![Some(Value::Int(partition_value))],
            record_count: count,
            file_size_in_bytes: 100,
            column_sizes: None,
            value_counts: None,
            null_value_counts: None,
            nan_value_counts: None,
            lower_bounds: None,
            upper_bounds: None,
            key_metadata: None,
            split_offsets: None,
            equality_ids: None,
            sort_order_id: None,
            first_row_id: None,
            referenced_data_file: None,
            content_offset: None,
            content_size_in_bytes: None,
        }
    }

    #[test]
    fn test_build_counts_and_partition_summary() {
        let schema = schema();
        let spec = spec();
        let mut builder = ManifestBuilder::new(&spec, &schema, 2, 10, 5, Content::Data);
        builder.add_data_file(file(1, 100)).unwrap();
        builder.add_data_file(file(3, 200)).unwrap();
        let (bytes, row) = builder.build("metadata/m1.avro".to_string()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(row.added_files_count, 2);
        assert_eq!(row.added_rows_count, 300);
        assert_eq!(row.partitions.len(), 1);
        assert!(!row.partitions[0].contains_null);
    }

    #[test]
    fn test_partition_summary_tracks_null() {
        let schema = schema();
        let spec = spec();
        let mut builder = ManifestBuilder::new(&spec, &schema, 2, 10, 5, Content::Data);
        let mut f = file(1, 1);
        f.partition = vec![None];
        builder.add_data_file(f).unwrap();
        let (_, row) = builder.build("metadata/m2.avro".to_string()).unwrap();
        assert!(row.partitions[0].contains_null);
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        let schema = schema();
        let spec = spec();
        let builder = ManifestBuilder::new(&spec, &schema, 2, 10, 5, Content::Data);
        let (_, row) = builder.build("metadata/empty.avro".to_string()).unwrap();
        assert_eq!(row.added_files_count, 0);
        assert_eq!(row.min_sequence_number, 5);
    }

    #[test]
    fn test_roundtrip_entries_via_reader() {
        let schema = schema();
        let spec = spec();
        let mut builder = ManifestBuilder::new(&spec, &schema, 2, 10, 5, Content::Data);
        builder.add_data_file(file(7, 42)).unwrap();
        let (bytes, _row) = builder.build("metadata/m3.avro".to_string()).unwrap();

        let reader = crate::codec::ContainerReader::parse(&bytes).unwrap();
        let partition_schema = partition_struct_schema(&spec, &schema).unwrap();
        let entry_schema = manifest_entry_schema(2, partition_schema);
        let records = reader.read_records(&entry_schema).unwrap();
        assert_eq!(records.len(), 1);
        let entry = ManifestEntry::from_avro_value(&records[0], &spec, &schema, 2).unwrap();
        assert_eq!(entry.data_file.record_count, 42);
        let _: BTreeMap<i32, i64> = BTreeMap::new();
    }
}
