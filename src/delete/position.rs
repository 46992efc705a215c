/*!
Position deletes: `{file_path: string, pos: long}` rows that mark one
physical row of a data file as removed (spec §4.5). The schema's two
fields use Iceberg's reserved high field-id range so they never collide
with a user schema's ids.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::codec::avro_value::{AvroSchema, AvroValue, RecordField};
use crate::codec::ContainerWriter;
use crate::error::{IcebergError, Result};

/// Reserved field-id for the position-delete `file_path` column.
pub const FILE_PATH_FIELD_ID: i64 = 2_147_483_546;
/// Reserved field-id for the position-delete `pos` column.
pub const POS_FIELD_ID: i64 = 2_147_483_545;

/// The fixed two-column Avro schema every position-delete file shares.
pub fn position_delete_schema() -> AvroSchema {
    AvroSchema::Record {
        name: "position_delete".to_string(),
        fields: vec![
            RecordField::with_id("file_path", FILE_PATH_FIELD_ID, AvroSchema::String),
            RecordField::with_id("pos", POS_FIELD_ID, AvroSchema::Long),
        ],
    }
}

/// Manifest-facing metadata for a written position-delete file (spec §4.5,
/// content class 1).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionDeleteFile {
    /// Path to the delete file.
    pub file_path: String,
    /// Size of the serialized delete file in bytes.
    pub file_size_in_bytes: i64,
    /// Number of `(file_path, pos)` rows the file holds.
    pub record_count: i64,
    /// Sequence number every row in this delete file shares.
    pub sequence_number: i64,
}

/// Accumulates `(file_path, pos)` tuples and emits a sorted position-delete
/// file (spec §4.5). Sorting by `(file_path, pos)` at [PositionDeleteBuilder::build]
/// lets the reader binary-search rather than scan.
pub struct PositionDeleteBuilder {
    sequence_number: i64,
    rows: Vec<(String, i64)>,
}

impl PositionDeleteBuilder {
    /// Creates a builder for deletes written at `sequence_number`.
    pub fn new(sequence_number: i64) -> Self {
        PositionDeleteBuilder {
            sequence_number,
            rows: Vec::new(),
        }
    }

    /// Buffers one `(file_path, pos)` tuple. Rejects negative positions.
    pub fn add(&mut self, file_path: impl Into<String>, pos: i64) -> Result<()> {
        if pos < 0 {
            return Err(IcebergError::InvalidInput(format!(
                "position delete pos must be >= 0, got {pos}"
            )));
        }
        self.rows.push((file_path.into(), pos));
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

    /// Sorts the buffered rows and serializes them into an Avro container,
    /// returning the bytes plus the manifest-facing metadata.
    pub fn build(mut self, file_path: String) -> (Vec<u8>, PositionDeleteFile) {
        self.rows.sort();
        let schema = position_delete_schema();
        let mut writer = ContainerWriter::new(&schema);
        for (path, pos) in &self.rows {
            let record = AvroValue::Record(vec![
                ("file_path".to_string(), AvroValue::String(path.clone())),
                ("pos".to_string(), AvroValue::Long(*pos)),
            ]);
            writer.append(&record).expect("schema matches record shape");
        }
        let record_count = self.rows.len() as i64;
        let sequence_number_str = self.sequence_number.to_string();
        let bytes = writer.finish(&[("content", "position-deletes"), ("sequence-number", &sequence_number_str)]);
        let metadata = PositionDeleteFile {
            file_size_in_bytes: bytes.len() as i64,
            record_count,
            sequence_number: self.sequence_number,
            file_path,
        };
        (bytes, metadata)
    }
}

/// Indexes the positions deleted per data file for O(log n) membership
/// checks on the read side (spec §4.5).
#[derive(Debug, Clone)]
pub struct PositionDeleteLookup {
    sequence_number: i64,
    positions: BTreeMap<String, BTreeSet<i64>>,
}

impl PositionDeleteLookup {
    /// Builds a lookup from a flat list of `(file_path, pos)` tuples,
    /// all sharing `sequence_number`.
    pub fn new(sequence_number: i64, rows: &[(String, i64)]) -> Self {
        let mut positions: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
        for (path, pos) in rows {
            positions.entry(path.clone()).or_default().insert(*pos);
        }
        PositionDeleteLookup {
            sequence_number,
            positions,
        }
    }

    /// Parses a lookup directly from a position-delete file's Avro bytes.
    pub fn from_container(bytes: &[u8], sequence_number: i64) -> Result<Self> {
        let schema = position_delete_schema();
        let reader = crate::codec::ContainerReader::parse(bytes)?;
        let records = reader.read_records(&schema)?;
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let path = match record.get_field("file_path") {
                Some(AvroValue::String(s)) => s.clone(),
                _ => return Err(IcebergError::InvalidInput("malformed position delete row".to_string())),
            };
            let pos = match record.get_field("pos") {
                Some(AvroValue::Long(p)) => *p,
                _ => return Err(IcebergError::InvalidInput("malformed position delete row".to_string())),
            };
            rows.push((path, pos));
        }
        Ok(Self::new(sequence_number, &rows))
    }

    /// Whether `(file_path, pos)` was deleted.
    pub fn is_deleted(&self, file_path: &str, pos: i64) -> bool {
        self.positions.get(file_path).is_some_and(|set| set.contains(&pos))
    }

    /// The sequence number shared by every delete this lookup indexes.
    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_position() {
        let mut b = PositionDeleteBuilder::new(1);
        assert!(b.add("data/a.parquet", -1).is_err());
        assert!(b.add("data/a.parquet", 0).is_ok());
    }

    #[test]
    fn test_build_sorts_and_roundtrips() {
        let mut b = PositionDeleteBuilder::new(5);
        b.add("data/b.parquet", 3).unwrap();
        b.add("data/a.parquet", 10).unwrap();
        b.add("data/a.parquet", 2).unwrap();
        let (bytes, meta) = b.build("metadata/delete-1.avro".to_string());
        assert_eq!(meta.record_count, 3);
        assert_eq!(meta.sequence_number, 5);

        let lookup = PositionDeleteLookup::from_container(&bytes, 5).unwrap();
        assert!(lookup.is_deleted("data/a.parquet", 2));
        assert!(lookup.is_deleted("data/a.parquet", 10));
        assert!(lookup.is_deleted("data/b.parquet", 3));
        assert!(!lookup.is_deleted("data/a.parquet", 3));
        assert_eq!(lookup.sequence_number(), 5);
    }

    #[test]
    fn test_empty_builder_produces_valid_container() {
        let b = PositionDeleteBuilder::new(1);
        assert!(b.is_empty());
        let (bytes, meta) = b.build("metadata/delete-empty.avro".to_string());
        assert_eq!(meta.record_count, 0);
        let lookup = PositionDeleteLookup::from_container(&bytes, 1).unwrap();
        assert!(!lookup.is_deleted("anything", 0));
    }
}
