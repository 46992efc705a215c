/*!
[Merger] is the compaction primitive for delete files (spec §4.5): it
accumulates deletes gathered from multiple manifests into deduplicated
sets, then re-emits them as a bounded number of chunked delete files.
*/

use std::collections::{BTreeSet, HashSet};

use crate::error::Result;
use crate::types::{canonical_row_key, Schema, Value};

use super::equality::{EqualityDeleteBuilder, EqualityDeleteFile};
use super::position::{PositionDeleteBuilder, PositionDeleteFile};

/// Accumulates deduplicated position and equality deletes from multiple
/// source files and re-emits them chunked by entry count and byte size
/// (spec §4.5).
#[derive(Debug, Default)]
pub struct Merger {
    positions: BTreeSet<(String, i64)>,
    equality_rows: Vec<Vec<(String, Value)>>,
    equality_seen: HashSet<String>,
}

impl Merger {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Merger::default()
    }

    /// Adds one `(file_path, pos)` tuple, deduplicated automatically.
    pub fn add_position(&mut self, file_path: impl Into<String>, pos: i64) {
        self.positions.insert((file_path.into(), pos));
    }

    /// Adds every tuple from a previously-decoded position-delete file.
    pub fn add_positions(&mut self, rows: impl IntoIterator<Item = (String, i64)>) {
        self.positions.extend(rows);
    }

    /// Adds one equality-delete row, deduplicated by its canonical JSON key.
    pub fn add_equality_row(&mut self, row: Vec<(String, Value)>) {
        let key = canonical_row_key(&row);
        if self.equality_seen.insert(key) {
            self.equality_rows.push(row);
        }
    }

    /// Number of distinct buffered position deletes.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of distinct buffered equality-delete rows.
    pub fn equality_count(&self) -> usize {
        self.equality_rows.len()
    }

    /// Re-emits the accumulated position deletes as chunked files, each
    /// bounded by `max_entries_per_file` rows and, best-effort, by
    /// `target_file_size_bytes` (chunks whose serialized size exceeds the
    /// target are halved and re-built until they fit or hold one entry).
    pub fn build_position_delete_files(
        &self,
        sequence_number: i64,
        path_for_index: impl Fn(usize) -> String,
        max_entries_per_file: usize,
        target_file_size_bytes: i64,
    ) -> Vec<(Vec<u8>, PositionDeleteFile)> {
        let rows: Vec<(String, i64)> = self.positions.iter().cloned().collect();
        let mut out = Vec::new();
        let mut index = 0;
        for chunk in rows.chunks(max_entries_per_file.max(1)) {
            split_position_chunk(chunk, sequence_number, target_file_size_bytes, &path_for_index, &mut index, &mut out);
        }
        out
    }

    /// Re-emits the accumulated equality-delete rows as chunked files,
    /// resolving `equality_ids` against `schema` for each chunk's builder.
    pub fn build_equality_delete_files(
        &self,
        schema: &Schema,
        equality_ids: &[i32],
        sequence_number: i64,
        path_for_index: impl Fn(usize) -> String,
        max_entries_per_file: usize,
        upper_bound_truncate_len: usize,
    ) -> Result<Vec<(Vec<u8>, EqualityDeleteFile)>> {
        let mut out = Vec::new();
        for (index, chunk) in self.equality_rows.chunks(max_entries_per_file.max(1)).enumerate() {
            let mut builder = EqualityDeleteBuilder::new(schema, equality_ids, sequence_number)?;
            for row in chunk {
                let map = row.iter().cloned().collect();
                builder.add_row(&map)?;
            }
            out.push(builder.build(path_for_index(index), upper_bound_truncate_len)?);
        }
        Ok(out)
    }
}

fn split_position_chunk(
    chunk: &[(String, i64)],
    sequence_number: i64,
    target_file_size_bytes: i64,
    path_for_index: &impl Fn(usize) -> String,
    index: &mut usize,
    out: &mut Vec<(Vec<u8>, PositionDeleteFile)>,
) {
    let mut builder = PositionDeleteBuilder::new(sequence_number);
    for (path, pos) in chunk {
        builder.add(path.clone(), *pos).expect("merger rows already validated non-negative");
    }
    let (bytes, meta) = builder.build(path_for_index(*index));
    if bytes.len() as i64 <= target_file_size_bytes || chunk.len() <= 1 {
        *index += 1;
        out.push((bytes, meta));
        return;
    }
    let mid = chunk.len() / 2;
    split_position_chunk(&chunk[..mid], sequence_number, target_file_size_bytes, path_for_index, index, out);
    split_position_chunk(&chunk[mid..], sequence_number, target_file_size_bytes, path_for_index, index, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AllType, NestedField, PrimitiveType, Struct};

    #[test]
    fn test_dedup_positions_and_equality_rows() {
        let mut m = Merger::new();
        m.add_position("a.parquet", 1);
        m.add_position("a.parquet", 1);
        m.add_position("a.parquet", 2);
        assert_eq!(m.position_count(), 2);

        m.add_equality_row(vec![("id".to_string(), Value::Int(1))]);
        m.add_equality_row(vec![("id".to_string(), Value::Int(1))]);
        assert_eq!(m.equality_count(), 1);
    }

    #[test]
    fn test_build_position_delete_files_chunked_by_count() {
        let mut m = Merger::new();
        for i in 0..10 {
            m.add_position("a.parquet", i);
        }
        let files = m.build_position_delete_files(1, |i| format!("metadata/pos-{i}.avro"), 4, i64::MAX);
        assert_eq!(files.len(), 3);
        let total: i64 = files.iter().map(|(_, meta)| meta.record_count).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_build_position_delete_files_splits_on_size() {
        let mut m = Merger::new();
        for i in 0..8 {
            m.add_position("a.parquet", i);
        }
        let unbounded = m.build_position_delete_files(1, |i| format!("metadata/pos-{i}.avro"), 8, i64::MAX);
        let one_file_size = unbounded[0].0.len() as i64;
        let files = m.build_position_delete_files(1, |i| format!("metadata/pos-{i}.avro"), 8, one_file_size / 2);
        assert!(files.len() > 1);
        let total: i64 = files.iter().map(|(_, meta)| meta.record_count).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_build_equality_delete_files() {
        let schema = Schema {
            schema_id: 0,
            identifier_field_ids: None,
            struct_fields: Struct {
                fields: vec![NestedField {
                    id: 1,
                    name: "id".to_string(),
                    required: true,
                    field_type: AllType::Primitive(PrimitiveType::Int),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                }],
            },
        };
        let mut m = Merger::new();
        for i in 0..5 {
            m.add_equality_row(vec![("id".to_string(), Value::Int(i))]);
        }
        let files = m
            .build_equality_delete_files(&schema, &[1], 2, |i| format!("metadata/eq-{i}.avro"), 2, 16)
            .unwrap();
        assert_eq!(files.len(), 3);
        let total: i64 = files.iter().map(|(_, meta)| meta.record_count).sum();
        assert_eq!(total, 5);
    }
}
