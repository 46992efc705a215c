/*!
Applies buffered position- and equality-delete lookups to a data file's
rows (spec §4.5): positional deletes take precedence, and only deletes
with a sequence number `>=` the data file's own sequence number apply.
*/

use crate::types::Value;

use super::equality::EqualityDeleteLookup;
use super::position::PositionDeleteLookup;

/// Row counters produced by one application pass over a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyResult {
    /// Rows that survived both delete kinds.
    pub passed_rows: i64,
    /// Rows removed by a position delete.
    pub position_deleted: i64,
    /// Rows removed by an equality delete.
    pub equality_deleted: i64,
}

/// One row of a data file being checked against the delete set: its
/// position within the file and its equality-relevant field values.
pub struct DataRow<'a> {
    /// Zero-based row position within the file.
    pub pos: i64,
    /// The row's equality-delete-relevant `(field name, value)` pairs.
    pub equality_values: &'a [(String, Value)],
}

/// Applies `position_lookups` and `equality_lookups` to every row of
/// `file_path` at data sequence `data_sequence`, honoring spec §4.5's
/// "apply all deletes whose sequence >= S" rule and positional precedence.
pub fn apply_deletes<'a>(
    file_path: &str,
    data_sequence: i64,
    position_lookups: &[PositionDeleteLookup],
    equality_lookups: &[EqualityDeleteLookup],
    rows: impl IntoIterator<Item = DataRow<'a>>,
) -> ApplyResult {
    let mut result = ApplyResult::default();
    let applicable_positions: Vec<&PositionDeleteLookup> = position_lookups
        .iter()
        .filter(|l| l.sequence_number() >= data_sequence)
        .collect();
    let applicable_equalities: Vec<&EqualityDeleteLookup> = equality_lookups
        .iter()
        .filter(|l| l.sequence_number() >= data_sequence)
        .collect();

    for row in rows {
        if applicable_positions.iter().any(|l| l.is_deleted(file_path, row.pos)) {
            result.position_deleted += 1;
            continue;
        }
        if applicable_equalities.iter().any(|l| l.is_deleted(row.equality_values)) {
            result.equality_deleted += 1;
            continue;
        }
        result.passed_rows += 1;
    }
    result
}
