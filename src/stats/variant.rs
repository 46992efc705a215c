/*!
Shredded-variant statistics (spec §4.3): each shredded sub-column of a
`variant` value gets its own stable synthetic field-id, assigned by a
deterministic counter, and its stats merge into the data file's ordinary
bound maps alongside regular columns.
*/

use std::cmp::Ordering;

use crate::codec::bounds::decode_bound;
use crate::error::Result;
use crate::types::PrimitiveType;

use super::collector::ColumnStats;

/// Allocates synthetic field-ids for shredded variant sub-columns,
/// monotonically from a starting id (spec §4.3).
#[derive(Debug, Clone)]
pub struct ShreddedFieldIdAllocator {
    next: i32,
}

impl ShreddedFieldIdAllocator {
    /// Creates an allocator whose first [ShreddedFieldIdAllocator::allocate]
    /// call returns `start`.
    pub fn new(start: i32) -> Self {
        ShreddedFieldIdAllocator { next: start }
    }

    /// Reserves and returns the next synthetic field-id.
    pub fn allocate(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Builds the stable path name for a shredded subfield of a variant column,
/// e.g. `$event.typed_value.user_id.typed_value`.
pub fn shredded_path(column: &str, subfield: &str) -> String {
    format!("${column}.typed_value.{subfield}.typed_value")
}

/// Merges two stats rows for the *same* synthetic field-id, as
/// `min(lower)`, `max(upper)`, `sum(nulls)`, `sum(values)` (spec §4.3).
pub fn merge(a: &ColumnStats, b: &ColumnStats, type_: &PrimitiveType) -> Result<ColumnStats> {
    assert_eq!(a.field_id, b.field_id, "merge requires the same field-id");

    let lower_bound = merge_bound(a.lower_bound.as_deref(), b.lower_bound.as_deref(), type_, Ordering::Less)?;
    let upper_bound = merge_bound(
        a.upper_bound.as_deref(),
        b.upper_bound.as_deref(),
        type_,
        Ordering::Greater,
    )?;

    Ok(ColumnStats {
        field_id: a.field_id,
        value_count: a.value_count + b.value_count,
        null_count: a.null_count + b.null_count,
        nan_count: a.nan_count + b.nan_count,
        lower_bound,
        upper_bound,
    })
}

fn merge_bound(
    a: Option<&[u8]>,
    b: Option<&[u8]>,
    type_: &PrimitiveType,
    keep_when: Ordering,
) -> Result<Option<Vec<u8>>> {
    match (a, b) {
        (None, None) => Ok(None),
        (Some(a), None) => Ok(Some(a.to_vec())),
        (None, Some(b)) => Ok(Some(b.to_vec())),
        (Some(a_bytes), Some(b_bytes)) => {
            let a_value = decode_bound(a_bytes, type_)?;
            let b_value = decode_bound(b_bytes, type_)?;
            let keep_a = a_value.partial_compare(&b_value) == Some(keep_when) || a_value.partial_compare(&b_value) == Some(Ordering::Equal);
            Ok(Some(if keep_a { a_bytes.to_vec() } else { b_bytes.to_vec() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_monotonic() {
        let mut alloc = ShreddedFieldIdAllocator::new(2000);
        assert_eq!(alloc.allocate(), 2000);
        assert_eq!(alloc.allocate(), 2001);
    }

    #[test]
    fn test_shredded_path_format() {
        assert_eq!(
            shredded_path("event", "user_id"),
            "$event.typed_value.user_id.typed_value"
        );
    }

    #[test]
    fn test_merge_sums_counts_and_keeps_extremes() {
        use crate::codec::bounds::encode_bound;
        use crate::types::Value;

        let a = ColumnStats {
            field_id: 2000,
            value_count: 3,
            null_count: 1,
            nan_count: 0,
            lower_bound: Some(encode_bound(&Value::Int(5)).unwrap()),
            upper_bound: Some(encode_bound(&Value::Int(50)).unwrap()),
        };
        let b = ColumnStats {
            field_id: 2000,
            value_count: 2,
            null_count: 0,
            nan_count: 0,
            lower_bound: Some(encode_bound(&Value::Int(1)).unwrap()),
            upper_bound: Some(encode_bound(&Value::Int(99)).unwrap()),
        };
        let merged = merge(&a, &b, &PrimitiveType::Int).unwrap();
        assert_eq!(merged.value_count, 5);
        assert_eq!(merged.null_count, 1);
        assert_eq!(merged.lower_bound, Some(encode_bound(&Value::Int(1)).unwrap()));
        assert_eq!(merged.upper_bound, Some(encode_bound(&Value::Int(99)).unwrap()));
    }
}
