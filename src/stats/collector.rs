/*!
Per-column statistics collection (spec §4.3): value/null/NaN counts and
min/max bounds, accumulated one value at a time and finalized into the
integer and byte-array maps a [crate::manifest::entry::DataFile] carries.
*/

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::codec::bounds::{encode_bound, truncate_upper_bound_bytes, truncate_upper_bound_string};
use crate::error::Result;
use crate::types::{PrimitiveType, Value};

/// Accumulates `{value_count, null_count, nan_count, lower, upper}` for one column.
#[derive(Debug, Clone)]
pub struct ColumnStatsCollector {
    field_id: i32,
    type_: PrimitiveType,
    value_count: i64,
    null_count: i64,
    nan_count: i64,
    lower: Option<Value>,
    upper: Option<Value>,
}

impl ColumnStatsCollector {
    /// Creates an empty collector for `field_id` of type `type_`.
    pub fn new(field_id: i32, type_: PrimitiveType) -> Self {
        ColumnStatsCollector {
            field_id,
            type_,
            value_count: 0,
            null_count: 0,
            nan_count: 0,
            lower: None,
            upper: None,
        }
    }

    /// Folds one more observed value into the running stats. NaN floats/doubles
    /// are counted separately and never update `lower`/`upper` (spec §4.3).
    pub fn update(&mut self, value: &Value) {
        self.value_count += 1;
        if matches!(value, Value::Null) {
            self.null_count += 1;
            return;
        }
        if value.is_nan() {
            self.nan_count += 1;
            return;
        }
        let is_new_low = match &self.lower {
            None => true,
            Some(cur) => value.partial_compare(cur) == Some(Ordering::Less),
        };
        if is_new_low {
            self.lower = Some(value.clone());
        }
        let is_new_high = match &self.upper {
            None => true,
            Some(cur) => value.partial_compare(cur) == Some(Ordering::Greater),
        };
        if is_new_high {
            self.upper = Some(value.clone());
        }
    }

    /// Finalizes this collector into a [ColumnStats] row, truncating string/binary
    /// upper bounds to `upper_bound_truncate_len` characters/bytes (spec §4.2).
    pub fn finalize(&self, upper_bound_truncate_len: usize) -> Result<ColumnStats> {
        let lower_bound = self.lower.as_ref().map(encode_bound).transpose()?;
        let upper_bound = match &self.upper {
            None => None,
            Some(Value::String(s)) => {
                let truncated = truncate_upper_bound_string(s, upper_bound_truncate_len)
                    .unwrap_or_else(|| s.clone());
                Some(truncated.into_bytes())
            }
            Some(Value::Binary(b)) | Some(Value::Fixed(b)) => {
                Some(truncate_upper_bound_bytes(b, upper_bound_truncate_len).unwrap_or_else(|| b.clone()))
            }
            Some(v) => Some(encode_bound(v)?),
        };
        Ok(ColumnStats {
            field_id: self.field_id,
            value_count: self.value_count,
            null_count: self.null_count,
            nan_count: self.nan_count,
            lower_bound,
            upper_bound,
        })
    }
}

/// A finalized column's statistics row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    /// Column field-id.
    pub field_id: i32,
    /// Count of values, including nulls.
    pub value_count: i64,
    /// Count of null values.
    pub null_count: i64,
    /// Count of NaN float/double values.
    pub nan_count: i64,
    /// Canonical-encoded minimum non-null, non-NaN value.
    pub lower_bound: Option<Vec<u8>>,
    /// Canonical-encoded, possibly-truncated maximum non-null, non-NaN value.
    pub upper_bound: Option<Vec<u8>>,
}

/// The four integer maps plus two byte-array bound maps a [ColumnStats] set
/// collapses into (spec §4.3's `ComputedFileStats`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedFileStats {
    /// Per-field value counts, including nulls.
    pub value_counts: BTreeMap<i32, i64>,
    /// Per-field null counts.
    pub null_value_counts: BTreeMap<i32, i64>,
    /// Per-field NaN counts.
    pub nan_value_counts: BTreeMap<i32, i64>,
    /// Per-field canonical-encoded lower bounds.
    pub lower_bounds: BTreeMap<i32, Vec<u8>>,
    /// Per-field canonical-encoded upper bounds.
    pub upper_bounds: BTreeMap<i32, Vec<u8>>,
}

impl ComputedFileStats {
    /// Folds one finalized column's stats into the bundle.
    pub fn add(&mut self, stats: ColumnStats) {
        self.value_counts.insert(stats.field_id, stats.value_count);
        self.null_value_counts.insert(stats.field_id, stats.null_count);
        if stats.nan_count > 0 {
            self.nan_value_counts.insert(stats.field_id, stats.nan_count);
        }
        if let Some(lower) = stats.lower_bound {
            self.lower_bounds.insert(stats.field_id, lower);
        }
        if let Some(upper) = stats.upper_bound {
            self.upper_bounds.insert(stats.field_id, upper);
        }
    }
}

/// Accumulates per-column collectors across a whole data file, keyed by field-id.
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    collectors: BTreeMap<i32, ColumnStatsCollector>,
}

impl StatsAccumulator {
    /// Creates an accumulator with no registered columns.
    pub fn new() -> Self {
        StatsAccumulator::default()
    }

    /// Registers a column so subsequent [StatsAccumulator::update] calls for
    /// its field-id are recorded. Idempotent.
    pub fn register(&mut self, field_id: i32, type_: PrimitiveType) {
        self.collectors
            .entry(field_id)
            .or_insert_with(|| ColumnStatsCollector::new(field_id, type_));
    }

    /// Folds one value into the collector for `field_id`. A no-op if the
    /// field was never registered.
    pub fn update(&mut self, field_id: i32, value: &Value) {
        if let Some(c) = self.collectors.get_mut(&field_id) {
            c.update(value);
        }
    }

    /// Finalizes every registered collector into one [ComputedFileStats].
    pub fn finalize(&self, upper_bound_truncate_len: usize) -> Result<ComputedFileStats> {
        let mut out = ComputedFileStats::default();
        for collector in self.collectors.values() {
            out.add(collector.finalize(upper_bound_truncate_len)?);
        }
        Ok(out)
    }
}
