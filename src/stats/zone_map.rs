/*!
A zone map (spec §4.3, GLOSSARY): the queryable `(lower, upper, contains_null)`
projection of a column's statistics, answering predicate-pruning queries by
monotone interval arithmetic over the per-type comparator.
*/

use std::cmp::Ordering;

use crate::codec::bounds::decode_bound;
use crate::error::Result;
use crate::types::{PrimitiveType, Value};

/// A comparison predicate a [ZoneMap] can be asked to prune against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `column = literal`
    Eq,
    /// `column < literal`
    Lt,
    /// `column <= literal`
    Le,
    /// `column > literal`
    Gt,
    /// `column >= literal`
    Ge,
}

/// The decoded `(lower, upper, contains_null)` summary for one column of one data file.
#[derive(Debug, Clone)]
pub struct ZoneMap {
    type_: PrimitiveType,
    lower: Option<Value>,
    upper: Option<Value>,
    /// Whether any row in the summarized file had a null in this column.
    pub contains_null: bool,
}

impl ZoneMap {
    /// Builds a zone map by decoding the canonical-encoded bound bytes
    /// a [super::collector::ColumnStats] row carries.
    pub fn from_bounds(
        type_: PrimitiveType,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        contains_null: bool,
    ) -> Result<Self> {
        let lower = lower.map(|b| decode_bound(b, &type_)).transpose()?;
        let upper = upper.map(|b| decode_bound(b, &type_)).transpose()?;
        Ok(ZoneMap {
            type_,
            lower,
            upper,
            contains_null,
        })
    }

    /// Returns `true` only when it can prove `predicate` is false for every
    /// row summarized by this zone map (spec §8.1 property 5: never a false
    /// positive). Unknown bounds, NaN, or type mismatches are always
    /// conservative — they return `false` rather than risk skipping a
    /// matching row.
    pub fn can_prune(&self, op: CompareOp, literal: &Value) -> bool {
        let (Some(lower), Some(upper)) = (&self.lower, &self.upper) else {
            return false;
        };
        let lower_cmp = literal.partial_compare(lower);
        let upper_cmp = literal.partial_compare(upper);
        match op {
            CompareOp::Eq => {
                matches!(lower_cmp, Some(Ordering::Less))
                    || matches!(upper_cmp, Some(Ordering::Greater))
            }
            CompareOp::Lt => matches!(lower_cmp, Some(Ordering::Less) | Some(Ordering::Equal)),
            CompareOp::Le => matches!(lower_cmp, Some(Ordering::Less)),
            CompareOp::Gt => matches!(upper_cmp, Some(Ordering::Greater) | Some(Ordering::Equal)),
            CompareOp::Ge => matches!(upper_cmp, Some(Ordering::Greater)),
        }
    }

    /// The column's declared type.
    pub fn value_type(&self) -> &PrimitiveType {
        &self.type_
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::bounds::encode_bound;

    fn int_zone_map(lower: i32, upper: i32) -> ZoneMap {
        let lower_bytes = encode_bound(&Value::Int(lower)).unwrap();
        let upper_bytes = encode_bound(&Value::Int(upper)).unwrap();
        ZoneMap::from_bounds(PrimitiveType::Int, Some(&lower_bytes), Some(&upper_bytes), false).unwrap()
    }

    #[test]
    fn test_can_prune_lt_when_literal_at_or_below_lower() {
        let zm = int_zone_map(10, 20);
        assert!(zm.can_prune(CompareOp::Lt, &Value::Int(10)));
        assert!(!zm.can_prune(CompareOp::Lt, &Value::Int(11)));
    }

    #[test]
    fn test_can_prune_eq_outside_range() {
        let zm = int_zone_map(10, 20);
        assert!(zm.can_prune(CompareOp::Eq, &Value::Int(5)));
        assert!(zm.can_prune(CompareOp::Eq, &Value::Int(25)));
        assert!(!zm.can_prune(CompareOp::Eq, &Value::Int(15)));
    }

    #[test]
    fn test_can_prune_gt_when_literal_at_or_above_upper() {
        let zm = int_zone_map(10, 20);
        assert!(zm.can_prune(CompareOp::Gt, &Value::Int(20)));
        assert!(!zm.can_prune(CompareOp::Gt, &Value::Int(19)));
    }

    #[test]
    fn test_unknown_bounds_never_prune() {
        let zm = ZoneMap::from_bounds(PrimitiveType::Int, None, None, false).unwrap();
        assert!(!zm.can_prune(CompareOp::Eq, &Value::Int(1)));
    }

    #[test]
    fn test_nan_literal_never_prunes() {
        let lower_bytes = encode_bound(&Value::Double(1.0)).unwrap();
        let upper_bytes = encode_bound(&Value::Double(5.0)).unwrap();
        let zm = ZoneMap::from_bounds(PrimitiveType::Double, Some(&lower_bytes), Some(&upper_bytes), false)
            .unwrap();
        assert!(!zm.can_prune(CompareOp::Eq, &Value::Double(f64::NAN)));
    }
}
