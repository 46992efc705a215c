/*!
The type-promotion table (spec §4.6): the closed set of primitive widenings
a schema update may apply, plus component-wise promotion for nested types.
Anything not in this table is [crate::error::IcebergError::IncompatibleType].
*/

use crate::types::{AllType, PrimitiveType};

/// True if `from` may be widened to `to` under spec §4.6's promotion table:
/// `int -> long`, `float -> double`, `decimal(P,S) -> decimal(P',S)` with
/// `P' >= P`, and `fixed(L) -> binary`. Identity is not itself a promotion;
/// callers that also want to allow a no-op type change should check
/// equality separately (see [types_compatible]).
pub fn promote(from: &PrimitiveType, to: &PrimitiveType) -> bool {
    use PrimitiveType::*;
    match (from, to) {
        (Int, Long) => true,
        (Float, Double) => true,
        (Decimal { precision: p1, scale: s1 }, Decimal { precision: p2, scale: s2 }) => s1 == s2 && p2 >= p1,
        (Fixed(_), Binary) => true,
        _ => false,
    }
}

/// True if `new_type` is a legal evolution of `old_type`: either identical,
/// a primitive promotion, or a nested type whose components are each
/// individually compatible (spec §4.6: "complex types promote
/// component-wise").
pub fn types_compatible(old_type: &AllType, new_type: &AllType) -> bool {
    match (old_type, new_type) {
        (AllType::Primitive(a), AllType::Primitive(b)) => a == b || promote(a, b),
        (AllType::List(a), AllType::List(b)) => a.element_required == b.element_required && types_compatible(&a.element, &b.element),
        (AllType::Map(a), AllType::Map(b)) => {
            types_compatible(&a.key, &b.key) && a.value_required == b.value_required && types_compatible(&a.value, &b.value)
        }
        (AllType::Struct(a), AllType::Struct(b)) => {
            a.fields.len() == b.fields.len()
                && a.fields
                    .iter()
                    .zip(b.fields.iter())
                    .all(|(fa, fb)| fa.id == fb.id && types_compatible(&fa.field_type, &fb.field_type))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_to_long_promotes() {
        assert!(promote(&PrimitiveType::Int, &PrimitiveType::Long));
    }

    #[test]
    fn test_long_to_int_does_not_promote() {
        assert!(!promote(&PrimitiveType::Long, &PrimitiveType::Int));
    }

    #[test]
    fn test_decimal_widens_precision_same_scale() {
        let a = PrimitiveType::Decimal { precision: 9, scale: 2 };
        let b = PrimitiveType::Decimal { precision: 12, scale: 2 };
        assert!(promote(&a, &b));
        let c = PrimitiveType::Decimal { precision: 9, scale: 3 };
        assert!(!promote(&a, &c));
    }

    #[test]
    fn test_fixed_to_binary_promotes_regardless_of_length() {
        assert!(promote(&PrimitiveType::Fixed(16), &PrimitiveType::Binary));
    }

    #[test]
    fn test_string_to_int_is_not_in_table() {
        assert!(!promote(&PrimitiveType::String, &PrimitiveType::Int));
    }

    #[test]
    fn test_identity_is_compatible_but_not_a_promotion() {
        assert!(!promote(&PrimitiveType::Int, &PrimitiveType::Int));
        assert!(types_compatible(
            &AllType::Primitive(PrimitiveType::Int),
            &AllType::Primitive(PrimitiveType::Int)
        ));
    }
}
