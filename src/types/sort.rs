/*!
Definition of [sort orders](https://iceberg.apache.org/spec/#sorting) for a
table (spec §3.3). A [SortOrder] is an ordered list of [SortField]s, each
with a [Transform], [SortDirection], and [NullOrder].
*/

use serde::{Deserialize, Serialize};

use super::partition::Transform;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
/// Ascending or descending sort direction.
pub enum SortDirection {
    /// Sort the field ascending.
    #[serde(rename = "asc")]
    Ascending,
    /// Sort the field descending.
    #[serde(rename = "desc")]
    Descending,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
/// Where nulls sort relative to non-null values.
pub enum NullOrder {
    /// Place nulls first.
    #[serde(rename = "nulls-first")]
    First,
    /// Place nulls last.
    #[serde(rename = "nulls-last")]
    Last,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// One field of a sort order.
pub struct SortField {
    /// Source column id from the table's schema.
    pub source_id: i32,
    /// Transform used to produce the value to sort on.
    pub transform: Transform,
    /// Sort direction.
    pub direction: SortDirection,
    /// Null ordering.
    pub null_order: NullOrder,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A sort order: fields are applied in list order.
pub struct SortOrder {
    /// Sort order id; `0` means unsorted.
    pub order_id: i32,
    /// The order's fields, in application order.
    pub fields: Vec<SortField>,
}

impl SortOrder {
    /// The unsorted order every table metadata starts life with.
    pub fn unsorted() -> Self {
        SortOrder {
            order_id: 0,
            fields: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_json() {
        let data = r#"
            {"transform": "bucket[4]", "source-id": 3, "direction": "desc", "null-order": "nulls-last"}
        "#;
        let field: SortField = serde_json::from_str(data).unwrap();
        assert_eq!(field.source_id, 3);
        assert_eq!(field.transform, Transform::Bucket(4));
        assert_eq!(field.direction, SortDirection::Descending);
        assert_eq!(field.null_order, NullOrder::Last);
    }

    #[test]
    fn test_sort_order_json() {
        let data = r#"
            {"order-id": 1, "fields": [
                {"transform": "bucket[4]", "source-id": 3, "direction": "desc", "null-order": "nulls-last"}
            ]}
        "#;
        let order: SortOrder = serde_json::from_str(data).unwrap();
        assert_eq!(order.order_id, 1);
        assert_eq!(order.fields.len(), 1);
    }

    #[test]
    fn test_unsorted_has_order_id_zero() {
        assert_eq!(SortOrder::unsorted().order_id, 0);
    }
}
