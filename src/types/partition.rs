/*!
Partition specs define how partition values are derived from source
fields (spec §3.3). Partition field-ids start at a reserved base so they
never collide with data field-ids.
*/

use lazy_static::lazy_static;
use regex::Regex;
use serde::{
    de::{self, IntoDeserializer},
    Deserialize, Deserializer, Serialize,
};

/// First field-id reserved for partition fields (spec §3.3).
pub const PARTITION_FIELD_ID_START: i32 = 1000;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash)]
#[serde(rename_all = "lowercase", remote = "Self")]
/// A transformation applied to a source column to produce a partition value.
pub enum Transform {
    /// Always produces `null`.
    Void,
    /// Source value, unmodified.
    Identity,
    /// Extract a date/timestamp's year, as years from 1970.
    Year,
    /// Extract a date/timestamp's month, as months from 1970-01.
    Month,
    /// Extract a date/timestamp's day, as days from 1970-01-01.
    Day,
    /// Extract a date/timestamp's hour, as hours from 1970-01-01T00:00.
    Hour,
    /// Hash of the value, modulo `N` buckets.
    Bucket(u32),
    /// Value truncated to `W` (string/binary length, or numeric width).
    Truncate(u32),
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.starts_with("bucket") {
            deserialize_bucket(s.into_deserializer())
        } else if s.starts_with("truncate") {
            deserialize_truncate(s.into_deserializer())
        } else {
            Transform::deserialize(s.into_deserializer())
        }
    }
}

impl Serialize for Transform {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use Transform::*;
        match self {
            Bucket(n) => serializer.serialize_str(&format!("bucket[{n}]")),
            Truncate(w) => serializer.serialize_str(&format!("truncate[{w}]")),
            _ => Transform::serialize(self, serializer),
        }
    }
}

lazy_static! {
    static ref BUCKET_RE: Regex = Regex::new(r#"^bucket\[(?P<n>\d+)\]$"#).unwrap();
    static ref TRUNCATE_RE: Regex = Regex::new(r#"^truncate\[(?P<w>\d+)\]$"#).unwrap();
}

fn deserialize_bucket<'de, D>(deserializer: D) -> Result<Transform, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    let err_msg = format!("Invalid bucket format {this}");
    let caps = BUCKET_RE
        .captures(&this)
        .ok_or_else(|| de::Error::custom(&err_msg))?;
    let n: u32 = caps
        .name("n")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| p.as_str().parse().map_err(|_| de::Error::custom("bucket not u32")))?;
    Ok(Transform::Bucket(n))
}

fn deserialize_truncate<'de, D>(deserializer: D) -> Result<Transform, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    let err_msg = format!("Invalid truncate format {this}");
    let caps = TRUNCATE_RE
        .captures(&this)
        .ok_or_else(|| de::Error::custom(&err_msg))?;
    let w: u32 = caps
        .name("w")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| p.as_str().parse().map_err(|_| de::Error::custom("truncate not u32")))?;
    Ok(Transform::Truncate(w))
}

impl Transform {
    /// `void` drops every row into a single, unpartitioned bucket and never
    /// contributes a meaningful lower/upper bound.
    pub fn is_void(&self) -> bool {
        matches!(self, Transform::Void)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// One field of a partition spec.
pub struct PartitionField {
    /// Source column id from the table's schema.
    pub source_id: i32,
    /// Partition field id; unique within (v2) or across (v3) partition specs.
    pub field_id: i32,
    /// Partition field name.
    pub name: String,
    /// Transform applied to the source column.
    pub transform: Transform,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A named, ordered collection of [PartitionField]s.
pub struct PartitionSpec {
    /// Spec id, unique within the table.
    pub spec_id: i32,
    /// The spec's fields, in declaration order.
    pub fields: Vec<PartitionField>,
}

impl PartitionSpec {
    /// The unpartitioned spec every table metadata starts life with.
    pub fn unpartitioned(spec_id: i32) -> Self {
        PartitionSpec {
            spec_id,
            fields: vec![],
        }
    }

    /// Highest partition field-id currently used by this spec, or `PARTITION_FIELD_ID_START - 1`
    /// if the spec has no fields (so the next allocation starts at the reserved base).
    pub fn max_field_id(&self) -> i32 {
        self.fields
            .iter()
            .map(|f| f.field_id)
            .max()
            .unwrap_or(PARTITION_FIELD_ID_START - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_field_json() {
        let data = r#"
            {"source-id": 4, "field-id": 1000, "name": "ts_day", "transform": "day"}
        "#;
        let field: PartitionField = serde_json::from_str(data).unwrap();
        assert_eq!(field.source_id, 4);
        assert_eq!(field.field_id, 1000);
        assert_eq!(field.transform, Transform::Day);
    }

    #[test]
    fn test_all_transforms_roundtrip() {
        let transforms = vec![
            Transform::Void,
            Transform::Identity,
            Transform::Year,
            Transform::Month,
            Transform::Day,
            Transform::Hour,
            Transform::Bucket(10),
            Transform::Truncate(10),
        ];
        for transform in transforms {
            let field = PartitionField {
                source_id: 4,
                field_id: 1000,
                name: "f".to_string(),
                transform: transform.clone(),
            };
            let json = serde_json::to_string(&field).unwrap();
            let back: PartitionField = serde_json::from_str(&json).unwrap();
            assert_eq!(transform, back.transform);
        }
    }

    #[test]
    fn test_max_field_id_empty_spec_stays_below_reserved_base() {
        let spec = PartitionSpec::unpartitioned(0);
        assert_eq!(spec.max_field_id(), PARTITION_FIELD_ID_START - 1);
    }
}
