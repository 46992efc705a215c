/*!
Primitive types within a schema (spec §3.1).

`Decimal`, `Fixed`, `Geometry` and `Geography` carry parameters and are
given hand-written `Serialize`/`Deserialize` impls so that the compact
string form (`decimal(9,2)`, `fixed[16]`, `geometry(EPSG:4326)`) round
trips to the same compact form rather than an object encoding.
*/

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{
    de::{self, IntoDeserializer},
    Deserialize, Deserializer, Serialize,
};

use crate::error::{IcebergError, Result};

/// Default coordinate reference system for `geometry`/`geography` when none is given.
pub const DEFAULT_CRS: &str = "OGC:CRS84";
/// Default geodesic algorithm for `geography` when none is given.
pub const DEFAULT_GEOGRAPHY_ALGORITHM: &str = "spherical";

/// Allowed geodesic algorithms for the `geography` type (Iceberg v3).
pub const GEOGRAPHY_ALGORITHMS: &[&str] = &["spherical", "vincenty", "thomas", "andoyer", "karney"];

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[serde(remote = "Self")]
/// Primitive types within a schema.
pub enum PrimitiveType {
    /// True or False.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating point.
    Float,
    /// 64-bit IEEE 754 floating point.
    Double,
    /// Fixed point decimal; `precision` total digits, `scale` digits right of the point.
    Decimal {
        /// The number of digits in the number. Must be 38 or less.
        precision: u32,
        /// The number of digits to the right of the decimal point.
        scale: u32,
    },
    /// Calendar date without timezone or time, stored as days since epoch.
    Date,
    /// Time of day without date or timezone, stored as microseconds.
    Time,
    /// Timestamp without timezone, microsecond precision.
    Timestamp,
    /// Timestamp with timezone, microsecond precision.
    Timestamptz,
    /// Timestamp without timezone, nanosecond precision (v3).
    TimestampNs,
    /// Timestamp with timezone, nanosecond precision (v3).
    TimestamptzNs,
    /// Arbitrary-length UTF-8 character sequence.
    String,
    /// Universally unique identifier, 16 bytes.
    Uuid,
    /// Fixed-length byte array of `L` bytes.
    Fixed(u64),
    /// Arbitrary-length byte array.
    Binary,
    /// Semi-structured value (v2+).
    Variant,
    /// A field whose type is not yet known; must be optional and serializes as null.
    Unknown,
    /// Geospatial vector geometry over a coordinate reference system.
    Geometry {
        /// Coordinate reference system, e.g. `OGC:CRS84` or `EPSG:4326`.
        crs: String,
    },
    /// Geospatial vector geography over a coordinate reference system and geodesic algorithm.
    Geography {
        /// Coordinate reference system, e.g. `OGC:CRS84` or `EPSG:4326`.
        crs: String,
        /// Geodesic distance/area algorithm, e.g. `spherical` or `vincenty`.
        algorithm: String,
    },
}

impl Serialize for PrimitiveType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use PrimitiveType::*;
        match self {
            Decimal { precision, scale } => {
                serializer.serialize_str(&format!("decimal({precision},{scale})"))
            }
            Fixed(l) => serializer.serialize_str(&format!("fixed[{l}]")),
            Geometry { crs } => {
                if crs == DEFAULT_CRS {
                    serializer.serialize_str("geometry")
                } else {
                    serializer.serialize_str(&format!("geometry({crs})"))
                }
            }
            Geography { crs, algorithm } => {
                match (crs.as_str(), algorithm.as_str()) {
                    (c, a) if c == DEFAULT_CRS && a == DEFAULT_GEOGRAPHY_ALGORITHM => {
                        serializer.serialize_str("geography")
                    }
                    (c, a) if a == DEFAULT_GEOGRAPHY_ALGORITHM => {
                        serializer.serialize_str(&format!("geography({c})"))
                    }
                    (c, a) => serializer.serialize_str(&format!("geography({c}, {a})")),
                }
            }
            _ => PrimitiveType::serialize(self, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PrimitiveType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.starts_with("decimal") {
            deserialize_decimal(s.into_deserializer())
        } else if s.starts_with("fixed") {
            deserialize_fixed(s.into_deserializer())
        } else if s.starts_with("geometry") {
            deserialize_geometry(s.into_deserializer())
        } else if s.starts_with("geography") {
            deserialize_geography(s.into_deserializer())
        } else {
            PrimitiveType::deserialize(s.into_deserializer())
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Int => write!(f, "int"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Double => write!(f, "double"),
            PrimitiveType::Decimal { precision, scale } => {
                write!(f, "decimal({precision},{scale})")
            }
            PrimitiveType::Date => write!(f, "date"),
            PrimitiveType::Time => write!(f, "time"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
            PrimitiveType::Timestamptz => write!(f, "timestamptz"),
            PrimitiveType::TimestampNs => write!(f, "timestamp_ns"),
            PrimitiveType::TimestamptzNs => write!(f, "timestamptz_ns"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Uuid => write!(f, "uuid"),
            PrimitiveType::Fixed(l) => write!(f, "fixed[{l}]"),
            PrimitiveType::Binary => write!(f, "binary"),
            PrimitiveType::Variant => write!(f, "variant"),
            PrimitiveType::Unknown => write!(f, "unknown"),
            PrimitiveType::Geometry { crs } => write!(f, "geometry({crs})"),
            PrimitiveType::Geography { crs, algorithm } => {
                write!(f, "geography({crs}, {algorithm})")
            }
        }
    }
}

impl PrimitiveType {
    /// A field of this type must always be optional and serialize as null
    /// (spec §3.1: unknown-typed fields).
    pub fn must_be_optional(&self) -> bool {
        matches!(self, PrimitiveType::Unknown)
    }

    /// Whether a literal default for this type must be null (spec §3.2 invariant iii).
    pub fn default_must_be_null(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Variant
                | PrimitiveType::Unknown
                | PrimitiveType::Geometry { .. }
                | PrimitiveType::Geography { .. }
        )
    }
}

lazy_static! {
    static ref DECIMAL_RE: Regex = Regex::new(r#"^decimal\((?P<p>\d+),\s*(?P<s>\d+)\)$"#).unwrap();
    static ref FIXED_RE: Regex = Regex::new(r#"^fixed\[(?P<l>\d+)\]$"#).unwrap();
    static ref GEOMETRY_RE: Regex = Regex::new(r#"^geometry(\((?P<crs>[^)]*)\))?$"#).unwrap();
    static ref GEOGRAPHY_RE: Regex =
        Regex::new(r#"^geography(\((?P<crs>[^,)]*)(,\s*(?P<algo>[^)]+))?\))?$"#).unwrap();
}

fn deserialize_decimal<'de, D>(deserializer: D) -> std::result::Result<PrimitiveType, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    let err_msg = format!("Invalid decimal format {this}");
    let caps = DECIMAL_RE
        .captures(&this)
        .ok_or_else(|| de::Error::custom(&err_msg))?;
    let precision: u32 = caps
        .name("p")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| {
            p.as_str()
                .parse()
                .map_err(|_| de::Error::custom("precision not u32"))
        })?;
    let scale: u32 = caps
        .name("s")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| {
            p.as_str()
                .parse()
                .map_err(|_| de::Error::custom("scale not u32"))
        })?;
    Ok(PrimitiveType::Decimal { precision, scale })
}

fn deserialize_fixed<'de, D>(deserializer: D) -> std::result::Result<PrimitiveType, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    let err_msg = format!("Invalid fixed format {this}");
    let caps = FIXED_RE
        .captures(&this)
        .ok_or_else(|| de::Error::custom(&err_msg))?;
    let length: u64 = caps
        .name("l")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| {
            p.as_str()
                .parse()
                .map_err(|_| de::Error::custom("length not u64"))
        })?;
    Ok(PrimitiveType::Fixed(length))
}

fn deserialize_geometry<'de, D>(deserializer: D) -> std::result::Result<PrimitiveType, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    let caps = GEOMETRY_RE
        .captures(&this)
        .ok_or_else(|| de::Error::custom(format!("Invalid geometry format {this}")))?;
    let crs = caps
        .name("crs")
        .map(|c| c.as_str().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CRS.to_string());
    Ok(PrimitiveType::Geometry { crs })
}

fn deserialize_geography<'de, D>(deserializer: D) -> std::result::Result<PrimitiveType, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    let caps = GEOGRAPHY_RE
        .captures(&this)
        .ok_or_else(|| de::Error::custom(format!("Invalid geography format {this}")))?;
    let crs = caps
        .name("crs")
        .map(|c| c.as_str().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CRS.to_string());
    let algorithm = caps
        .name("algo")
        .map(|a| a.as_str().trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DEFAULT_GEOGRAPHY_ALGORITHM.to_string());
    Ok(PrimitiveType::Geography { crs, algorithm })
}

/// Validates that a geography algorithm is one of the allowed set (spec §7: `InvalidInput`).
pub fn validate_geography_algorithm(algorithm: &str) -> Result<()> {
    if GEOGRAPHY_ALGORITHMS.contains(&algorithm) {
        Ok(())
    } else {
        Err(IcebergError::InvalidInput(format!(
            "invalid geography algorithm: {algorithm}"
        )))
    }
}
