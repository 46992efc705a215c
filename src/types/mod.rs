/*!
Classes that model the Iceberg type system and schema (spec §3.1-§3.3, L1).
*/

pub mod decimal;
pub mod partition;
pub mod primitive;
pub mod schema;
pub mod sort;
pub mod value;

pub use decimal::Decimal;
pub use partition::{PartitionField, PartitionSpec, Transform, PARTITION_FIELD_ID_START};
pub use primitive::PrimitiveType;
pub use schema::{AllType, List, Map, NestedField, Schema, Struct};
pub use sort::{NullOrder, SortDirection, SortField, SortOrder};
pub use value::{canonical_row_key, Value};
