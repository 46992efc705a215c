/*!
[TableRequirement]: preconditions `commit_table` checks against the
currently-loaded metadata before applying any [crate::catalog::update::TableUpdate]
(spec §4.9).
*/

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IcebergError, Result};
use crate::metadata::TableMetadata;

/// A precondition `commit_table` must hold before applying updates. A
/// failed requirement surfaces as [IcebergError::Conflict], which the
/// commit retry loop treats as retriable: the caller is expected to
/// reload, re-derive its updates against fresh metadata, and retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TableRequirement {
    /// The table's `table-uuid` must equal `uuid`.
    AssertTableUuid {
        /// Expected uuid.
        uuid: Uuid,
    },
    /// `current-schema-id` must equal `current_schema_id`.
    AssertCurrentSchemaId {
        /// Expected schema id.
        current_schema_id: i32,
    },
    /// The named ref must point at `snapshot_id` (`None` meaning the ref
    /// must not exist).
    AssertRefSnapshotId {
        /// The ref name, e.g. `"main"`.
        r#ref: String,
        /// Expected snapshot id, or `None` if the ref must be absent.
        snapshot_id: Option<i64>,
    },
}

impl TableRequirement {
    /// Checks this requirement against `metadata`, failing with
    /// [IcebergError::Conflict] if it does not hold.
    pub fn check(&self, metadata: &TableMetadata) -> Result<()> {
        match self {
            TableRequirement::AssertTableUuid { uuid } => {
                if metadata.table_uuid != *uuid {
                    return Err(IcebergError::Conflict(format!(
                        "table uuid {} does not match expected {uuid}",
                        metadata.table_uuid
                    )));
                }
            }
            TableRequirement::AssertCurrentSchemaId { current_schema_id } => {
                if metadata.current_schema_id != *current_schema_id {
                    return Err(IcebergError::Conflict(format!(
                        "current schema id {} does not match expected {current_schema_id}",
                        metadata.current_schema_id
                    )));
                }
            }
            TableRequirement::AssertRefSnapshotId { r#ref, snapshot_id } => {
                let actual = metadata.refs.get(r#ref).map(|entry| entry.snapshot_id);
                if actual != *snapshot_id {
                    return Err(IcebergError::Conflict(format!(
                        "ref {ref} points at {actual:?}, expected {snapshot_id:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FormatVersion, TableMetadataBuilder};
    use crate::types::primitive::PrimitiveType;
    use crate::types::schema::{AllType, NestedField, Schema, Struct};

    fn simple_schema() -> Schema {
        Schema {
            schema_id: 0,
            identifier_field_ids: None,
            struct_fields: Struct {
                fields: vec![NestedField {
                    id: 1,
                    name: "id".to_string(),
                    required: true,
                    field_type: AllType::Primitive(PrimitiveType::Long),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                }],
            },
        }
    }

    #[test]
    fn test_assert_table_uuid() {
        let metadata = TableMetadataBuilder::new("s3://b/t", FormatVersion::V2, simple_schema()).build(1);
        assert!(TableRequirement::AssertTableUuid { uuid: metadata.table_uuid }.check(&metadata).is_ok());
        assert!(TableRequirement::AssertTableUuid { uuid: Uuid::new_v4() }.check(&metadata).is_err());
    }

    #[test]
    fn test_assert_ref_snapshot_id_absent() {
        let metadata = TableMetadataBuilder::new("s3://b/t", FormatVersion::V2, simple_schema()).build(1);
        assert!(TableRequirement::AssertRefSnapshotId { r#ref: "main".to_string(), snapshot_id: None }
            .check(&metadata)
            .is_ok());
        assert!(TableRequirement::AssertRefSnapshotId { r#ref: "main".to_string(), snapshot_id: Some(1) }
            .check(&metadata)
            .is_err());
    }
}
