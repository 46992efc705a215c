/*!
[TableUpdate]: the closed algebra of changes `commit_table` may apply to a
table's metadata in one commit (spec §4.9). Each variant maps onto exactly
one [crate::metadata::TableMetadataBuilder] method.
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::manifest::snapshot::Snapshot;
use crate::metadata::{FormatVersion, RefRetention, TableMetadataBuilder};
use crate::types::partition::PartitionSpec;
use crate::types::schema::Schema;
use crate::types::sort::SortOrder;

/// One change to apply to a table's metadata (spec §4.9's closed update
/// algebra). `commit_table` applies a `Vec<TableUpdate>` in order after all
/// `TableRequirement`s have been checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TableUpdate {
    /// Overwrites `table-uuid`.
    AssignUuid {
        /// The new uuid.
        uuid: Uuid,
    },
    /// Raises `format-version`. Rejected if it would downgrade.
    UpgradeFormatVersion {
        /// The target format version.
        format_version: FormatVersion,
    },
    /// Adds a schema without changing `current-schema-id`.
    AddSchema {
        /// The schema to add.
        schema: Schema,
    },
    /// Points writers at an already-added schema.
    SetCurrentSchema {
        /// The schema id to make current.
        schema_id: i32,
    },
    /// Adds a partition spec without changing `default-spec-id`.
    AddSpec {
        /// The spec to add.
        spec: PartitionSpec,
    },
    /// Points writers at an already-added partition spec.
    SetDefaultSpec {
        /// The spec id to make default.
        spec_id: i32,
    },
    /// Adds a sort order without changing `default-sort-order-id`.
    AddSortOrder {
        /// The sort order to add.
        sort_order: SortOrder,
    },
    /// Points writers at an already-added sort order.
    SetDefaultSortOrder {
        /// The sort order id to make default.
        sort_order_id: i32,
    },
    /// Appends a snapshot and advances `main` (or `branch`, if given).
    AddSnapshot {
        /// The snapshot to append.
        snapshot: Snapshot,
        /// The branch to advance, defaulting to `main`.
        #[serde(skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    /// Sets or replaces a named ref.
    SetSnapshotRef {
        /// The ref name.
        ref_name: String,
        /// The snapshot it should point at.
        snapshot_id: i64,
        /// Its retention policy.
        retention: RefRetention,
    },
    /// Drops snapshots by id (for expiry). Callers are responsible for
    /// ensuring no live ref still points at a removed snapshot.
    RemoveSnapshots {
        /// Ids to drop.
        snapshot_ids: Vec<i64>,
    },
    /// Removes a named ref.
    RemoveSnapshotRef {
        /// The ref name.
        ref_name: String,
    },
    /// Merges properties into the table's property map.
    SetProperties {
        /// Key/value pairs to set.
        updates: HashMap<String, String>,
    },
    /// Removes properties by key.
    RemoveProperties {
        /// Keys to remove.
        removals: Vec<String>,
    },
    /// Overwrites `location`.
    SetLocation {
        /// The new location.
        location: String,
    },
}

impl TableUpdate {
    /// Applies this update to `builder`, returning the updated builder.
    pub fn apply(self, builder: TableMetadataBuilder) -> Result<TableMetadataBuilder> {
        match self {
            TableUpdate::AssignUuid { uuid } => Ok(builder.assign_uuid(uuid)),
            TableUpdate::UpgradeFormatVersion { format_version } => builder.upgrade_format_version(format_version),
            TableUpdate::AddSchema { schema } => Ok(builder.add_schema(schema)),
            TableUpdate::SetCurrentSchema { schema_id } => builder.set_current_schema(schema_id),
            TableUpdate::AddSpec { spec } => Ok(builder.add_partition_spec(spec)),
            TableUpdate::SetDefaultSpec { spec_id } => builder.set_default_spec(spec_id),
            TableUpdate::AddSortOrder { sort_order } => Ok(builder.add_sort_order(sort_order)),
            TableUpdate::SetDefaultSortOrder { sort_order_id } => builder.set_default_sort_order(sort_order_id),
            TableUpdate::AddSnapshot { snapshot, branch } => Ok(builder.add_snapshot(snapshot, branch.as_deref())),
            TableUpdate::SetSnapshotRef { ref_name, snapshot_id, retention } => builder.set_snapshot_ref(&ref_name, snapshot_id, retention),
            TableUpdate::RemoveSnapshots { snapshot_ids } => Ok(builder.remove_snapshots(&snapshot_ids)),
            TableUpdate::RemoveSnapshotRef { ref_name } => Ok(builder.remove_snapshot_ref(&ref_name)),
            TableUpdate::SetProperties { updates } => Ok(builder.set_properties(updates)),
            TableUpdate::RemoveProperties { removals } => Ok(builder.remove_properties(&removals)),
            TableUpdate::SetLocation { location } => Ok(builder.set_location(location)),
        }
    }

    /// Applies `updates` in order to `builder`.
    pub fn apply_all(updates: Vec<TableUpdate>, mut builder: TableMetadataBuilder) -> Result<TableMetadataBuilder> {
        for update in updates {
            builder = update.apply(builder)?;
        }
        Ok(builder)
    }
}
