/*!
[TableMetadata] and [TableMetadataBuilder] (spec §3.7, §4.7): the table's
complete, immutable state as of one version, and the builder that produces
a successor value. `TableMetadata` itself never mutates in place; every
"update" is a builder call that consumes the old value and returns a new
one with `last-updated-ms` restamped.
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use uuid::Uuid;

use crate::error::{IcebergError, Result};
use crate::manifest::manager::{RefType, SnapshotManager};
use crate::manifest::snapshot::Snapshot;
use crate::types::partition::PartitionSpec;
use crate::types::schema::Schema;
use crate::types::sort::SortOrder;

/// Table format version this crate understands (spec §3.7). Any other
/// value in a metadata JSON's `format-version` is fatal to the read
/// (spec §7: "unrecognized format-version is fatal").
#[derive(Debug, Serialize_repr, Deserialize_repr, PartialEq, Eq, Clone, Copy)]
#[repr(i32)]
pub enum FormatVersion {
    /// Format version 2: row-level deletes, sequence numbers, long snapshot ids.
    V2 = 2,
    /// Format version 3: adds deletion vectors, row lineage, nanosecond timestamps,
    /// variant, geospatial types, multi-arg transforms.
    V3 = 3,
}

impl FormatVersion {
    /// Parses a raw integer, rejecting anything this crate does not implement.
    pub fn parse(raw: i32) -> Result<Self> {
        match raw {
            2 => Ok(FormatVersion::V2),
            3 => Ok(FormatVersion::V3),
            other => Err(IcebergError::InvalidInput(format!("unsupported format-version: {other}"))),
        }
    }
}

/// One entry of `metadata-log`: a prior metadata file location and when it
/// stopped being current (spec §3.7).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataLogEntry {
    /// Path to the prior metadata JSON.
    pub metadata_file: String,
    /// When this entry was superseded, milliseconds since epoch.
    pub timestamp_ms: i64,
}

/// One entry of `snapshot-log`: a prior `current-snapshot-id` and when it
/// changed (spec §3.7).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotLogEntry {
    /// The snapshot id that was current.
    pub snapshot_id: i64,
    /// When this entry was recorded, milliseconds since epoch.
    pub timestamp_ms: i64,
}

/// Retention policy carried by a branch or tag ref (spec §4.9's `refs`).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum RefRetention {
    /// A mutable branch pointer.
    #[serde(rename_all = "kebab-case")]
    Branch {
        /// Minimum snapshots to retain while expiring.
        #[serde(skip_serializing_if = "Option::is_none")]
        min_snapshots_to_keep: Option<i32>,
        /// Max snapshot age to retain while expiring.
        #[serde(skip_serializing_if = "Option::is_none")]
        max_snapshot_age_ms: Option<i64>,
        /// Max age of the ref itself.
        #[serde(skip_serializing_if = "Option::is_none")]
        max_ref_age_ms: Option<i64>,
    },
    /// An immutable tag pointer.
    #[serde(rename_all = "kebab-case")]
    Tag {
        /// Max age of the ref itself.
        max_ref_age_ms: i64,
    },
}

/// A named snapshot reference as it appears in `TableMetadata.refs`
/// (spec §3.7 / §4.9).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RefEntry {
    /// The snapshot this ref currently points at.
    pub snapshot_id: i64,
    /// The ref's retention policy, tagged `branch` or `tag`.
    #[serde(flatten)]
    pub retention: RefRetention,
}

/// A table's complete metadata as of one version (spec §3.7). Immutable:
/// every mutator on [TableMetadataBuilder] produces a new value rather than
/// editing this one in place.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    /// `2` or `3`; rejects any other value on parse.
    pub format_version: FormatVersion,
    /// Stable identifier for the table, generated once at creation.
    pub table_uuid: Uuid,
    /// Base location all relative paths are resolved against.
    pub location: String,
    /// Highest sequence number assigned to any snapshot.
    pub last_sequence_number: i64,
    /// When this metadata value was produced, milliseconds since epoch.
    pub last_updated_ms: i64,
    /// Highest field-id assigned anywhere in `schemas`.
    pub last_column_id: i32,
    /// Every schema this table has ever had.
    pub schemas: Vec<Schema>,
    /// `schema-id` of the schema writers should use by default.
    pub current_schema_id: i32,
    /// Every partition spec this table has ever had.
    pub partition_specs: Vec<PartitionSpec>,
    /// `spec-id` of the partition spec writers should use by default.
    pub default_spec_id: i32,
    /// Highest partition field-id assigned across all `partition_specs`.
    pub last_partition_id: i32,
    /// Every sort order this table has ever had.
    pub sort_orders: Vec<SortOrder>,
    /// `order-id` of the sort order writers should use by default.
    pub default_sort_order_id: i32,
    /// Free-form string properties (e.g. `commit.retry.num-retries`).
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// The snapshot `main` currently resolves to, or `None` for an empty table.
    pub current_snapshot_id: Option<i64>,
    /// Every snapshot still reachable from any ref.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    /// History of `current-snapshot-id` changes.
    #[serde(default)]
    pub snapshot_log: Vec<SnapshotLogEntry>,
    /// History of prior metadata file locations.
    #[serde(default)]
    pub metadata_log: Vec<MetadataLogEntry>,
    /// Named snapshot references, always including `main` once any snapshot exists.
    #[serde(default)]
    pub refs: HashMap<String, RefEntry>,
    /// v3: stable row-id the next row added to the table will receive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_row_id: Option<i64>,
    /// v3: per-key-id encryption metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_keys: Option<HashMap<i32, String>>,
}

impl TableMetadata {
    /// The schema in effect for new writes.
    pub fn current_schema(&self) -> Result<&Schema> {
        self.schemas
            .iter()
            .find(|s| s.schema_id == self.current_schema_id)
            .ok_or_else(|| IcebergError::NotFound(format!("schema {} not found", self.current_schema_id)))
    }

    /// The partition spec in effect for new writes.
    pub fn default_spec(&self) -> Result<&PartitionSpec> {
        self.partition_specs
            .iter()
            .find(|s| s.spec_id == self.default_spec_id)
            .ok_or_else(|| IcebergError::NotFound(format!("partition spec {} not found", self.default_spec_id)))
    }

    /// The sort order in effect for new writes.
    pub fn default_sort_order(&self) -> Result<&SortOrder> {
        self.sort_orders
            .iter()
            .find(|s| s.order_id == self.default_sort_order_id)
            .ok_or_else(|| IcebergError::NotFound(format!("sort order {} not found", self.default_sort_order_id)))
    }

    /// The current snapshot (`main`'s tip), if the table has ever been written to.
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        let id = self.current_snapshot_id?;
        self.snapshots.iter().find(|s| s.snapshot_id == id)
    }

    /// Looks up a snapshot by id among those still tracked.
    pub fn snapshot_by_id(&self, id: i64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.snapshot_id == id)
    }

    /// Builds a [SnapshotManager] view over this metadata's snapshots and refs.
    pub fn snapshot_manager(&self) -> SnapshotManager {
        let refs = self
            .refs
            .iter()
            .map(|(name, entry)| {
                let ref_type = match entry.retention {
                    RefRetention::Branch { .. } => RefType::Branch,
                    RefRetention::Tag { .. } => RefType::Tag,
                };
                (
                    name.clone(),
                    crate::manifest::manager::SnapshotReference {
                        snapshot_id: entry.snapshot_id,
                        ref_type,
                        min_snapshots_to_keep: match &entry.retention {
                            RefRetention::Branch { min_snapshots_to_keep, .. } => *min_snapshots_to_keep,
                            RefRetention::Tag { .. } => None,
                        },
                        max_snapshot_age_ms: match &entry.retention {
                            RefRetention::Branch { max_snapshot_age_ms, .. } => *max_snapshot_age_ms,
                            RefRetention::Tag { .. } => None,
                        },
                        max_ref_age_ms: match &entry.retention {
                            RefRetention::Branch { max_ref_age_ms, .. } => *max_ref_age_ms,
                            RefRetention::Tag { max_ref_age_ms } => Some(*max_ref_age_ms),
                        },
                    },
                )
            })
            .collect();
        SnapshotManager::new(self.snapshots.clone(), refs, self.last_sequence_number)
    }

    /// Serializes to canonical JSON (stable key order, per struct field
    /// declaration order; spec §4.7).
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses canonical JSON, rejecting an unsupported `format-version`.
    ///
    /// `format-version` is checked against [FormatVersion::parse] before the
    /// full struct is deserialized, so an unrecognized version surfaces as
    /// `IcebergError::InvalidInput` (spec §7, §8.3 S6) rather than the
    /// generic `serde_json` error `Deserialize_repr` would otherwise raise.
    pub fn from_json(data: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(data)?;
        let version = raw
            .get("format-version")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| IcebergError::InvalidInput("missing format-version".to_string()))?;
        FormatVersion::parse(version as i32)?;
        Ok(serde_json::from_str(data)?)
    }

    /// Starts a builder that mutates this metadata into a successor value.
    pub fn into_builder(self) -> TableMetadataBuilder {
        TableMetadataBuilder { metadata: self }
    }
}

/// Produces a fresh [TableMetadata] for a brand-new table (spec §4.7).
pub struct TableMetadataBuilder {
    metadata: TableMetadata,
}

impl TableMetadataBuilder {
    /// Starts a new table at `location` with its first schema. The schema's
    /// highest field-id seeds `last-column-id`; an unpartitioned spec and
    /// the unsorted order are installed as defaults.
    pub fn new(location: &str, format_version: FormatVersion, schema: Schema) -> Self {
        let last_column_id = schema.find_max_field_id();
        let schema_id = schema.schema_id;
        let unpartitioned = PartitionSpec::unpartitioned(0);
        let unsorted = SortOrder::unsorted();
        TableMetadataBuilder {
            metadata: TableMetadata {
                format_version,
                table_uuid: Uuid::new_v4(),
                location: location.to_string(),
                last_sequence_number: 0,
                last_updated_ms: 0,
                last_column_id,
                schemas: vec![schema],
                current_schema_id: schema_id,
                partition_specs: vec![unpartitioned],
                default_spec_id: 0,
                last_partition_id: crate::types::partition::PARTITION_FIELD_ID_START - 1,
                sort_orders: vec![unsorted],
                default_sort_order_id: 0,
                properties: HashMap::new(),
                current_snapshot_id: None,
                snapshots: Vec::new(),
                snapshot_log: Vec::new(),
                metadata_log: Vec::new(),
                refs: HashMap::new(),
                next_row_id: if matches!(format_version, FormatVersion::V3) { Some(0) } else { None },
                encryption_keys: None,
            },
        }
    }

    /// Resumes building from an existing metadata value (the commit path:
    /// load current metadata, then apply a caller's proposed changes).
    pub fn from_metadata(metadata: TableMetadata) -> Self {
        TableMetadataBuilder { metadata }
    }

    /// Overwrites `table-uuid` (the `assign-uuid` catalog update).
    pub fn assign_uuid(mut self, uuid: Uuid) -> Self {
        self.metadata.table_uuid = uuid;
        self
    }

    /// Raises `format-version` (the `upgrade-format-version` catalog
    /// update). Rejects a downgrade.
    pub fn upgrade_format_version(mut self, version: FormatVersion) -> Result<Self> {
        if (version as i32) < (self.metadata.format_version as i32) {
            return Err(IcebergError::InvalidInput(format!(
                "cannot downgrade format-version {} to {}",
                self.metadata.format_version as i32, version as i32
            )));
        }
        self.metadata.format_version = version;
        if matches!(version, FormatVersion::V3) && self.metadata.next_row_id.is_none() {
            self.metadata.next_row_id = Some(0);
        }
        Ok(self)
    }

    /// Overwrites `location` (the `set-location` catalog update).
    pub fn set_location(mut self, location: String) -> Self {
        self.metadata.location = location;
        self
    }

    /// Adds a new schema, bumping `last-column-id` if the schema introduces
    /// higher field-ids. Does not change `current-schema-id`.
    pub fn add_schema(mut self, schema: Schema) -> Self {
        let max_id = schema.find_max_field_id();
        self.metadata.last_column_id = self.metadata.last_column_id.max(max_id);
        self.metadata.schemas.push(schema);
        self
    }

    /// Points writers at schema `id`. Fails if no such schema has been added.
    pub fn set_current_schema(mut self, id: i32) -> Result<Self> {
        if !self.metadata.schemas.iter().any(|s| s.schema_id == id) {
            return Err(IcebergError::NotFound(format!("schema {id} not found")));
        }
        self.metadata.current_schema_id = id;
        Ok(self)
    }

    /// Adds a new partition spec, bumping `last-partition-id` if it
    /// introduces higher field-ids. Does not change `default-spec-id`.
    pub fn add_partition_spec(mut self, spec: PartitionSpec) -> Self {
        if let Some(max) = spec.fields.iter().map(|f| f.field_id).max() {
            self.metadata.last_partition_id = self.metadata.last_partition_id.max(max);
        }
        self.metadata.partition_specs.push(spec);
        self
    }

    /// Points writers at partition spec `id`. Fails if no such spec exists.
    pub fn set_default_spec(mut self, id: i32) -> Result<Self> {
        if !self.metadata.partition_specs.iter().any(|s| s.spec_id == id) {
            return Err(IcebergError::NotFound(format!("partition spec {id} not found")));
        }
        self.metadata.default_spec_id = id;
        Ok(self)
    }

    /// Adds a new sort order. Does not change `default-sort-order-id`.
    pub fn add_sort_order(mut self, order: SortOrder) -> Self {
        self.metadata.sort_orders.push(order);
        self
    }

    /// Points writers at sort order `id`. Fails if no such order exists.
    pub fn set_default_sort_order(mut self, id: i32) -> Result<Self> {
        if !self.metadata.sort_orders.iter().any(|s| s.order_id == id) {
            return Err(IcebergError::NotFound(format!("sort order {id} not found")));
        }
        self.metadata.default_sort_order_id = id;
        Ok(self)
    }

    /// Merges `props` into the table's property map, overwriting existing keys.
    pub fn set_properties(mut self, props: HashMap<String, String>) -> Self {
        self.metadata.properties.extend(props);
        self
    }

    /// Removes the named properties, if present.
    pub fn remove_properties(mut self, keys: &[String]) -> Self {
        for key in keys {
            self.metadata.properties.remove(key);
        }
        self
    }

    /// Appends `snapshot`, advances `main` to it (or `branch` if given), logs
    /// the change to `snapshot-log`, and bumps `last-sequence-number` and
    /// `current-snapshot-id` (spec §4.7).
    pub fn add_snapshot(mut self, snapshot: Snapshot, branch: Option<&str>) -> Self {
        let branch_name = branch.unwrap_or(crate::manifest::manager::MAIN_BRANCH);
        self.metadata.last_sequence_number = self.metadata.last_sequence_number.max(snapshot.sequence_number);
        if branch_name == crate::manifest::manager::MAIN_BRANCH {
            self.metadata.current_snapshot_id = Some(snapshot.snapshot_id);
            self.metadata.snapshot_log.push(SnapshotLogEntry {
                snapshot_id: snapshot.snapshot_id,
                timestamp_ms: snapshot.timestamp_ms,
            });
        }
        self.metadata.refs.insert(
            branch_name.to_string(),
            RefEntry {
                snapshot_id: snapshot.snapshot_id,
                retention: RefRetention::Branch {
                    min_snapshots_to_keep: None,
                    max_snapshot_age_ms: None,
                    max_ref_age_ms: None,
                },
            },
        );
        self.metadata.snapshots.push(snapshot);
        self
    }

    /// Sets or replaces a named ref directly (branches and tags both).
    pub fn set_snapshot_ref(mut self, name: &str, snapshot_id: i64, retention: RefRetention) -> Result<Self> {
        if !self.metadata.snapshots.iter().any(|s| s.snapshot_id == snapshot_id) {
            return Err(IcebergError::NotFound(format!("snapshot {snapshot_id} not found")));
        }
        self.metadata.refs.insert(name.to_string(), RefEntry { snapshot_id, retention });
        Ok(self)
    }

    /// Removes a named ref.
    pub fn remove_snapshot_ref(mut self, name: &str) -> Self {
        self.metadata.refs.remove(name);
        self
    }

    /// Drops snapshots by id that are no longer referenced by any ref, for
    /// expiry (the caller is responsible for deciding which ids are safe).
    pub fn remove_snapshots(mut self, ids: &[i64]) -> Self {
        self.metadata.snapshots.retain(|s| !ids.contains(&s.snapshot_id));
        self
    }

    /// Appends a `metadata-log` entry recording the location this metadata
    /// value is superseding.
    pub fn add_metadata_log_entry(mut self, metadata_file: String, timestamp_ms: i64) -> Self {
        self.metadata.metadata_log.push(MetadataLogEntry { metadata_file, timestamp_ms });
        self
    }

    /// Truncates `metadata-log` to `retain` most-recent entries plus
    /// anything newer than `max_age_ms` relative to `now_ms` (spec §4.8
    /// "cleanup of old metadata").
    pub fn truncate_metadata_log(mut self, retain: usize, max_age_ms: i64, now_ms: i64) -> Self {
        let cutoff = now_ms - max_age_ms;
        let len = self.metadata.metadata_log.len();
        self.metadata.metadata_log = self
            .metadata
            .metadata_log
            .into_iter()
            .enumerate()
            .filter(|(idx, entry)| *idx >= len.saturating_sub(retain) || entry.timestamp_ms >= cutoff)
            .map(|(_, entry)| entry)
            .collect();
        self
    }

    /// Finalizes the metadata, stamping `last-updated-ms`.
    pub fn build(mut self, now_ms: i64) -> TableMetadata {
        self.metadata.last_updated_ms = now_ms;
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::{AllType, NestedField, Struct};
    use crate::types::primitive::PrimitiveType;

    fn simple_schema() -> Schema {
        Schema {
            schema_id: 0,
            identifier_field_ids: Some(vec![1]),
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
    fn test_new_table_seeds_defaults() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema()).build(1_700_000_000_000);
        assert_eq!(metadata.last_column_id, 1);
        assert_eq!(metadata.current_schema_id, 0);
        assert_eq!(metadata.default_spec_id, 0);
        assert_eq!(metadata.partition_specs.len(), 1);
        assert_eq!(metadata.sort_orders.len(), 1);
        assert!(metadata.current_snapshot().is_none());
        assert_eq!(metadata.last_updated_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_v3_seeds_next_row_id() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V3, simple_schema()).build(1);
        assert_eq!(metadata.next_row_id, Some(0));
    }

    #[test]
    fn test_add_snapshot_advances_main_and_logs() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema()).build(1);
        let snap = crate::manifest::snapshot::SnapshotBuilder::new(1, None, "snap-1.avro".to_string(), crate::manifest::snapshot::Operation::Append, 2, Some(0)).build();
        let snap_id = snap.snapshot_id;
        let metadata = metadata.into_builder().add_snapshot(snap, None).build(2);
        assert_eq!(metadata.current_snapshot_id, Some(snap_id));
        assert_eq!(metadata.snapshot_log.len(), 1);
        assert_eq!(metadata.last_sequence_number, 1);
        assert_eq!(metadata.refs.get("main").unwrap().snapshot_id, snap_id);
    }

    #[test]
    fn test_set_current_schema_rejects_unknown() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema()).build(1);
        assert!(metadata.into_builder().set_current_schema(99).is_err());
    }

    #[test]
    fn test_remove_properties() {
        let mut props = HashMap::new();
        props.insert("a".to_string(), "1".to_string());
        props.insert("b".to_string(), "2".to_string());
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema())
            .set_properties(props)
            .remove_properties(&["a".to_string()])
            .build(1);
        assert_eq!(metadata.properties.get("a"), None);
        assert_eq!(metadata.properties.get("b"), Some(&"2".to_string()));
    }

    #[test]
    fn test_json_roundtrip() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema()).build(1_700_000_000_000);
        let json = metadata.to_canonical_json().unwrap();
        let back = TableMetadata::from_json(&json).unwrap();
        assert_eq!(metadata, back);
    }

    #[test]
    fn test_format_version_rejects_unsupported() {
        assert!(FormatVersion::parse(1).is_err());
        assert!(FormatVersion::parse(4).is_err());
        assert_eq!(FormatVersion::parse(2).unwrap(), FormatVersion::V2);
    }

    #[test]
    fn test_upgrade_format_version_rejects_downgrade() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V3, simple_schema()).build(1);
        assert!(metadata.into_builder().upgrade_format_version(FormatVersion::V2).is_err());
    }

    #[test]
    fn test_upgrade_format_version_seeds_next_row_id() {
        let metadata = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema()).build(1);
        let metadata = metadata.into_builder().upgrade_format_version(FormatVersion::V3).unwrap().build(2);
        assert_eq!(metadata.next_row_id, Some(0));
    }

    #[test]
    fn test_truncate_metadata_log_keeps_recent_and_retained() {
        let mut builder = TableMetadataBuilder::new("s3://bucket/db/t", FormatVersion::V2, simple_schema());
        for i in 0..5 {
            builder = builder.add_metadata_log_entry(format!("v{i}.metadata.json"), i * 1000);
        }
        let metadata = builder.truncate_metadata_log(2, 1500, 4000).build(5000);
        let files: Vec<&str> = metadata.metadata_log.iter().map(|e| e.metadata_file.as_str()).collect();
        assert_eq!(files, vec!["v3.metadata.json", "v4.metadata.json"]);
    }
}
