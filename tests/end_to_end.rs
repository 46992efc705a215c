//! End-to-end scenarios exercising the full stack (catalog, commit,
//! schema evolution, deletes) against an in-memory backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

use iceberg_rs::catalog::{Catalog, CreateTableRequest, InMemoryCatalog, Namespace, TableIdentifier, TableUpdate};
use iceberg_rs::commit::{commit, CommitConfig, NoopSleeper};
use iceberg_rs::delete::{apply_deletes, DataRow, EqualityDeleteLookup, PositionDeleteLookup};
use iceberg_rs::error::IcebergError;
use iceberg_rs::evolution::{compare, is_backward_compatible, SchemaDiff, SchemaEvolutionBuilder};
use iceberg_rs::metadata::FormatVersion;
use iceberg_rs::storage::{MemoryObjectStore, ObjectStore};
use iceberg_rs::types::{AllType, NestedField, PrimitiveType, Schema, Struct, Value};

fn schema_s1() -> Schema {
    Schema {
        schema_id: 0,
        identifier_field_ids: Some(vec![1]),
        struct_fields: Struct {
            fields: vec![
                NestedField {
                    id: 1,
                    name: "id".to_string(),
                    required: true,
                    field_type: AllType::Primitive(PrimitiveType::Long),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                },
                NestedField {
                    id: 2,
                    name: "name".to_string(),
                    required: false,
                    field_type: AllType::Primitive(PrimitiveType::String),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                },
                NestedField {
                    id: 3,
                    name: "created_at".to_string(),
                    required: true,
                    field_type: AllType::Primitive(PrimitiveType::Timestamptz),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                },
            ],
        },
    }
}

fn create_request(schema: Schema) -> CreateTableRequest {
    CreateTableRequest {
        schema,
        partition_spec: None,
        sort_order: None,
        properties: HashMap::new(),
        location: None,
        format_version: FormatVersion::V2,
    }
}

/// S1: create a table, append two snapshots, and check time-travel /
/// ancestor-chain / snapshot-log bookkeeping.
#[tokio::test]
async fn s1_create_append_and_time_travel() {
    let catalog = InMemoryCatalog::in_memory("s3://bucket/warehouse");
    let db = Namespace::parse("analytics").unwrap();
    catalog.create_namespace(&db, HashMap::new()).await.unwrap();
    let id = TableIdentifier::new(db, "events").unwrap();
    let created = catalog.create_table(&id, create_request(schema_s1())).await.unwrap();
    let schema_id = created.metadata.current_schema_id;

    let ts1 = 1_700_000_000_000;
    let snap1 = iceberg_rs::manifest::snapshot::SnapshotBuilder::new(1, None, "s3://bucket/warehouse/analytics/events/metadata/snap-1.avro".to_string(), iceberg_rs::manifest::snapshot::Operation::Append, ts1, Some(schema_id))
        .with_counter("added-data-files", 3)
        .build();
    let snap1_id = snap1.snapshot_id;
    let response1 = catalog
        .commit_table(&id, &[], vec![TableUpdate::AddSnapshot { snapshot: snap1, branch: None }])
        .await
        .unwrap();
    assert_eq!(response1.metadata.current_snapshot_id, Some(snap1_id));

    let ts2 = 1_700_003_600_000;
    let snap2 = iceberg_rs::manifest::snapshot::SnapshotBuilder::new(2, Some(snap1_id), "s3://bucket/warehouse/analytics/events/metadata/snap-2.avro".to_string(), iceberg_rs::manifest::snapshot::Operation::Append, ts2, Some(schema_id))
        .with_counter("added-data-files", 2)
        .build();
    let snap2_id = snap2.snapshot_id;
    let response2 = catalog
        .commit_table(&id, &[], vec![TableUpdate::AddSnapshot { snapshot: snap2, branch: None }])
        .await
        .unwrap();

    assert_eq!(response2.metadata.current_snapshot_id, Some(snap2_id));
    assert_eq!(response2.metadata.snapshot_log.len(), 2);
    assert_eq!(response2.metadata.snapshot_log[0].snapshot_id, snap1_id);
    assert_eq!(response2.metadata.snapshot_log[1].snapshot_id, snap2_id);

    let manager = response2.metadata.snapshot_manager();
    assert_eq!(manager.get_at_timestamp(ts1).unwrap().snapshot_id, snap1_id);
    assert_eq!(manager.get_at_timestamp(ts2).unwrap().snapshot_id, snap2_id);
    assert!(manager.get_at_timestamp(ts1 - 1).is_none());

    let chain: Vec<i64> = manager.ancestor_chain(snap2_id).iter().map(|s| s.snapshot_id).collect();
    assert_eq!(chain, vec![snap2_id, snap1_id]);
}

/// S2: evolve a schema (add/rename/widen) and check field-id stability and
/// backward compatibility.
#[tokio::test]
async fn s2_schema_evolution_and_backward_compat() {
    let mut base = schema_s1();
    base.struct_fields.fields.push(NestedField {
        id: 4,
        name: "count".to_string(),
        required: false,
        field_type: AllType::Primitive(PrimitiveType::Int),
        doc: None,
        initial_default: None,
        write_default: None,
    });

    let builder = SchemaEvolutionBuilder::new(base.clone())
        .add_column(None, "phone", AllType::Primitive(PrimitiveType::String), false, None, None)
        .rename_column("name", "full_name")
        .update_type("count", AllType::Primitive(PrimitiveType::Long));
    let (evolved, new_last_column_id) = builder.build(1, 4).unwrap();

    assert_eq!(evolved.schema_id, 1);
    assert_eq!(new_last_column_id, 5);
    assert_eq!(evolved.field_by_name("full_name").unwrap().id, 2, "rename must preserve field-id");
    assert_eq!(evolved.field_by_name("phone").unwrap().id, 5, "new field gets a fresh id past last-column-id");
    assert!(evolved.field_by_name("name").is_none());

    let diffs = compare(&base, &evolved);
    assert!(diffs.iter().any(|d| matches!(d, SchemaDiff::Renamed { id: 2, .. })));
    assert!(diffs.iter().any(|d| matches!(d, SchemaDiff::TypeChanged { id: 4, .. })));
    assert!(diffs.iter().any(|d| matches!(d, SchemaDiff::Added { id: 5, .. })));
    assert!(is_backward_compatible(&base, &evolved));

    // Commit the new schema into a real table and check it sticks.
    let catalog = InMemoryCatalog::in_memory("s3://bucket/warehouse");
    let db = Namespace::parse("analytics").unwrap();
    catalog.create_namespace(&db, HashMap::new()).await.unwrap();
    let id = TableIdentifier::new(db, "events").unwrap();
    catalog.create_table(&id, create_request(base)).await.unwrap();

    let response = catalog
        .commit_table(
            &id,
            &[],
            vec![
                TableUpdate::AddSchema { schema: evolved },
                TableUpdate::SetCurrentSchema { schema_id: 1 },
            ],
        )
        .await
        .unwrap();
    assert_eq!(response.metadata.current_schema_id, 1);
    assert_eq!(response.metadata.current_schema().unwrap().field_by_name("full_name").unwrap().id, 2);
}

/// A store that lets one concurrent writer land its commit in the middle
/// of another's publish step, to exercise the retry loop under a real
/// conflict rather than a merely simulated one.
struct FlakyStore {
    inner: MemoryObjectStore,
    hint_path: String,
    location: String,
    competitor_fired: AtomicBool,
}

#[async_trait::async_trait]
impl ObjectStore for FlakyStore {
    async fn get(&self, key: &str) -> iceberg_rs::Result<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bytes: Bytes) -> iceberg_rs::Result<()> {
        self.inner.put(key, bytes).await
    }

    async fn delete(&self, key: &str) -> iceberg_rs::Result<()> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> iceberg_rs::Result<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn put_if_absent(&self, key: &str, bytes: Bytes) -> iceberg_rs::Result<Option<bool>> {
        self.inner.put_if_absent(key, bytes).await
    }

    async fn compare_and_swap(&self, key: &str, expected: Option<Bytes>, new: Bytes) -> iceberg_rs::Result<Option<bool>> {
        if key == self.hint_path && !self.competitor_fired.swap(true, Ordering::SeqCst) {
            // A second committer races in and publishes first.
            commit(&self.inner, &NoopSleeper, &self.location, &CommitConfig::default(), 4, |current| {
                let snap = iceberg_rs::manifest::snapshot::SnapshotBuilder::new(
                    current.last_sequence_number + 1,
                    current.current_snapshot_id,
                    "snap-competitor.avro".to_string(),
                    iceberg_rs::manifest::snapshot::Operation::Append,
                    4,
                    Some(current.current_schema_id),
                )
                .build();
                Ok(current.clone().into_builder().add_snapshot(snap, None).build(4))
            })
            .await
            .unwrap();
        }
        self.inner.compare_and_swap(key, expected, new).await
    }
}

/// S3: two committers race; exactly one wins its first attempt, the other
/// loses the version-hint race and must retry, and sequence numbers are
/// assigned in actual commit order rather than load order.
#[tokio::test]
async fn s3_concurrent_commit_one_winner() {
    let location = "s3://bucket/warehouse/analytics/events";
    let seed_store = MemoryObjectStore::new();
    let schema = schema_s1();
    let metadata = iceberg_rs::metadata::TableMetadataBuilder::new(location, FormatVersion::V2, schema).build(1);
    iceberg_rs::commit::initialize_table(&seed_store, location, &metadata).await.unwrap();

    // Two prior sequential commits establish a non-trivial starting history
    // before the race.
    for i in 1..=2 {
        commit(&seed_store, &NoopSleeper, location, &CommitConfig::default(), i, |current| {
            let snap = iceberg_rs::manifest::snapshot::SnapshotBuilder::new(
                current.last_sequence_number + 1,
                current.current_snapshot_id,
                format!("snap-warmup-{i}.avro"),
                iceberg_rs::manifest::snapshot::Operation::Append,
                i,
                Some(current.current_schema_id),
            )
            .build();
            Ok(current.clone().into_builder().add_snapshot(snap, None).build(i))
        })
        .await
        .unwrap();
    }

    let hint_path = iceberg_rs::commit::version_hint_path(location).unwrap();
    let flaky = FlakyStore {
        inner: seed_store,
        hint_path,
        location: location.to_string(),
        competitor_fired: AtomicBool::new(false),
    };

    let outcome = commit(&flaky, &NoopSleeper, location, &CommitConfig::default(), 5, |current| {
        let snap = iceberg_rs::manifest::snapshot::SnapshotBuilder::new(
            current.last_sequence_number + 1,
            current.current_snapshot_id,
            "snap-ours.avro".to_string(),
            iceberg_rs::manifest::snapshot::Operation::Append,
            5,
            Some(current.current_schema_id),
        )
        .build();
        Ok(current.clone().into_builder().add_snapshot(snap, None).build(5))
    })
    .await
    .unwrap();

    // The competitor's commit landed as sequence 4; ours, having had to
    // retry after losing the race, lands as sequence 5.
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.metadata.last_sequence_number, 5);
    let sequences: Vec<i64> = outcome.metadata.snapshots.iter().map(|s| s.sequence_number).collect();
    assert!(sequences.contains(&4));
    assert!(sequences.contains(&5));
}

/// S4: a delete file with a sequence number below the data file's own
/// sequence number must not apply (spec §4.5's ">=" rule).
#[test]
fn s4_position_deletes_respect_sequence_ordering() {
    let lookup = PositionDeleteLookup::new(3, &[("data/a.parquet".to_string(), 0)]);
    let rows = vec![
        DataRow { pos: 0, equality_values: &[] },
        DataRow { pos: 1, equality_values: &[] },
    ];
    let result = apply_deletes("data/a.parquet", 5, &[lookup], &[], rows);
    assert_eq!(result.position_deleted, 0);
    assert_eq!(result.passed_rows, 2);
}

/// S5: a position delete and an equality delete applied together, with
/// positional deletes taking precedence.
#[test]
fn s5_position_and_equality_deletes_combined() {
    let rows_named = vec![("Alice", 0i64), ("Bob", 1), ("Charlie", 2), ("Diana", 3)];

    let pos_lookup = PositionDeleteLookup::new(5, &[("data/a.parquet".to_string(), 2)]);
    let eq_rows = vec![vec![("name".to_string(), Value::String("Alice".to_string()))]];
    let eq_lookup = EqualityDeleteLookup::new(5, &eq_rows);

    let eq_field_sets: Vec<[(String, Value); 1]> = rows_named
        .iter()
        .map(|(name, _)| [("name".to_string(), Value::String(name.to_string()))])
        .collect();
    let data_rows: Vec<DataRow> = rows_named
        .iter()
        .zip(eq_field_sets.iter())
        .map(|((_, pos), fields)| DataRow { pos: *pos, equality_values: fields })
        .collect();
    let result = apply_deletes("data/a.parquet", 4, &[pos_lookup.clone()], &[eq_lookup.clone()], data_rows);
    assert_eq!(result.position_deleted, 1);
    assert_eq!(result.equality_deleted, 1);
    assert_eq!(result.passed_rows, 2);

    let passed: Vec<&str> = rows_named
        .iter()
        .filter(|(_, pos)| !pos_lookup.is_deleted("data/a.parquet", *pos))
        .filter(|(name, _)| !eq_lookup.is_deleted(&[("name".to_string(), Value::String(name.to_string()))]))
        .map(|(name, _)| *name)
        .collect();
    assert_eq!(passed, vec!["Bob", "Diana"]);
}

/// S6: an unrecognized `format-version` is fatal to parsing.
#[test]
fn s6_unsupported_format_version_rejected() {
    assert!(matches!(FormatVersion::parse(4), Err(IcebergError::InvalidInput(_))));

    let raw = r#"{
        "format-version": 4,
        "table-uuid": "00000000-0000-0000-0000-000000000000",
        "location": "s3://bucket/t",
        "last-sequence-number": 0,
        "last-updated-ms": 0,
        "last-column-id": 1,
        "schemas": [],
        "current-schema-id": 0,
        "partition-specs": [],
        "default-spec-id": 0,
        "last-partition-id": 999,
        "sort-orders": [],
        "default-sort-order-id": 0,
        "current-snapshot-id": null
    }"#;
    assert!(matches!(
        iceberg_rs::metadata::TableMetadata::from_json(raw),
        Err(IcebergError::InvalidInput(_))
    ));
}
