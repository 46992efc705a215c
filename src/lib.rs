#![deny(missing_docs)]
/*!
# Iceberg-rs

Iceberg-rs is a client-side library for reading, mutating, and atomically
publishing [Apache Iceberg](https://iceberg.apache.org/) tables (format
versions 2 and 3) on top of an opaque object-store-like key/value backend.

The crate is layered leaf-first:

* [types] — primitive/nested types, schema, partition spec, sort order.
* [codec] — zig-zag varint, the Avro container format, and the concrete
  `manifest_entry`/`manifest_file` record schemas, all hand-rolled rather
  than built on a generic Avro library (see the codec module docs).
* [stats] — per-column statistics collection, zone maps, shredded-variant
  statistics.
* [manifest] — manifest and manifest-list builders, snapshot builder and
  manager.
* [delete] — position and equality delete builders, lookups, the merger,
  and application to row streams.
* [evolution] — schema evolution: add/drop/rename/widen/move, the
  type-promotion table, compatibility checks, field-id allocation.
* [metadata] — `TableMetadata` builder, version hint, path layout.
* [commit] — the atomic commit protocol: conditional publish, retry,
  cleanup.
* [catalog] — namespace and table registries, in-memory and
  object-store-backed.
* [storage] — the `ObjectStore` port this engine requires of its host.

Out of scope (left to the host): query execution and row-level data
scans, SQL parsing, on-cluster compaction planning, and any format
version other than 2 and 3.
*/
pub mod catalog;
pub mod codec;
pub mod commit;
pub mod delete;
pub mod error;
pub mod evolution;
pub mod manifest;
pub mod metadata;
pub mod stats;
pub mod storage;
pub mod types;
mod util;

pub use error::{IcebergError, Result};
