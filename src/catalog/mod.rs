/*!
Namespace and table registries (spec §4.9, L9): the [Catalog] trait is the
public facade over [crate::commit]'s atomic protocol, exposing
`commit_table`'s requirement/update algebra the way a REST catalog server
would (spec §6.4), without building the HTTP layer itself.

[store::StoreCatalog] is the one implementation, generic over a
[crate::storage::ObjectStore] backend: [InMemoryCatalog] instantiates it
over [crate::storage::MemoryObjectStore] for a dependency-free reference
catalog, and the same type instantiated over
[crate::storage::DelegatingObjectStore] persists namespaces and tables
through a real backend. Both "reference implementations" the spec calls
for are this one generic engine, since the namespace/table registry logic
does not differ between them — only the backend does.
*/

mod identifier;
mod namespace;
mod requirement;
mod store;
mod update;

pub use identifier::TableIdentifier;
pub use namespace::Namespace;
pub use requirement::TableRequirement;
pub use store::{InMemoryCatalog, StoreCatalog};
pub use update::TableUpdate;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metadata::{FormatVersion, TableMetadata};
use crate::types::partition::PartitionSpec;
use crate::types::schema::Schema;
use crate::types::sort::SortOrder;

/// Request body for `create_table` (spec §4.9, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateTableRequest {
    /// The table's first schema.
    pub schema: Schema,
    /// The table's first partition spec, defaulting to unpartitioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_spec: Option<PartitionSpec>,
    /// The table's first sort order, defaulting to unsorted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    /// Free-form table properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// Override of the catalog-assigned default location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The format version to create the table at.
    #[serde(default = "default_create_format_version")]
    pub format_version: FormatVersion,
}

fn default_create_format_version() -> FormatVersion {
    FormatVersion::V2
}

/// Response of `load_table`/`create_table`: the metadata and the exact
/// path it currently lives at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoadTableResult {
    /// The table's current metadata.
    pub metadata: TableMetadata,
    /// Path of the metadata JSON that was read.
    pub metadata_location: String,
}

/// Response of `commit_table`: the new metadata and where it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommitTableResponse {
    /// The metadata now current.
    pub metadata: TableMetadata,
    /// Path of the metadata JSON that is now current.
    pub metadata_location: String,
}

/// Namespace and table registry operations a host catalog exposes (spec
/// §4.9). A catalog is `(namespace-path, table-name) -> current-metadata-location`
/// mappings plus namespace properties.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists the direct children of `parent` (the root namespace if `None`).
    async fn list_namespaces(&self, parent: Option<&Namespace>) -> Result<Vec<Namespace>>;

    /// Creates a namespace with the given properties. Fails with
    /// [crate::error::IcebergError::AlreadyExists] if it already exists.
    async fn create_namespace(&self, namespace: &Namespace, properties: HashMap<String, String>) -> Result<()>;

    /// Drops a namespace. Fails with [crate::error::IcebergError::NotEmpty]
    /// if it still contains tables.
    async fn drop_namespace(&self, namespace: &Namespace) -> Result<()>;

    /// True if `namespace` exists.
    async fn namespace_exists(&self, namespace: &Namespace) -> Result<bool>;

    /// The namespace's current properties.
    async fn get_namespace_properties(&self, namespace: &Namespace) -> Result<HashMap<String, String>>;

    /// Merges `updates` into the namespace's properties and removes `removals`.
    async fn update_namespace_properties(&self, namespace: &Namespace, updates: HashMap<String, String>, removals: &[String]) -> Result<()>;

    /// Lists the tables directly inside `namespace`.
    async fn list_tables(&self, namespace: &Namespace) -> Result<Vec<TableIdentifier>>;

    /// Creates a new table and writes its first metadata file.
    async fn create_table(&self, identifier: &TableIdentifier, request: CreateTableRequest) -> Result<LoadTableResult>;

    /// Loads a table's current metadata.
    async fn load_table(&self, identifier: &TableIdentifier) -> Result<LoadTableResult>;

    /// True if `identifier` names an existing table.
    async fn table_exists(&self, identifier: &TableIdentifier) -> Result<bool>;

    /// Removes a table's catalog entry, and (if `purge`) its underlying
    /// metadata and data files.
    async fn drop_table(&self, identifier: &TableIdentifier, purge: bool) -> Result<()>;

    /// Moves a table's catalog entry from `from` to `to` without touching
    /// its storage location. Fails if `to` already exists.
    async fn rename_table(&self, from: &TableIdentifier, to: &TableIdentifier) -> Result<()>;

    /// Checks `requirements`, applies `updates`, and runs them through the
    /// atomic commit protocol (spec §4.8). Conflicting requirements and
    /// version-hint races both surface as retriable errors; callers retry
    /// by reloading and re-deriving their updates.
    async fn commit_table(&self, identifier: &TableIdentifier, requirements: &[TableRequirement], updates: Vec<TableUpdate>) -> Result<CommitTableResponse>;
}
