/*!
[StoreCatalog]: the one engine behind both reference catalogs the spec
calls for (spec §4.9). Namespace properties and table-to-location
pointers are kept as small JSON blobs under a `_catalog/` prefix in the
same [ObjectStore] that holds table data; only the backend differs
between "in-memory" and "object-store-backed".
*/

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::commit;
use crate::commit::{CommitConfig, NoopSleeper, Sleeper};
use crate::error::{IcebergError, Result};
use crate::metadata::TableMetadataBuilder;
use crate::storage::{MemoryObjectStore, ObjectStore};
use crate::util::join_path;

use super::{Catalog, CommitTableResponse, CreateTableRequest, LoadTableResult, Namespace, TableIdentifier, TableRequirement, TableUpdate};

fn now_millis() -> i64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

fn namespace_stem(namespace: &Namespace) -> String {
    if namespace.is_empty() {
        "_root".to_string()
    } else {
        namespace.to_rest_path()
    }
}

fn namespace_key(namespace: &Namespace) -> String {
    format!("_catalog/namespaces/{}.json", namespace_stem(namespace))
}

fn namespace_key_to_namespace(key: &str) -> Result<Namespace> {
    let stem = key.trim_start_matches("_catalog/namespaces/").trim_end_matches(".json");
    if stem == "_root" {
        Ok(Namespace::root())
    } else {
        let levels: Vec<String> = stem.split('\u{1f}').map(String::from).collect();
        Namespace::try_new(&levels)
    }
}

fn table_prefix(namespace: &Namespace) -> String {
    format!("_catalog/tables/{}/", namespace_stem(namespace))
}

fn table_key(identifier: &TableIdentifier) -> String {
    format!("{}{}.json", table_prefix(identifier.namespace()), identifier.name())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TablePointer {
    location: String,
}

/// The generic namespace/table registry (spec §4.9), parameterized over
/// the [ObjectStore] backend it persists through.
pub struct StoreCatalog<S: ObjectStore> {
    store: S,
    sleeper: Box<dyn Sleeper>,
    config: CommitConfig,
    warehouse_root: String,
}

impl<S: ObjectStore> StoreCatalog<S> {
    /// Builds a catalog over `store`, defaulting new tables' locations
    /// under `warehouse_root` unless [CreateTableRequest::location] overrides it.
    pub fn new(store: S, warehouse_root: impl Into<String>) -> Self {
        StoreCatalog {
            store,
            sleeper: Box::new(NoopSleeper),
            config: CommitConfig::default(),
            warehouse_root: warehouse_root.into(),
        }
    }

    /// Overrides the commit retry/backoff tunables (default: [CommitConfig::default]).
    pub fn with_config(mut self, config: CommitConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the sleep collaborator used between commit retries
    /// (default: [NoopSleeper]).
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The backing object store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn default_location(&self, identifier: &TableIdentifier) -> String {
        let ns_path = identifier.namespace().levels().join("/");
        let root = self.warehouse_root.trim_end_matches('/');
        if ns_path.is_empty() {
            format!("{root}/{}", identifier.name())
        } else {
            format!("{root}/{ns_path}/{}", identifier.name())
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_pointer(&self, identifier: &TableIdentifier) -> Result<TablePointer> {
        self.read_json(&table_key(identifier))
            .await?
            .ok_or_else(|| IcebergError::NotFound(format!("table {identifier} not found")))
    }
}

/// A dependency-free reference catalog: [StoreCatalog] over
/// [MemoryObjectStore]. "No I/O" means no network or disk access, not
/// "no object-store abstraction" — the registry and table metadata both
/// still flow through the same [ObjectStore] port, just backed by memory.
pub type InMemoryCatalog = StoreCatalog<MemoryObjectStore>;

impl InMemoryCatalog {
    /// Builds an empty in-memory catalog rooted at `warehouse_root`.
    pub fn in_memory(warehouse_root: impl Into<String>) -> Self {
        StoreCatalog::new(MemoryObjectStore::new(), warehouse_root)
    }
}

#[async_trait]
impl<S: ObjectStore> Catalog for StoreCatalog<S> {
    async fn list_namespaces(&self, parent: Option<&Namespace>) -> Result<Vec<Namespace>> {
        let parent = parent.cloned().unwrap_or_else(Namespace::root);
        let keys = self.store.list("_catalog/namespaces/").await?;
        let mut out = Vec::new();
        for key in keys {
            let ns = namespace_key_to_namespace(&key)?;
            if ns.is_child_of(&parent) {
                out.push(ns);
            }
        }
        out.sort();
        Ok(out)
    }

    async fn create_namespace(&self, namespace: &Namespace, properties: HashMap<String, String>) -> Result<()> {
        let key = namespace_key(namespace);
        let bytes = Bytes::from(serde_json::to_vec(&properties)?);
        let created = match self.store.put_if_absent(&key, bytes.clone()).await? {
            Some(created) => created,
            None => {
                if self.store.exists(&key).await? {
                    false
                } else {
                    self.store.put(&key, bytes).await?;
                    true
                }
            }
        };
        if created {
            Ok(())
        } else {
            Err(IcebergError::AlreadyExists(format!("namespace {namespace} already exists")))
        }
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<()> {
        if !self.list_tables(namespace).await?.is_empty() {
            return Err(IcebergError::NotEmpty(format!("namespace {namespace} still contains tables")));
        }
        if !self.list_namespaces(Some(namespace)).await?.is_empty() {
            return Err(IcebergError::NotEmpty(format!("namespace {namespace} still has child namespaces")));
        }
        self.store.delete(&namespace_key(namespace)).await
    }

    async fn namespace_exists(&self, namespace: &Namespace) -> Result<bool> {
        self.store.exists(&namespace_key(namespace)).await
    }

    async fn get_namespace_properties(&self, namespace: &Namespace) -> Result<HashMap<String, String>> {
        self.read_json(&namespace_key(namespace))
            .await?
            .ok_or_else(|| IcebergError::NotFound(format!("namespace {namespace} not found")))
    }

    async fn update_namespace_properties(&self, namespace: &Namespace, updates: HashMap<String, String>, removals: &[String]) -> Result<()> {
        let mut props = self.get_namespace_properties(namespace).await?;
        props.extend(updates);
        for key in removals {
            props.remove(key);
        }
        self.store.put(&namespace_key(namespace), Bytes::from(serde_json::to_vec(&props)?)).await
    }

    async fn list_tables(&self, namespace: &Namespace) -> Result<Vec<TableIdentifier>> {
        let prefix = table_prefix(namespace);
        let keys = self.store.list(&prefix).await?;
        keys.into_iter()
            .map(|key| {
                let name = key.trim_start_matches(prefix.as_str()).trim_end_matches(".json");
                TableIdentifier::new(namespace.clone(), name)
            })
            .collect()
    }

    async fn create_table(&self, identifier: &TableIdentifier, request: CreateTableRequest) -> Result<LoadTableResult> {
        if !self.namespace_exists(identifier.namespace()).await? {
            return Err(IcebergError::NotFound(format!("namespace {} not found", identifier.namespace())));
        }
        let key = table_key(identifier);
        if self.store.exists(&key).await? {
            return Err(IcebergError::AlreadyExists(format!("table {identifier} already exists")));
        }

        let location = request.location.clone().unwrap_or_else(|| self.default_location(identifier));
        let mut builder = TableMetadataBuilder::new(&location, request.format_version, request.schema);
        if let Some(spec) = request.partition_spec {
            let spec_id = spec.spec_id;
            builder = builder.add_partition_spec(spec).set_default_spec(spec_id)?;
        }
        if let Some(order) = request.sort_order {
            let order_id = order.order_id;
            builder = builder.add_sort_order(order).set_default_sort_order(order_id)?;
        }
        let metadata = builder.set_properties(request.properties).build(now_millis());

        let metadata_location = commit::initialize_table(&self.store, &location, &metadata).await?;
        let pointer = TablePointer { location };
        self.store.put(&key, Bytes::from(serde_json::to_vec(&pointer)?)).await?;

        Ok(LoadTableResult { metadata, metadata_location })
    }

    async fn load_table(&self, identifier: &TableIdentifier) -> Result<LoadTableResult> {
        let pointer = self.read_pointer(identifier).await?;
        let (metadata, metadata_location) = commit::load_current(&self.store, &pointer.location).await?;
        Ok(LoadTableResult { metadata, metadata_location })
    }

    async fn table_exists(&self, identifier: &TableIdentifier) -> Result<bool> {
        self.store.exists(&table_key(identifier)).await
    }

    async fn drop_table(&self, identifier: &TableIdentifier, purge: bool) -> Result<()> {
        let key = table_key(identifier);
        let pointer = self.read_pointer(identifier).await?;
        self.store.delete(&key).await?;
        if purge {
            let prefix = join_path(&pointer.location, "")?;
            for file in self.store.list(&prefix).await? {
                self.store.delete(&file).await?;
            }
        }
        Ok(())
    }

    async fn rename_table(&self, from: &TableIdentifier, to: &TableIdentifier) -> Result<()> {
        let to_key = table_key(to);
        if self.store.exists(&to_key).await? {
            return Err(IcebergError::AlreadyExists(format!("table {to} already exists")));
        }
        let pointer = self.read_pointer(from).await?;
        self.store.put(&to_key, Bytes::from(serde_json::to_vec(&pointer)?)).await?;
        self.store.delete(&table_key(from)).await
    }

    async fn commit_table(&self, identifier: &TableIdentifier, requirements: &[TableRequirement], updates: Vec<TableUpdate>) -> Result<CommitTableResponse> {
        let pointer = self.read_pointer(identifier).await?;
        let requirements = requirements.to_vec();

        let outcome = commit::commit(&self.store, self.sleeper.as_ref(), &pointer.location, &self.config, now_millis(), move |current| {
            for requirement in &requirements {
                requirement.check(current)?;
            }
            let builder = TableUpdate::apply_all(updates.clone(), current.clone().into_builder())?;
            Ok(builder.build(now_millis()))
        })
        .await?;

        Ok(CommitTableResponse { metadata: outcome.metadata, metadata_location: outcome.metadata_location })
    }
}
