/*!
The [ObjectStore] port (spec §6.1): the six-method contract this engine
requires of its host. [MemoryObjectStore] is an in-process reference
implementation used by tests and the in-memory catalog; [DelegatingObjectStore]
adapts a real [object_store::ObjectStore] backend (S3, GCS, local disk, ...),
translating its conditional-put primitives into `put_if_absent` and
`compare_and_swap` where the backend supports them.
*/

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{PutMode, PutOptions, PutPayload, UpdateVersion};

use crate::error::{IcebergError, Result};
use crate::util::validate_path;

/// The storage contract the engine requires of its host (spec §6.1).
///
/// `put_if_absent` and `compare_and_swap` are conditional operations: a
/// backend that cannot support them returns `Ok(None)` rather than an
/// error, and callers (the commit protocol) fall back to a best-effort
/// `put` plus verify-after-write.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads the object at `key`, or `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Writes `bytes` at `key`, unconditionally overwriting any prior value.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()>;

    /// Deletes the object at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists every key with the given prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// True if `key` exists.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Writes `bytes` at `key` only if it does not already exist. Returns
    /// `Ok(Some(true))` on success, `Ok(Some(false))` if `key` was already
    /// present, `Ok(None)` if the backend cannot support the conditional
    /// write at all.
    async fn put_if_absent(&self, key: &str, bytes: Bytes) -> Result<Option<bool>> {
        let _ = (key, bytes);
        Ok(None)
    }

    /// Writes `new` at `key` only if the current contents equal `expected`
    /// (`None` meaning "key does not currently exist"). Returns
    /// `Ok(Some(true))` on success, `Ok(Some(false))` on a lost race,
    /// `Ok(None)` if the backend cannot support CAS at all.
    async fn compare_and_swap(&self, key: &str, expected: Option<Bytes>, new: Bytes) -> Result<Option<bool>> {
        let _ = (key, expected, new);
        Ok(None)
    }
}

/// An in-process, mutex-guarded [ObjectStore] with full conditional-write
/// support. Used by tests and by the in-memory catalog.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryObjectStore::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        validate_path(key)?;
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn put_if_absent(&self, key: &str, bytes: Bytes) -> Result<Option<bool>> {
        validate_path(key)?;
        let mut guard = self.objects.lock().unwrap();
        if guard.contains_key(key) {
            Ok(Some(false))
        } else {
            guard.insert(key.to_string(), bytes);
            Ok(Some(true))
        }
    }

    async fn compare_and_swap(&self, key: &str, expected: Option<Bytes>, new: Bytes) -> Result<Option<bool>> {
        let mut guard = self.objects.lock().unwrap();
        let current = guard.get(key).cloned();
        if current == expected {
            guard.insert(key.to_string(), new);
            Ok(Some(true))
        } else {
            Ok(Some(false))
        }
    }
}

/// Adapts a real [object_store::ObjectStore] backend to this crate's
/// [ObjectStore] port. Conditional writes are translated to the backend's
/// `put_opts` with [PutMode::Create] (for `put_if_absent`) and
/// [PutMode::Update] keyed by e-tag (for `compare_and_swap`); backends that
/// report `MatchesImplementation` or error on these are treated as not
/// supporting conditional writes, per spec §6.1.
pub struct DelegatingObjectStore<T: object_store::ObjectStore> {
    inner: T,
}

impl<T: object_store::ObjectStore> DelegatingObjectStore<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        DelegatingObjectStore { inner }
    }
}

#[async_trait]
impl<T: object_store::ObjectStore> ObjectStore for DelegatingObjectStore<T> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = ObjectPath::from(key);
        match self.inner.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await.map_err(|e| IcebergError::Storage(e.to_string()))?;
                Ok(Some(bytes))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(IcebergError::Storage(e.to_string())),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        validate_path(key)?;
        let path = ObjectPath::from(key);
        self.inner
            .put(&path, PutPayload::from(bytes))
            .await
            .map_err(|e| IcebergError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = ObjectPath::from(key);
        match self.inner.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(IcebergError::Storage(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        use futures::TryStreamExt;
        let path = ObjectPath::from(prefix);
        let entries: Vec<_> = self
            .inner
            .list(Some(&path))
            .map_err(|e| IcebergError::Storage(e.to_string()))
            .try_collect()
            .await?;
        Ok(entries.into_iter().map(|m| m.location.to_string()).collect())
    }

    async fn put_if_absent(&self, key: &str, bytes: Bytes) -> Result<Option<bool>> {
        validate_path(key)?;
        let path = ObjectPath::from(key);
        let opts = PutOptions::from(PutMode::Create);
        match self.inner.put_opts(&path, PutPayload::from(bytes), opts).await {
            Ok(_) => Ok(Some(true)),
            Err(object_store::Error::AlreadyExists { .. }) => Ok(Some(false)),
            Err(object_store::Error::NotImplemented) => Ok(None),
            Err(e) => Err(IcebergError::Storage(e.to_string())),
        }
    }

    async fn compare_and_swap(&self, key: &str, expected: Option<Bytes>, new: Bytes) -> Result<Option<bool>> {
        let path = ObjectPath::from(key);
        let current = self.inner.head(&path).await;
        let mode = match (current, &expected) {
            (Err(object_store::Error::NotFound { .. }), None) => PutMode::Create,
            (Ok(meta), Some(_)) => match meta.e_tag {
                Some(e_tag) => PutMode::Update(UpdateVersion {
                    e_tag: Some(e_tag),
                    version: meta.version,
                }),
                None => return Ok(None),
            },
            (Err(object_store::Error::NotFound { .. }), Some(_)) => return Ok(Some(false)),
            (Ok(_), None) => return Ok(Some(false)),
            (Err(_), None) => PutMode::Create,
            (Err(e), Some(_)) => return Err(IcebergError::Storage(e.to_string())),
        };
        let opts = PutOptions::from(mode);
        match self.inner.put_opts(&path, PutPayload::from(new), opts).await {
            Ok(_) => Ok(Some(true)),
            Err(object_store::Error::AlreadyExists { .. }) | Err(object_store::Error::Precondition { .. }) => Ok(Some(false)),
            Err(object_store::Error::NotImplemented) => Ok(None),
            Err(e) => Err(IcebergError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_put_get_roundtrip() {
        let store = MemoryObjectStore::new();
        store.put("db/t/metadata/v1.json", Bytes::from("hello")).await.unwrap();
        assert_eq!(store.get("db/t/metadata/v1.json").await.unwrap(), Some(Bytes::from("hello")));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_put_if_absent() {
        let store = MemoryObjectStore::new();
        assert_eq!(store.put_if_absent("k", Bytes::from("a")).await.unwrap(), Some(true));
        assert_eq!(store.put_if_absent("k", Bytes::from("b")).await.unwrap(), Some(false));
        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from("a")));
    }

    #[tokio::test]
    async fn test_memory_store_compare_and_swap() {
        let store = MemoryObjectStore::new();
        store.put("hint", Bytes::from("1")).await.unwrap();
        assert_eq!(
            store.compare_and_swap("hint", Some(Bytes::from("1")), Bytes::from("2")).await.unwrap(),
            Some(true)
        );
        assert_eq!(
            store.compare_and_swap("hint", Some(Bytes::from("1")), Bytes::from("3")).await.unwrap(),
            Some(false)
        );
        assert_eq!(store.get("hint").await.unwrap(), Some(Bytes::from("2")));
    }

    #[tokio::test]
    async fn test_memory_store_list_prefix() {
        let store = MemoryObjectStore::new();
        store.put("db/t/metadata/v1.json", Bytes::from("a")).await.unwrap();
        store.put("db/t/data/f1.parquet", Bytes::from("b")).await.unwrap();
        let keys = store.list("db/t/metadata/").await.unwrap();
        assert_eq!(keys, vec!["db/t/metadata/v1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_traversal() {
        let store = MemoryObjectStore::new();
        assert!(store.put("db/../t", Bytes::from("a")).await.is_err());
    }
}
