//! Object storage access.
//!
//! Sources are fetched through the [`ObjectStore`] trait. Two implementations ship with the
//! crate:
//!
//! - [`LocalObjectStore`]: buckets are directories under a root, keys are relative paths
//! - [`MemoryObjectStore`]: in-process map, handy for tests
//!
//! [`StorageClient`] wraps client construction: when the client cannot be built, every fetch
//! fails with a [`MigrationError::Storage`] naming the reason, so callers can report and skip
//! a file instead of aborting the batch.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use walkdir::WalkDir;

use crate::config::MigrationConfig;
use crate::error::{MigrationError, MigrationResult};

/// Blob-storage GET/list interface.
pub trait ObjectStore: Send + Sync {
    /// Fetch the full object body.
    fn get(&self, bucket: &str, key: &str) -> MigrationResult<Vec<u8>>;

    /// List keys under `prefix`, sorted.
    fn list(&self, bucket: &str, prefix: &str) -> MigrationResult<Vec<String>>;
}

/// Filesystem-backed object store: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    pub fn open(root: impl AsRef<Path>) -> MigrationResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(MigrationError::Storage {
                bucket: String::new(),
                key: String::new(),
                message: format!("storage root {} is not a directory", root.display()),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> MigrationResult<PathBuf> {
        let storage_err = |message: &str| MigrationError::Storage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        };
        let bucket_ok = !bucket.is_empty() && is_plain_relative(Path::new(bucket));
        if !bucket_ok {
            return Err(storage_err("invalid bucket name"));
        }
        if key.is_empty() || !is_plain_relative(Path::new(key)) {
            return Err(storage_err("invalid object key"));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

fn is_plain_relative(p: &Path) -> bool {
    p.components().all(|c| matches!(c, Component::Normal(_)))
}

impl ObjectStore for LocalObjectStore {
    fn get(&self, bucket: &str, key: &str) -> MigrationResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        std::fs::read(&path).map_err(|e| MigrationError::Storage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    fn list(&self, bucket: &str, prefix: &str) -> MigrationResult<Vec<String>> {
        let bucket_dir = self.root.join(bucket);
        let mut keys = Vec::new();
        for entry in WalkDir::new(&bucket_dir).follow_links(false) {
            let entry = entry.map_err(|e| MigrationError::Storage {
                bucket: bucket.to_string(),
                key: prefix.to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&bucket_dir) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `body` under `bucket`/`key`, replacing any previous object.
    pub fn put(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((bucket.to_string(), key.to_string()), body.into());
        }
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, bucket: &str, key: &str) -> MigrationResult<Vec<u8>> {
        let not_found = |message: &str| MigrationError::Storage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        };
        let objects = self.objects.read().map_err(|_| not_found("store lock poisoned"))?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| not_found("no such key"))
    }

    fn list(&self, bucket: &str, prefix: &str) -> MigrationResult<Vec<String>> {
        let objects = self.objects.read().map_err(|_| MigrationError::Storage {
            bucket: bucket.to_string(),
            key: prefix.to_string(),
            message: "store lock poisoned".to_string(),
        })?;
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}

/// A constructed object store, or the reason construction failed.
pub enum StorageClient {
    /// Usable client.
    Ready(Box<dyn ObjectStore>),
    /// Client construction failed; every call reports this reason.
    Unavailable(String),
}

impl fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageClient::Ready(_) => f.write_str("StorageClient::Ready"),
            StorageClient::Unavailable(reason) => {
                f.debug_tuple("StorageClient::Unavailable").field(reason).finish()
            }
        }
    }
}

impl StorageClient {
    /// Build the local object store described by `config`.
    pub fn open(config: &MigrationConfig) -> Self {
        if config.access_key_id.is_none() || config.secret_access_key.is_none() {
            tracing::debug!("storage credentials not set; local object store does not use them");
        }
        match LocalObjectStore::open(&config.storage_root) {
            Ok(store) => {
                tracing::debug!(root = %store.root().display(), region = %config.region, "object store ready");
                StorageClient::Ready(Box::new(store))
            }
            Err(e) => {
                tracing::error!(err = %e, "object store client unavailable");
                StorageClient::Unavailable(e.to_string())
            }
        }
    }

    /// Wrap an existing store.
    pub fn from_store(store: impl ObjectStore + 'static) -> Self {
        StorageClient::Ready(Box::new(store))
    }

    /// Fetch an object, failing when the client is unavailable.
    pub fn get(&self, bucket: &str, key: &str) -> MigrationResult<Vec<u8>> {
        match self {
            StorageClient::Ready(store) => store.get(bucket, key),
            StorageClient::Unavailable(reason) => Err(MigrationError::Storage {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: format!("client unavailable: {reason}"),
            }),
        }
    }

    /// List keys, failing when the client is unavailable.
    pub fn list(&self, bucket: &str, prefix: &str) -> MigrationResult<Vec<String>> {
        match self {
            StorageClient::Ready(store) => store.list(bucket, prefix),
            StorageClient::Unavailable(reason) => Err(MigrationError::Storage {
                bucket: bucket.to_string(),
                key: prefix.to_string(),
                message: format!("client unavailable: {reason}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_store_reads_and_lists_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let obj_dir = dir.path().join("meteo/Data_JSON/Station_A");
        std::fs::create_dir_all(&obj_dir).unwrap();
        std::fs::write(obj_dir.join("0.csv"), b"a,b\n1,2\n").unwrap();
        std::fs::write(dir.path().join("meteo/readme.txt"), b"x").unwrap();

        let store = LocalObjectStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get("meteo", "Data_JSON/Station_A/0.csv").unwrap(),
            b"a,b\n1,2\n".to_vec()
        );
        assert_eq!(
            store.list("meteo", "Data_JSON/").unwrap(),
            vec!["Data_JSON/Station_A/0.csv".to_string()]
        );
    }

    #[test]
    fn local_store_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::open(dir.path()).unwrap();
        let err = store.get("meteo", "../secret").unwrap_err();
        assert!(err.to_string().contains("invalid object key"));
    }

    #[test]
    fn missing_root_makes_client_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("absent");
        let client = match LocalObjectStore::open(&root) {
            Ok(_) => panic!("expected failure"),
            Err(e) => StorageClient::Unavailable(e.to_string()),
        };
        let err = client.get("meteo", "k.csv").unwrap_err();
        assert!(err.to_string().contains("client unavailable"));
    }

    #[test]
    fn memory_store_get_missing_key_fails() {
        let store = MemoryObjectStore::new();
        store.put("b", "k", "x");
        assert_eq!(store.get("b", "k").unwrap(), b"x".to_vec());
        assert!(store.get("b", "other").is_err());
    }
}
