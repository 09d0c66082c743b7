//! Configuration: where the stores live, which system this host is, and how
//! hard a bulk sync may push.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use pkgsync_store::{DpkgSource, FsBlobStore, SqliteTupleStore};
use pkgsync_sync::{SyncConfig, Syncer};

use crate::manager::PackageManager;

/// System label used when none is configured.
pub const DEFAULT_SYSTEM: &str = "ubuntu16.04";

/// Package manager backed by the local filesystem and SQLite.
pub type LocalPackageManager = PackageManager<FsBlobStore, SqliteTupleStore>;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PkgsyncConfig {
    /// System label attached to every package read from this host.
    pub system: String,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

impl Default for PkgsyncConfig {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_owned(),
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Locations of the blob and tuple stores.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the filesystem blob store.
    pub blob_dir: PathBuf,
    /// Path of the SQLite tuple store.
    pub tuple_db: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_dir: PathBuf::from("pkgsync/blobs"),
            tuple_db: PathBuf::from("pkgsync/tuples.db"),
        }
    }
}

impl PkgsyncConfig {
    /// Open the configured stores and wrap them in a package manager.
    pub fn open_manager(&self) -> pkgsync_store::Result<LocalPackageManager> {
        let blobs = FsBlobStore::open(&self.storage.blob_dir)?;
        let tuples = SqliteTupleStore::open(&self.storage.tuple_db)?;
        tracing::debug!(
            blob_dir = %self.storage.blob_dir.display(),
            tuple_db = %self.storage.tuple_db.display(),
            "opened stores"
        );
        Ok(PackageManager::new(blobs, tuples))
    }

    /// The host's dpkg database as a package source.
    pub fn host_source(&self) -> DpkgSource {
        DpkgSource::new(self.system.as_str())
    }

    /// A syncer that pushes host packages into the configured stores.
    pub fn host_syncer(&self) -> pkgsync_store::Result<Syncer<DpkgSource, LocalPackageManager>> {
        Ok(Syncer::new(
            Arc::new(self.host_source()),
            Arc::new(self.open_manager()?),
            self.sync,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pkgsync_core::{Package, PackageInfo};

    #[test]
    fn test_defaults() {
        let config = PkgsyncConfig::default();
        assert_eq!(config.system, "ubuntu16.04");
        assert_eq!(config.storage.blob_dir, PathBuf::from("pkgsync/blobs"));
        assert_eq!(config.storage.tuple_db, PathBuf::from("pkgsync/tuples.db"));
        assert_eq!(config.sync, SyncConfig::new(10, 10));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: PkgsyncConfig = serde_json::from_str(
            r#"{"system": "debian9", "sync": {"publish_concurrency": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.system, "debian9");
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.sync.fetch_concurrency, 10);
        assert_eq!(config.sync.effective().publish_concurrency, 10);
    }

    #[tokio::test]
    async fn test_open_manager() {
        let dir = tempfile::tempdir().unwrap();
        let config = PkgsyncConfig {
            storage: StorageConfig {
                blob_dir: dir.path().join("blobs"),
                tuple_db: dir.path().join("db").join("tuples.db"),
            },
            ..PkgsyncConfig::default()
        };

        let manager = config.open_manager().unwrap();
        let added = manager
            .add(Package::new(
                PackageInfo::new("curl", config.system.as_str()),
                Bytes::from_static(b"payload"),
            ))
            .await
            .unwrap();

        let manager = config.open_manager().unwrap();
        let got = manager.get(&added).await.unwrap();
        assert_eq!(got.payload, Bytes::from_static(b"payload"));

        let syncer = config.host_syncer().unwrap();
        assert_eq!(syncer.config(), SyncConfig::default());
    }
}
