//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use bytes::Bytes;

use pkgsync::{PackageError, PackageManager};
use pkgsync_core::{Package, PackageInfo, ARCHITECTURE_KEY, VERSION_KEY};
use pkgsync_store::{MemoryBlobStore, MemoryTupleStore};

/// System label fixtures use unless told otherwise.
pub const TEST_SYSTEM: &str = "ubuntu16.04";

/// Package manager over in-memory stores.
pub type MemoryManager = PackageManager<MemoryBlobStore, MemoryTupleStore>;

/// A test fixture with an in-memory package manager.
pub struct TestFixture {
    pub system: String,
    pub manager: Arc<MemoryManager>,
}

impl TestFixture {
    /// Create a fixture for [`TEST_SYSTEM`].
    pub fn new() -> Self {
        Self::with_system(TEST_SYSTEM)
    }

    pub fn with_system(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            manager: Arc::new(PackageManager::new(
                MemoryBlobStore::new(),
                MemoryTupleStore::new(),
            )),
        }
    }

    /// An info in this fixture's system with version and architecture set.
    pub fn info(&self, name: &str) -> PackageInfo {
        PackageInfo::new(name, self.system.as_str())
            .with_metadata(VERSION_KEY, "1.0-1")
            .with_metadata(ARCHITECTURE_KEY, "amd64")
    }

    /// A package with a payload derived from its name.
    pub fn package(&self, name: &str) -> Package {
        Package::new(
            self.info(name),
            Bytes::from(format!("{} deb contents", name)),
        )
    }

    /// Add one package per name.
    pub async fn seed(&self, names: &[&str]) -> Result<Vec<PackageInfo>, PackageError> {
        let mut added = Vec::with_capacity(names.len());
        for name in names {
            added.push(self.manager.add(self.package(name)).await?);
        }
        Ok(added)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `count` infos named `pkg-000`, `pkg-001`, ... in `system`.
pub fn numbered_infos(system: &str, count: usize) -> Vec<PackageInfo> {
    (0..count)
        .map(|i| {
            PackageInfo::new(format!("pkg-{:03}", i), system).with_metadata(VERSION_KEY, "1.0")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_seed() {
        let fixture = TestFixture::new();
        let added = fixture.seed(&["curl", "wget"]).await.unwrap();

        assert_eq!(added.len(), 2);
        assert!(added.iter().all(|i| !i.content_handle.is_empty()));
        assert_eq!(fixture.manager.blob_store().len(), 2);
    }

    #[test]
    fn test_numbered_infos() {
        let infos = numbered_infos("debian9", 3);
        let names: Vec<_> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["pkg-000", "pkg-001", "pkg-002"]);
        assert!(infos.iter().all(|i| i.system == "debian9"));
    }
}
