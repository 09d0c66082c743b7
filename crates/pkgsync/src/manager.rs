//! The package manager: get, add and search over a blob store and a tuple
//! store.
//!
//! Payload bytes live in the [`BlobStore`]; identity, metadata and the
//! payload's content handle live in the [`TupleStore`]. The manager builds
//! queries through the mapper, executes them, and decodes the responses.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use pkgsync_core::{
    build_add_query, build_get_query, build_search_query, decode_add_result, decode_get_result,
    decode_search_result, validate_package, ContentHandle, CoreError, Package, PackageInfo, Query,
    Response, SearchTerm,
};
use pkgsync_store::{BlobStore, PackageAdder, PackageGetter, StoreError, TupleStore};

use crate::error::{PackageError, Result};

const OP_GET: &str = "get";
const OP_ADD: &str = "add";
const OP_SEARCH: &str = "search";

/// Facade over a blob store and a tuple store.
pub struct PackageManager<B: BlobStore, T: TupleStore> {
    blobs: B,
    tuples: T,
}

impl<B: BlobStore, T: TupleStore> PackageManager<B, T> {
    pub fn new(blobs: B, tuples: T) -> Self {
        Self { blobs, tuples }
    }

    pub fn blob_store(&self) -> &B {
        &self.blobs
    }

    pub fn tuple_store(&self) -> &T {
        &self.tuples
    }

    /// Fetch exactly one package, payload included.
    ///
    /// Only `info.name` and `info.system` are used to find it.
    pub async fn get(&self, info: &PackageInfo) -> Result<Package> {
        let query = build_get_query(info).map_err(|e| PackageError::from_core(OP_GET, e))?;
        let response = self.execute(OP_GET, &query).await?;

        let found = decode_get_result(&response).map_err(|source| match source {
            CoreError::UnexpectedCardinality { count: 0 } => PackageError::NotFound {
                op: OP_GET,
                package: identity(info),
                source,
            },
            CoreError::UnexpectedCardinality { count } => PackageError::AmbiguousMatch {
                op: OP_GET,
                package: identity(info),
                count,
                source,
            },
            other => PackageError::from_core(OP_GET, other),
        })?;

        let payload = self.read_blob(OP_GET, &found.content_handle).await?;
        Ok(Package::new(found, payload))
    }

    /// Store a package's payload, then record it in the tuple store.
    ///
    /// Returns the info with its content handle set. If the tuple store write
    /// fails the payload stays in the blob store. Signatures are not
    /// recorded, so a later `get` returns the package without them.
    pub async fn add(&self, pack: Package) -> Result<PackageInfo> {
        validate_package(&pack.info).map_err(|e| PackageError::from_core(OP_ADD, e))?;

        let Package { mut info, payload } = pack;
        let size = payload.len();
        info.content_handle = self
            .blobs
            .store(payload)
            .await
            .map_err(|source| PackageError::StoreFailure { op: OP_ADD, source })?;

        let pack = Package::new(info, Bytes::new());
        let query = build_add_query(&pack).map_err(|e| PackageError::from_core(OP_ADD, e))?;
        let response = self.execute(OP_ADD, &query).await?;
        decode_add_result(&response).map_err(|e| PackageError::from_core(OP_ADD, e))?;

        tracing::info!(package = %pack.info, handle = %pack.info.content_handle, bytes = size, "added package");
        Ok(pack.info)
    }

    /// Find packages. No match is an empty result, not an error.
    pub async fn search(&self, term: &SearchTerm) -> Result<Vec<PackageInfo>> {
        let query = build_search_query(term).map_err(|e| PackageError::from_core(OP_SEARCH, e))?;
        let response = self.execute(OP_SEARCH, &query).await?;
        decode_search_result(&response).map_err(|e| PackageError::from_core(OP_SEARCH, e))
    }

    /// Search using the text form of a criterion (`"name"` or `"system"`).
    pub async fn search_by(
        &self,
        criterion: &str,
        system: &str,
        pattern: &str,
    ) -> Result<Vec<PackageInfo>> {
        let term = SearchTerm::parse(criterion, system, pattern)
            .map_err(|e| PackageError::from_core(OP_SEARCH, e))?;
        self.search(&term).await
    }

    async fn execute(&self, op: &'static str, query: &Query) -> Result<Response> {
        let response = self
            .tuples
            .execute(query)
            .await
            .map_err(|source| PackageError::PersistFailure { op, source })?;
        tracing::debug!(op, %query, %response, "executed query");
        Ok(response)
    }

    /// Read a whole blob. The reader is dropped before returning.
    async fn read_blob(&self, op: &'static str, handle: &ContentHandle) -> Result<Bytes> {
        let unavailable = |source: StoreError| PackageError::BlobUnavailable {
            op,
            handle: handle.clone(),
            source,
        };

        let mut reader = self.blobs.fetch(handle).await.map_err(&unavailable)?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| unavailable(StoreError::Io(e)))?;
        Ok(Bytes::from(buf))
    }
}

fn identity(info: &PackageInfo) -> String {
    format!("{}/{}", info.system, info.name)
}

#[async_trait]
impl<B: BlobStore, T: TupleStore> PackageGetter for PackageManager<B, T> {
    type Error = PackageError;

    async fn get(&self, info: &PackageInfo) -> Result<Package> {
        PackageManager::get(self, info).await
    }
}

#[async_trait]
impl<B: BlobStore, T: TupleStore> PackageAdder for PackageManager<B, T> {
    type Error = PackageError;

    async fn add(&self, pack: Package) -> Result<PackageInfo> {
        PackageManager::add(self, pack).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgsync_core::{MetadataEntry, DATAPATH_KEY};
    use pkgsync_store::{BlobReader, MemoryBlobStore, MemoryTupleStore};

    type Manager = PackageManager<MemoryBlobStore, MemoryTupleStore>;

    fn manager() -> Manager {
        PackageManager::new(MemoryBlobStore::new(), MemoryTupleStore::new())
    }

    fn package(name: &str, payload: &'static [u8]) -> Package {
        Package::new(
            PackageInfo::new(name, "ubuntu16.04")
                .with_metadata("version", "1.0")
                .with_metadata("architecture", "amd64"),
            payload,
        )
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let m = manager();
        let added = m.add(package("curl", b"curl deb")).await.unwrap();
        assert!(!added.content_handle.is_empty());

        let got = m.get(&PackageInfo::new("curl", "ubuntu16.04")).await.unwrap();
        assert_eq!(got.info.name, "curl");
        assert_eq!(got.info.content_handle, added.content_handle);
        assert_eq!(got.info.metadata_value("version"), Some("1.0"));
        assert_eq!(got.info.metadata_value("architecture"), Some("amd64"));
        assert_eq!(got.payload, Bytes::from_static(b"curl deb"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let m = manager();
        let err = m
            .get(&PackageInfo::new("curl", "ubuntu16.04"))
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::NotFound { op: "get", .. }));
        assert_eq!(err.to_string(), "get: package ubuntu16.04/curl not found");
    }

    #[tokio::test]
    async fn test_conflicting_adds_are_ambiguous() {
        let m = manager();
        m.add(package("curl", b"first")).await.unwrap();
        m.add(package("curl", b"second")).await.unwrap();

        let err = m
            .get(&PackageInfo::new("curl", "ubuntu16.04"))
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_invalid_package_touches_nothing() {
        let m = manager();
        let mut pack = package("curl", b"x");
        pack.info.metadata.push(MetadataEntry::new(DATAPATH_KEY, "spoof"));

        let err = m.add(pack).await.unwrap_err();
        assert!(matches!(err, PackageError::InvalidPackage { op: "add", .. }));
        assert!(m.blob_store().is_empty());
    }

    #[tokio::test]
    async fn test_search() {
        let m = manager();
        for name in ["libssl", "libc6", "curl"] {
            m.add(package(name, b"x")).await.unwrap();
        }

        let all = m.search(&SearchTerm::system("ubuntu16.04")).await.unwrap();
        assert_eq!(all.len(), 3);

        let libs = m.search_by("name", "ubuntu16.04", "lib*").await.unwrap();
        let names: Vec<_> = libs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["libc6", "libssl"]);

        let none = m.search(&SearchTerm::system("debian9")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_search_errors() {
        let m = manager();
        let err = m.search_by("maintainer", "ubuntu16.04", "").await.unwrap_err();
        assert!(matches!(err, PackageError::UnknownCriterion { op: "search", .. }));

        let err = m
            .search(&SearchTerm::name_wildcard("ubuntu16.04", "[unclosed"))
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::InvalidSearchTerm { .. }));
    }

    struct NoBlobs;

    #[async_trait]
    impl BlobStore for NoBlobs {
        async fn store(&self, _data: Bytes) -> pkgsync_store::Result<ContentHandle> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }

        async fn fetch(&self, handle: &ContentHandle) -> pkgsync_store::Result<BlobReader> {
            Err(StoreError::NotFound(handle.to_string()))
        }
    }

    struct BrokenTuples;

    #[async_trait]
    impl TupleStore for BrokenTuples {
        async fn execute(&self, _query: &Query) -> pkgsync_store::Result<Response> {
            Err(StoreError::InvalidData("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_blob_failures() {
        let m = PackageManager::new(NoBlobs, MemoryTupleStore::new());

        let err = m.add(package("curl", b"x")).await.unwrap_err();
        assert!(matches!(err, PackageError::StoreFailure { op: "add", .. }));

        let seeded = manager();
        let added = seeded.add(package("curl", b"x")).await.unwrap();
        let m = PackageManager::new(NoBlobs, MemoryTupleStore::new());
        m.tuple_store()
            .execute(&build_add_query(&Package::new(added, Bytes::new())).unwrap())
            .await
            .unwrap();

        let err = m
            .get(&PackageInfo::new("curl", "ubuntu16.04"))
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::BlobUnavailable { op: "get", .. }));
    }

    #[tokio::test]
    async fn test_execute_failure_is_persist_failure() {
        let m = PackageManager::new(MemoryBlobStore::new(), BrokenTuples);
        let err = m.add(package("curl", b"x")).await.unwrap_err();
        assert!(matches!(err, PackageError::PersistFailure { op: "add", .. }));
        // The payload is not rolled back.
        assert_eq!(m.blob_store().len(), 1);

        let err = m.search(&SearchTerm::system("ubuntu16.04")).await.unwrap_err();
        assert!(matches!(err, PackageError::PersistFailure { op: "search", .. }));
    }
}
