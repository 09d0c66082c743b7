//! Collaborator traits: the narrow interfaces pkgsync consumes.
//!
//! The facade talks to a [`BlobStore`] and a [`TupleStore`]; the sync
//! pipeline talks to a [`PackageLister`], a [`PackageGetter`] and a
//! [`PackageAdder`]. Everything behind these traits is replaceable.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use pkgsync_core::{ContentHandle, Package, PackageInfo, Query, Response};

use crate::error::Result;

/// Reader over a fetched blob.
///
/// Dropping the reader releases whatever backs it (file handle, connection).
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Content-addressable blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the handle that retrieves them.
    async fn store(&self, data: Bytes) -> Result<ContentHandle>;

    /// Open a stored blob for reading.
    async fn fetch(&self, handle: &ContentHandle) -> Result<BlobReader>;
}

/// The remote queryable tuple store.
#[async_trait]
pub trait TupleStore: Send + Sync {
    /// Execute a compiled query.
    async fn execute(&self, query: &Query) -> Result<Response>;
}

/// Something that knows which packages are installed.
#[async_trait]
pub trait PackageLister: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// List every installed package.
    async fn installed_packages(&self) -> std::result::Result<Vec<PackageInfo>, Self::Error>;
}

/// Something that can produce a package with its payload.
#[async_trait]
pub trait PackageGetter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, info: &PackageInfo) -> std::result::Result<Package, Self::Error>;
}

/// Something that can publish a package.
#[async_trait]
pub trait PackageAdder: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish the package, returning its info with the content handle set.
    async fn add(&self, pack: Package) -> std::result::Result<PackageInfo, Self::Error>;
}
