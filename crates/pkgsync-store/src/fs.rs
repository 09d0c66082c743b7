//! Filesystem blob store.
//!
//! Stores blobs by their BLAKE3 hash under a two-character fan-out
//! directory: `<root>/ab/abcdef...`.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use pkgsync_core::ContentHandle;

use crate::error::{Result, StoreError};
use crate::memory::content_handle;
use crate::traits::{BlobReader, BlobStore};

/// Content-addressed blob store on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a blob store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a blob lives on disk.
    fn blob_path(&self, handle: &ContentHandle) -> Result<PathBuf> {
        let hash = handle.as_str();
        if hash.len() < 3 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StoreError::NotFound(hash.to_owned()));
        }
        Ok(self.root.join(&hash[..2]).join(hash))
    }
}

/// Write `data` to `path` through a private temp file in the same directory.
///
/// Readers never observe a partially written blob. Concurrent writers of the
/// same content each use their own temp file; whoever links first wins and
/// the rest find the blob already in place.
fn write_blob(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::InvalidData(format!("no parent for {}", path.display())))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(parent)?;
    tmp.write_all(data)?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(_) if path.exists() => Ok(()),
        Err(e) => Err(e.error.into()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, data: Bytes) -> Result<ContentHandle> {
        let handle = content_handle(&data);
        let path = self.blob_path(&handle)?;

        // Content-addressed blobs are immutable.
        if tokio::fs::try_exists(&path).await? {
            return Ok(handle);
        }

        tokio::task::spawn_blocking(move || write_blob(&path, &data)).await??;

        tracing::debug!(handle = %handle, "stored blob");
        Ok(handle)
    }

    async fn fetch(&self, handle: &ContentHandle) -> Result<BlobReader> {
        let path = self.blob_path(handle)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(handle.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        let handle = store.store(Bytes::from_static(b"deb payload")).await.unwrap();
        let path = store.blob_path(&handle).unwrap();
        assert!(path.exists());
        assert_eq!(path.parent().unwrap().file_name().unwrap(), &handle.as_str()[..2]);

        let mut reader = store.fetch(&handle).await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"deb payload");
    }

    #[tokio::test]
    async fn test_fs_store_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        let h1 = store.store(Bytes::from_static(b"x")).await.unwrap();
        let h2 = store.store(Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(h1, h2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_identical_stores() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        let data = Bytes::from(vec![0x5a; 256 * 1024]);
        let expected = content_handle(&data);

        for _ in 0..10 {
            let tasks: Vec<_> = (0..16)
                .map(|_| {
                    let store = store.clone();
                    let data = data.clone();
                    tokio::spawn(async move { store.store(data).await })
                })
                .collect();
            for task in tasks {
                assert_eq!(task.await.unwrap().unwrap(), expected);
            }
        }

        // Only the blob is left behind; no temp files.
        let shard = store.blob_path(&expected).unwrap();
        let shard = shard.parent().unwrap();
        let names: Vec<_> = std::fs::read_dir(shard)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![expected.as_str().to_owned()]);

        let mut out = Vec::new();
        store.fetch(&expected).await.unwrap().read_to_end(&mut out).await.unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_during_writes_see_whole_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        let data = Bytes::from(vec![0xc3; 512 * 1024]);
        let handle = content_handle(&data);

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let data = data.clone();
                tokio::spawn(async move { store.store(data).await })
            })
            .collect();

        let reader = {
            let store = store.clone();
            let handle = handle.clone();
            let len = data.len();
            tokio::spawn(async move {
                for _ in 0..200 {
                    match store.fetch(&handle).await {
                        Ok(mut blob) => {
                            let mut out = Vec::new();
                            blob.read_to_end(&mut out).await.unwrap();
                            assert_eq!(out.len(), len);
                        }
                        Err(StoreError::NotFound(_)) => tokio::task::yield_now().await,
                        Err(e) => panic!("unexpected fetch error: {e}"),
                    }
                }
            })
        };

        for writer in writers {
            writer.await.unwrap().unwrap();
        }
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_store_rejects_bad_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        for bad in ["", "../../etc/passwd", "zz"] {
            let err = store.fetch(&ContentHandle::new(bad)).await.err().unwrap();
            assert!(matches!(err, StoreError::NotFound(_)), "{}", bad);
        }

        let missing = content_handle(b"never stored");
        let err = store.fetch(&missing).await.err().unwrap();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
