//! Instrumented fakes for the collaborator traits.
//!
//! The sync fakes count how many calls are inside them at once so tests can
//! check concurrency ceilings. The failing stores drive the facade's error
//! paths.

use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

use pkgsync_core::{ContentHandle, Package, PackageInfo, Query, Response};
use pkgsync_store::{
    content_handle, BlobReader, BlobStore, PackageAdder, PackageGetter, PackageLister, StoreError,
    TupleStore,
};

/// Error returned by the fakes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FakeError {
    #[error("inventory unavailable: {0}")]
    Inventory(String),
    #[error("cannot fetch {0}")]
    Fetch(String),
    #[error("cannot publish {0}")]
    Publish(String),
}

/// Concurrent-call counter.
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a call as started; it ends when the guard drops.
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self)
    }

    /// Calls inside right now.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Most calls ever inside at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Calls started so far.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Lister returning a fixed inventory, or failing.
pub struct FakeLister {
    inventory: Result<Vec<PackageInfo>, FakeError>,
}

impl FakeLister {
    pub fn new(infos: Vec<PackageInfo>) -> Self {
        Self {
            inventory: Ok(infos),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            inventory: Err(FakeError::Inventory(reason.into())),
        }
    }
}

#[async_trait]
impl PackageLister for FakeLister {
    type Error = FakeError;

    async fn installed_packages(&self) -> Result<Vec<PackageInfo>, FakeError> {
        self.inventory.clone()
    }
}

/// Deterministic payload the fake getter produces for a package.
pub fn fake_payload(info: &PackageInfo) -> Bytes {
    Bytes::from(format!("{} payload for {}", info.name, info.system))
}

/// Getter that fabricates payloads, optionally slowly or failing by name.
pub struct FakeGetter {
    fail: HashSet<String>,
    delay: Duration,
    in_flight: Arc<InFlight>,
}

impl FakeGetter {
    pub fn new() -> Self {
        Self {
            fail: HashSet::new(),
            delay: Duration::ZERO,
            in_flight: InFlight::new(),
        }
    }

    /// Fail every fetch of these package names.
    pub fn failing<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail.extend(names.into_iter().map(Into::into));
        self
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn in_flight(&self) -> Arc<InFlight> {
        Arc::clone(&self.in_flight)
    }
}

impl Default for FakeGetter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageGetter for FakeGetter {
    type Error = FakeError;

    async fn get(&self, info: &PackageInfo) -> Result<Package, FakeError> {
        let _guard = self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.contains(&info.name) {
            return Err(FakeError::Fetch(info.name.clone()));
        }
        Ok(Package::new(info.clone(), fake_payload(info)))
    }
}

/// Adder that records what it was given.
pub struct FakeAdder {
    fail: HashSet<String>,
    delay: Duration,
    in_flight: Arc<InFlight>,
    added: Mutex<Vec<Package>>,
}

impl FakeAdder {
    pub fn new() -> Self {
        Self {
            fail: HashSet::new(),
            delay: Duration::ZERO,
            in_flight: InFlight::new(),
            added: Mutex::new(Vec::new()),
        }
    }

    /// Fail every publish of these package names.
    pub fn failing<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail.extend(names.into_iter().map(Into::into));
        self
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn in_flight(&self) -> Arc<InFlight> {
        Arc::clone(&self.in_flight)
    }

    /// Packages published so far, sorted by name.
    pub fn added(&self) -> Vec<Package> {
        let mut added = self
            .added
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default();
        added.sort_by(|a, b| a.info.name.cmp(&b.info.name));
        added
    }
}

impl Default for FakeAdder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageAdder for FakeAdder {
    type Error = FakeError;

    async fn add(&self, mut pack: Package) -> Result<PackageInfo, FakeError> {
        let _guard = self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.contains(&pack.info.name) {
            return Err(FakeError::Publish(pack.info.name.clone()));
        }

        pack.info.content_handle = content_handle(&pack.payload);
        let info = pack.info.clone();
        if let Ok(mut added) = self.added.lock() {
            added.push(pack);
        }
        Ok(info)
    }
}

/// Blob store whose writes fail and whose blobs break mid-read.
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn store(&self, _data: Bytes) -> pkgsync_store::Result<ContentHandle> {
        Err(StoreError::Io(io::Error::other("disk full")))
    }

    async fn fetch(&self, _handle: &ContentHandle) -> pkgsync_store::Result<BlobReader> {
        Ok(Box::new(BrokenReader))
    }
}

/// Reader that fails on first read.
struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection dropped",
        )))
    }
}

/// Tuple store that fails every query.
pub struct FailingTupleStore;

#[async_trait]
impl TupleStore for FailingTupleStore {
    async fn execute(&self, query: &Query) -> pkgsync_store::Result<Response> {
        Err(StoreError::InvalidData(format!(
            "remote store refused {}",
            query.table()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_counts() {
        let counter = InFlight::new();
        {
            let _a = counter.enter();
            let _b = counter.enter();
            assert_eq!(counter.current(), 2);
        }
        let _c = counter.enter();
        assert_eq!(counter.current(), 1);
        assert_eq!(counter.peak(), 2);
        assert_eq!(counter.total(), 3);
    }

    #[tokio::test]
    async fn test_fake_getter_fails_by_name() {
        let getter = FakeGetter::new().failing(["broken"]);
        let ok = PackageInfo::new("fine", "ubuntu16.04");
        let pack = getter.get(&ok).await.unwrap();
        assert_eq!(pack.payload, fake_payload(&ok));

        let err = getter
            .get(&PackageInfo::new("broken", "ubuntu16.04"))
            .await
            .unwrap_err();
        assert_eq!(err, FakeError::Fetch("broken".into()));
        assert_eq!(getter.in_flight().total(), 2);
        assert_eq!(getter.in_flight().current(), 0);
    }

    #[tokio::test]
    async fn test_fake_adder_sets_handle() {
        let adder = FakeAdder::new();
        let info = PackageInfo::new("curl", "ubuntu16.04");
        let added = adder
            .add(Package::new(info.clone(), fake_payload(&info)))
            .await
            .unwrap();
        assert_eq!(added.content_handle, content_handle(&fake_payload(&info)));
        assert_eq!(adder.added().len(), 1);
    }
}
