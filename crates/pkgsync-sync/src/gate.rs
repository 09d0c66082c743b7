//! Per-stage admission gates.
//!
//! Each pipeline stage owns one [`StageGate`]: a semaphore bounding how many
//! items may be inside the stage at once, plus in-flight and peak counters.
//! A [`StagePermit`] is held for the duration of one collaborator call and
//! returns its slot when dropped, on every exit path.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Result, SyncError};

/// A pipeline stage with its own concurrency ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    /// Pulling the package payload from the source.
    Fetch,
    /// Publishing the package to the destination.
    Publish,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStage::Fetch => write!(f, "fetch"),
            SyncStage::Publish => write!(f, "publish"),
        }
    }
}

/// Semaphore-backed admission gate for one stage.
#[derive(Debug)]
pub struct StageGate {
    stage: SyncStage,
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StageGate {
    /// Create a gate admitting at most `max_concurrent` items.
    ///
    /// A ceiling of zero is raised to one; callers resolve defaults first.
    pub fn new(stage: SyncStage, max_concurrent: usize) -> Self {
        let max_permits = max_concurrent.max(1);
        Self {
            stage,
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Wait for a slot in this stage.
    pub async fn acquire(self: &Arc<Self>) -> Result<StagePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SyncError::GateClosed(self.stage))?;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        Ok(StagePermit {
            _permit: permit,
            gate: Arc::clone(self),
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    /// Items currently inside the stage.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of items ever inside the stage at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// A held slot in a [`StageGate`].
#[derive(Debug)]
pub struct StagePermit {
    _permit: OwnedSemaphorePermit,
    gate: Arc<StageGate>,
}

impl Drop for StagePermit {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_tracks_in_flight() {
        let gate = Arc::new(StageGate::new(SyncStage::Fetch, 2));

        let a = gate.acquire().await.unwrap();
        let b = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);
        assert!(Arc::clone(&gate.semaphore).try_acquire_owned().is_err());

        drop(a);
        assert_eq!(gate.in_flight(), 1);
        drop(b);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_zero_ceiling_admits_one() {
        let gate = Arc::new(StageGate::new(SyncStage::Publish, 0));
        assert_eq!(gate.max_concurrent(), 1);
        let _permit = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_closed_gate_reports_stage() {
        let gate = Arc::new(StageGate::new(SyncStage::Publish, 1));
        gate.semaphore.close();
        let err = gate.acquire().await.unwrap_err();
        assert!(matches!(err, SyncError::GateClosed(SyncStage::Publish)));
        assert_eq!(err.to_string(), "publish gate closed");
    }

    #[test]
    fn test_stage_serde() {
        assert_eq!(serde_json::to_string(&SyncStage::Fetch).unwrap(), "\"fetch\"");
    }
}
