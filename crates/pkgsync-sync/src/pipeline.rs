//! Bulk "push everything installed" pipeline.
//!
//! Every listed package moves through two stages, each behind its own
//! [`StageGate`]:
//!
//! ```text
//! Listed -> Fetching -> Fetched -> Publishing -> Published
//!              |                        |
//!              +-> FetchFailed          +-> PublishFailed
//! ```
//!
//! There are no retries and no backward transitions. A failed item is logged,
//! recorded in the [`SyncReport`], and abandoned; it never fails the call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use pkgsync_core::PackageInfo;
use pkgsync_store::{PackageAdder, PackageGetter, PackageLister};

use crate::error::{Result, SyncError};
use crate::gate::{StageGate, SyncStage};

/// Ceiling used for a stage configured with zero.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Concurrency ceilings for a bulk sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum simultaneous fetches from the package source.
    pub fetch_concurrency: usize,
    /// Maximum simultaneous publishes to the destination.
    pub publish_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_CONCURRENCY,
            publish_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SyncConfig {
    pub fn new(fetch_concurrency: usize, publish_concurrency: usize) -> Self {
        Self {
            fetch_concurrency,
            publish_concurrency,
        }
    }

    /// The config with zero ceilings replaced by [`DEFAULT_CONCURRENCY`].
    pub fn effective(self) -> Self {
        let or_default = |n: usize| if n == 0 { DEFAULT_CONCURRENCY } else { n };
        Self {
            fetch_concurrency: or_default(self.fetch_concurrency),
            publish_concurrency: or_default(self.publish_concurrency),
        }
    }
}

/// One abandoned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub info: PackageInfo,
    pub stage: SyncStage,
    pub error: String,
}

/// Outcome of a bulk sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Packages returned by the lister.
    pub listed: usize,
    /// Packages whose payload was fetched.
    pub fetched: usize,
    /// Packages published, with their content handles set.
    pub published: Vec<PackageInfo>,
    /// Items that failed, in listing order.
    pub failures: Vec<SyncFailure>,
    /// Most fetches observed in flight at once.
    pub peak_fetches: usize,
    /// Most publishes observed in flight at once.
    pub peak_publishes: usize,
}

impl SyncReport {
    /// True when every listed package was published.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures in one stage.
    pub fn failures_in(&self, stage: SyncStage) -> impl Iterator<Item = &SyncFailure> + '_ {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}

enum ItemOutcome {
    Published(PackageInfo),
    Failed {
        stage: SyncStage,
        fetched: bool,
        error: String,
    },
}

/// Runs bulk syncs from one getter to one adder.
pub struct Syncer<G, A> {
    getter: Arc<G>,
    adder: Arc<A>,
    config: SyncConfig,
}

impl<G, A> Syncer<G, A>
where
    G: PackageGetter + 'static,
    A: PackageAdder + 'static,
{
    pub fn new(getter: Arc<G>, adder: Arc<A>, config: SyncConfig) -> Self {
        Self {
            getter,
            adder,
            config: config.effective(),
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// List every package from `lister`, then fetch and publish each one.
    ///
    /// Only a listing failure is returned as an error. The call returns after
    /// every item has reached a terminal state.
    pub async fn add_all_packages<L>(&self, lister: &L) -> Result<SyncReport>
    where
        L: PackageLister + ?Sized,
    {
        let infos = lister
            .installed_packages()
            .await
            .map_err(|e| SyncError::Inventory(Box::new(e)))?;

        tracing::info!(
            count = infos.len(),
            fetch_concurrency = self.config.fetch_concurrency,
            publish_concurrency = self.config.publish_concurrency,
            "syncing installed packages"
        );

        let fetch_gate = Arc::new(StageGate::new(
            SyncStage::Fetch,
            self.config.fetch_concurrency,
        ));
        let publish_gate = Arc::new(StageGate::new(
            SyncStage::Publish,
            self.config.publish_concurrency,
        ));

        let mut report = SyncReport {
            listed: infos.len(),
            ..SyncReport::default()
        };

        let tasks: Vec<(PackageInfo, JoinHandle<ItemOutcome>)> = infos
            .into_iter()
            .map(|info| {
                let task = tokio::spawn(sync_one(
                    info.clone(),
                    Arc::clone(&self.getter),
                    Arc::clone(&self.adder),
                    Arc::clone(&fetch_gate),
                    Arc::clone(&publish_gate),
                ));
                (info, task)
            })
            .collect();

        for (info, task) in tasks {
            // sync_one turns a publish panic into a Publish failure, so a
            // join error here can only come from the fetch half.
            let outcome = task.await.unwrap_or_else(|e| ItemOutcome::Failed {
                stage: SyncStage::Fetch,
                fetched: false,
                error: format!("fetch task failed: {}", e),
            });

            match outcome {
                ItemOutcome::Published(published) => {
                    report.fetched += 1;
                    report.published.push(published);
                }
                ItemOutcome::Failed {
                    stage,
                    fetched,
                    error,
                } => {
                    if fetched {
                        report.fetched += 1;
                    }
                    report.failures.push(SyncFailure { info, stage, error });
                }
            }
        }

        report.peak_fetches = fetch_gate.peak_in_flight();
        report.peak_publishes = publish_gate.peak_in_flight();

        tracing::info!(
            listed = report.listed,
            fetched = report.fetched,
            published = report.published.len(),
            failed = report.failures.len(),
            "sync finished"
        );

        Ok(report)
    }
}

/// Fetch one package, then hand it to a publish task and wait for it.
async fn sync_one<G, A>(
    info: PackageInfo,
    getter: Arc<G>,
    adder: Arc<A>,
    fetch_gate: Arc<StageGate>,
    publish_gate: Arc<StageGate>,
) -> ItemOutcome
where
    G: PackageGetter + 'static,
    A: PackageAdder + 'static,
{
    let fetched = match fetch_gate.acquire().await {
        Ok(_permit) => getter.get(&info).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let pack = match fetched {
        Ok(pack) => pack,
        Err(error) => {
            tracing::warn!(package = %info, %error, "failed to fetch package, skipping");
            return ItemOutcome::Failed {
                stage: SyncStage::Fetch,
                fetched: false,
                error,
            };
        }
    };
    tracing::debug!(package = %info, bytes = pack.payload.len(), "fetched");

    let publish = tokio::spawn(async move {
        let _permit = publish_gate.acquire().await.map_err(|e| e.to_string())?;
        adder.add(pack).await.map_err(|e| e.to_string())
    });

    let published = publish
        .await
        .unwrap_or_else(|e| Err(format!("publish task failed: {}", e)));

    match published {
        Ok(published) => {
            tracing::info!(package = %published, handle = %published.content_handle, "synced");
            ItemOutcome::Published(published)
        }
        Err(error) => {
            tracing::warn!(package = %info, %error, "failed to publish package, skipping");
            ItemOutcome::Failed {
                stage: SyncStage::Publish,
                fetched: true,
                error,
            }
        }
    }
}

/// List, fetch and publish every installed package.
///
/// A ceiling of zero means [`DEFAULT_CONCURRENCY`].
pub async fn add_all_packages<L, G, A>(
    lister: &L,
    getter: Arc<G>,
    adder: Arc<A>,
    fetch_concurrency: usize,
    publish_concurrency: usize,
) -> Result<SyncReport>
where
    L: PackageLister + ?Sized,
    G: PackageGetter + 'static,
    A: PackageAdder + 'static,
{
    Syncer::new(
        getter,
        adder,
        SyncConfig::new(fetch_concurrency, publish_concurrency),
    )
    .add_all_packages(lister)
    .await
}
