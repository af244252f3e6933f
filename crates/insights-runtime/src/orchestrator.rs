//! Async insights orchestrator.
//!
//! Runs a [`SnapshotSource`] and a [`TransformStage`] in a tokio task,
//! forwarding every published [`DerivedTables`] through an `mpsc` channel so
//! the caller can consume them without any shared mutable state.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;

use crate::data_manager::{SnapshotSource, DEFAULT_CACHE_TTL_SECS};
use crate::observer::Observable;
use crate::pipeline::{DerivedTables, Snapshot, TransformStage, ViewOptions};

// ── InsightsOrchestrator ──────────────────────────────────────────────────────

/// Background refresh coordinator.
///
/// Call [`InsightsOrchestrator::start`] to spin up the refresh loop in a
/// dedicated tokio task and receive a channel endpoint for
/// [`DerivedTables`] updates.
pub struct InsightsOrchestrator {
    /// How often to reload the exports.
    update_interval: Duration,
    /// Export file or directory.
    data_path: PathBuf,
    options: Observable<ViewOptions>,
}

impl InsightsOrchestrator {
    pub fn new(update_interval_secs: u64, data_path: PathBuf, options: ViewOptions) -> Self {
        Self {
            update_interval: Duration::from_secs(update_interval_secs),
            data_path,
            options: Observable::with_value(options),
        }
    }

    /// Start the refresh loop.
    ///
    /// Returns the receiver for derived tables and an [`InsightsHandle`]
    /// that can change the view options or abort the loop.
    pub fn start(self) -> (mpsc::Receiver<DerivedTables>, InsightsHandle) {
        // Buffer a modest number of results so slow consumers don't stall the loop.
        let (tx, rx) = mpsc::channel(16);
        let options = self.options.clone();

        let handle = tokio::spawn(async move {
            self.refresh_loop(tx).await;
        });

        (rx, InsightsHandle { handle, options })
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Loads immediately, then again on every `update_interval` tick. Exits
    /// when the receiver is dropped.
    ///
    /// Every load bypasses the source's cache; the cache only serves as the
    /// fallback when a reload fails.
    async fn refresh_loop(self, tx: mpsc::Sender<DerivedTables>) {
        let mut source = SnapshotSource::new(DEFAULT_CACHE_TTL_SECS, self.data_path.clone());
        let snapshots: Observable<Snapshot> = Observable::new();
        let stage = TransformStage::attach(&snapshots, &self.options);

        let _forward = {
            let tx = tx.clone();
            stage.output().subscribe(move |derived: &DerivedTables| {
                if let Err(e) = tx.try_send(derived.clone()) {
                    tracing::warn!(
                        generation = derived.generation,
                        error = %e,
                        "failed to forward derived tables"
                    );
                }
            })
        };

        refresh(&mut source, &snapshots);

        let mut interval = time::interval(self.update_interval);
        // The first tick fires immediately; the initial load already happened.
        interval.tick().await;

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("insights channel closed; exiting loop");
                break;
            }

            refresh(&mut source, &snapshots);
        }
    }
}

/// Reload and publish the snapshot, or skip when nothing could be loaded.
fn refresh(source: &mut SnapshotSource, snapshots: &Observable<Snapshot>) {
    match source.get_snapshot(true) {
        Some(snapshot) => snapshots.set(snapshot),
        None => tracing::warn!("no issue data available; skipping refresh"),
    }
}

// ── InsightsHandle ────────────────────────────────────────────────────────────

/// A handle to the background refresh task.
pub struct InsightsHandle {
    handle: tokio::task::JoinHandle<()>,
    options: Observable<ViewOptions>,
}

impl InsightsHandle {
    /// Replace the view options; the tables are re-derived right away.
    pub fn set_options(&self, options: ViewOptions) {
        self.options.set(options);
    }

    /// Immediately abort the refresh loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
