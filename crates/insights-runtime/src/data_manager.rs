//! TTL-cached source of issue snapshots.
//!
//! Wraps [`load_issues`] and [`issue_tables`] with a time-to-live cache and
//! retry logic. Callers use [`SnapshotSource::get_snapshot`] to obtain a
//! fresh-or-cached [`Snapshot`]; on repeated failure the previous snapshot
//! is returned.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use insights_core::error::Result;
use insights_data::reader::{issue_tables, load_issues};

use crate::pipeline::Snapshot;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// Maximum number of load attempts before falling back to the cached snapshot.
const MAX_RETRY_ATTEMPTS: u32 = 3;

// ── SnapshotSource ────────────────────────────────────────────────────────────

/// TTL-cached loader for the issue tables.
///
/// # Example
/// ```no_run
/// use insights_runtime::data_manager::SnapshotSource;
///
/// let mut source = SnapshotSource::new(30, "exports/".into());
/// if let Some(snapshot) = source.get_snapshot(false) {
///     println!("tables: {}", snapshot.len());
/// }
/// ```
pub struct SnapshotSource {
    /// Maximum age of a cached snapshot.
    cache_ttl: Duration,
    /// Export file or directory.
    data_path: PathBuf,
    cache: Option<Snapshot>,
    cache_timestamp: Option<Instant>,
    last_error: Option<String>,
}

impl SnapshotSource {
    pub fn new(cache_ttl_secs: u64, data_path: PathBuf) -> Self {
        Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            data_path,
            cache: None,
            cache_timestamp: None,
            last_error: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the snapshot, using the cache while it is within its TTL.
    ///
    /// `force_refresh` bypasses the cache. When every attempt fails the
    /// previous snapshot (if any) is returned.
    pub fn get_snapshot(&mut self, force_refresh: bool) -> Option<Snapshot> {
        if !force_refresh && self.is_cache_valid() {
            tracing::debug!("returning cached snapshot");
            return self.cache.clone();
        }

        match self.fetch_with_retry() {
            Ok(snapshot) => {
                tracing::debug!(tables = snapshot.len(), "snapshot cache updated");
                self.cache = Some(snapshot);
                self.cache_timestamp = Some(Instant::now());
                self.last_error = None;
                self.cache.clone()
            }
            Err(e) => {
                tracing::warn!(error = %e, "load failed; falling back to cached snapshot");
                self.last_error = Some(e);
                self.cache.clone()
            }
        }
    }

    /// Discard the cached snapshot.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the cached snapshot, or `None` before the first load.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    /// Description of the last load error, or `None`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn is_cache_valid(&self) -> bool {
        match (self.cache.as_ref(), self.cache_timestamp) {
            (Some(_), Some(ts)) => ts.elapsed() < self.cache_ttl,
            _ => false,
        }
    }

    /// Up to [`MAX_RETRY_ATTEMPTS`] loads with back-off of 0, 100 and 200 ms.
    fn fetch_with_retry(&self) -> std::result::Result<Snapshot, String> {
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                let sleep_ms = u64::from(attempt) * 100;
                tracing::debug!(attempt, sleep_ms, "retrying load after back-off");
                thread::sleep(Duration::from_millis(sleep_ms));
            }

            match self.fetch_fresh() {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "load attempt failed");
                    last_err = e.to_string();
                }
            }
        }

        Err(last_err)
    }

    fn fetch_fresh(&self) -> Result<Snapshot> {
        let issues = load_issues(&self.data_path)?;
        Ok(Arc::new(issue_tables(&issues)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
