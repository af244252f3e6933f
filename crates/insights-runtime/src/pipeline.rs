//! Transform stage that re-derives the insight tables whenever the issue
//! snapshot or the view options change.
//!
//! The derivation itself ([`derive_tables`]) is a pure function of its
//! inputs. [`TransformStage`] only wires it to two [`Observable`] inputs and
//! publishes generation-tagged results; a result older than the newest
//! published generation is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono_tz::Tz;
use insights_core::lookup::find_table_by_ref;
use insights_core::models::ISSUES_REF;
use insights_core::table::Table;
use insights_core::time_utils::TimeUnit;
use insights_data::labels::aggregate_labels;
use insights_data::overview::{
    count_conformance_levels, levels_from_label_table, summarize_issue_series, ConformanceLevels,
    IssueSummary,
};
use insights_data::timeseries::issues_by_date;

use crate::observer::{Observable, Subscription};

/// Immutable set of source tables shared between stages.
pub type Snapshot = Arc<Vec<Table>>;

// ── View options ──────────────────────────────────────────────────────────────

/// User-selectable parameters of the derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub unit: TimeUnit,
    pub label_prefix: String,
    pub timezone: Tz,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            unit: TimeUnit::default(),
            label_prefix: "wcag".to_string(),
            timezone: Tz::UTC,
        }
    }
}

// ── Derived tables ────────────────────────────────────────────────────────────

/// Everything derived from one snapshot under one set of options.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTables {
    /// Monotonically increasing per stage; newer results have larger values.
    pub generation: u64,
    pub options: ViewOptions,
    pub labels: Table,
    /// Created and closed counts per bucket; `None` unless both sources exist.
    pub timeseries: Option<[Table; 2]>,
    pub summary: IssueSummary,
    pub conformance: ConformanceLevels,
}

/// Run every pipeline over `tables`.
pub fn derive_tables(tables: &[Table], options: &ViewOptions, generation: u64) -> DerivedTables {
    let labels = aggregate_labels(tables, &options.label_prefix);
    let timeseries = issues_by_date(tables, options.unit, &options.timezone);
    let summary = match &timeseries {
        Some(series) => summarize_issue_series(series),
        None => IssueSummary::default(),
    };

    let mut conformance = count_conformance_levels(find_table_by_ref(tables, ISSUES_REF));
    if conformance.total() == 0 {
        conformance = levels_from_label_table(&labels, &options.label_prefix);
    }

    DerivedTables {
        generation,
        options: options.clone(),
        labels,
        timeseries,
        summary,
        conformance,
    }
}

// ── TransformStage ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inputs {
    snapshot: Option<Snapshot>,
    options: Option<ViewOptions>,
}

struct StageState {
    inputs: Mutex<Inputs>,
    next_generation: AtomicU64,
    /// Newest generation published so far.
    published: Mutex<u64>,
    output: Observable<DerivedTables>,
}

impl StageState {
    fn run(&self) {
        // Generations are handed out under the inputs lock so a newer
        // generation always sees newer inputs.
        let (generation, snapshot, options) = {
            let inputs = self.inputs.lock().unwrap_or_else(|e| e.into_inner());
            match (&inputs.snapshot, &inputs.options) {
                (Some(snapshot), Some(options)) => (
                    self.next_generation.fetch_add(1, Ordering::SeqCst) + 1,
                    Arc::clone(snapshot),
                    options.clone(),
                ),
                _ => {
                    tracing::debug!("transform skipped; inputs incomplete");
                    return;
                }
            }
        };

        let derived = derive_tables(&snapshot, &options, generation);
        self.publish(derived);
    }

    fn publish(&self, derived: DerivedTables) {
        {
            let mut published = self.published.lock().unwrap_or_else(|e| e.into_inner());
            if derived.generation <= *published {
                tracing::debug!(
                    generation = derived.generation,
                    newest = *published,
                    "discarding stale derived tables"
                );
                return;
            }
            *published = derived.generation;
        }
        // Output listeners may change an input and re-enter `run`, so the
        // guard above must be released first.
        tracing::debug!(
            generation = derived.generation,
            labels = derived.labels.len(),
            "derived tables published"
        );
        self.output.set(derived);
    }
}

/// Listens to the snapshot and option inputs and re-runs [`derive_tables`]
/// on every change. Dropping the stage detaches it from its inputs.
pub struct TransformStage {
    state: Arc<StageState>,
    _subscriptions: [Subscription; 2],
}

impl TransformStage {
    /// Attach to `snapshots` and `options`, running once immediately when
    /// both already hold a value.
    pub fn attach(snapshots: &Observable<Snapshot>, options: &Observable<ViewOptions>) -> Self {
        let state = Arc::new(StageState {
            inputs: Mutex::new(Inputs::default()),
            next_generation: AtomicU64::new(0),
            published: Mutex::new(0),
            output: Observable::new(),
        });

        let on_snapshot = {
            let state = Arc::clone(&state);
            snapshots.subscribe(move |snapshot: &Snapshot| {
                state.inputs.lock().unwrap_or_else(|e| e.into_inner()).snapshot =
                    Some(Arc::clone(snapshot));
                state.run();
            })
        };
        let on_options = {
            let state = Arc::clone(&state);
            options.subscribe(move |options: &ViewOptions| {
                state.inputs.lock().unwrap_or_else(|e| e.into_inner()).options =
                    Some(options.clone());
                state.run();
            })
        };

        // Seed only after subscribing; a value set in between has already
        // reached the listener and is newer than what `get` returns.
        let (seed_snapshot, seed_options) = (snapshots.get(), options.get());
        {
            let mut inputs = state.inputs.lock().unwrap_or_else(|e| e.into_inner());
            if inputs.snapshot.is_none() {
                inputs.snapshot = seed_snapshot;
            }
            if inputs.options.is_none() {
                inputs.options = seed_options;
            }
        }
        state.run();

        Self {
            state,
            _subscriptions: [on_snapshot, on_options],
        }
    }

    /// Observable carrying each published [`DerivedTables`].
    pub fn output(&self) -> &Observable<DerivedTables> {
        &self.state.output
    }

    /// Most recently published result.
    pub fn latest(&self) -> Option<DerivedTables> {
        self.state.output.get()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
