//! Label frequency breakdown across the created and closed issue tables.
//!
//! Each row's comma-separated label field is lower-cased and split; every
//! token starting with the configured prefix counts towards its own key,
//! and a row with no matching token counts once towards the sentinel
//! `no-<prefix> label` key. A genuine label spelled exactly like the
//! sentinel lands in the same bucket.

use std::collections::HashMap;

use insights_core::lookup::{find_table_by_ref, text_values};
use insights_core::models::{columns, ISSUES_CLOSED_REF, ISSUES_CREATED_REF};
use insights_core::table::{Column, Table};
use tracing::debug;

/// Key that absorbs rows without any label matching `prefix`.
pub fn sentinel_key(prefix: &str) -> String {
    format!("no-{prefix} label")
}

/// `ref_id` of the label breakdown table for `prefix`.
pub fn label_table_ref(prefix: &str) -> String {
    format!("LABEL_EXTRACTION_{prefix}")
}

// ── LabelCounts ───────────────────────────────────────────────────────────────

/// Label → count map that remembers first-discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelCounts {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl LabelCounts {
    fn increment(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.order.push(key.to_string());
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    /// Count for `key`, 0 when it was never observed.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Keys in the order they were first seen.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Count the `prefix` labels of every row in `table`'s `labels` column.
pub fn extract_labels(table: &Table, prefix: &str) -> LabelCounts {
    let sentinel = sentinel_key(prefix);
    let mut counts = LabelCounts::default();

    for raw in text_values(Some(table), columns::LABELS) {
        let lowered = raw.to_lowercase();
        let mut matched = false;

        for token in lowered.split(',') {
            if token.starts_with(prefix) {
                counts.increment(token);
                matched = true;
            }
        }

        if !matched {
            counts.increment(&sentinel);
        }
    }

    counts
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Build the label breakdown from the created and closed issue tables.
///
/// Missing source tables contribute nothing. The output has a
/// `<prefix> labels` string column followed by one count column per
/// present source, named after that source's display name.
pub fn aggregate_labels(tables: &[Table], prefix: &str) -> Table {
    let sources: Vec<&Table> = [ISSUES_CREATED_REF, ISSUES_CLOSED_REF]
        .into_iter()
        .filter_map(|ref_id| find_table_by_ref(tables, ref_id))
        .collect();

    build_label_table(prefix, &sources)
}

/// Merge per-source label counts into one table keyed by the union of
/// labels, created-source keys first.
pub fn build_label_table(prefix: &str, sources: &[&Table]) -> Table {
    let per_source: Vec<LabelCounts> = sources
        .iter()
        .map(|table| extract_labels(table, prefix))
        .collect();

    let mut keys: Vec<String> = Vec::new();
    for counts in &per_source {
        for key in counts.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }

    let mut fields = Vec::with_capacity(sources.len() + 1);
    fields.push(Column::strings(format!("{prefix} labels"), keys.clone()));
    for (table, counts) in sources.iter().zip(&per_source) {
        let values = keys.iter().map(|key| counts.get(key)).collect();
        fields.push(Column::counts(table.name().unwrap_or_default(), values));
    }

    debug!(
        prefix,
        sources = sources.len(),
        labels = keys.len(),
        "label breakdown built"
    );

    Table::from_aligned(label_table_ref(prefix), fields)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
