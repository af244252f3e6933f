//! Headline numbers derived from the pipeline outputs and issue tables.

use std::fmt;

use insights_core::formatting::round_significant;
use insights_core::lookup::{column_values, find_table_by_ref};
use insights_core::models::{columns, DATES_SUFFIX, ISSUES_CLOSED_REF, ISSUES_CREATED_REF};
use insights_core::table::{FieldType, Table, Value};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

// ── Issue series summary ──────────────────────────────────────────────────────

/// Totals over the created/closed time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IssueSummary {
    pub created: u64,
    pub closed: u64,
    /// `closed / created`, two significant digits; `None` when nothing was created.
    pub closure_rate: Option<f64>,
}

/// Sum the bucketed created and closed counts found in `tables`.
pub fn summarize_issue_series(tables: &[Table]) -> IssueSummary {
    let created = series_total(tables, ISSUES_CREATED_REF);
    let closed = series_total(tables, ISSUES_CLOSED_REF);

    let closure_rate = if created == 0 {
        None
    } else {
        Some(round_significant(closed as f64 / created as f64, 2))
    };

    IssueSummary {
        created,
        closed,
        closure_rate,
    }
}

fn series_total(tables: &[Table], source_ref: &str) -> u64 {
    let ref_id = format!("{source_ref}{DATES_SUFFIX}");
    let column = find_table_by_ref(tables, &ref_id).and_then(|t| t.field_by_type(FieldType::Number));
    let Some(column) = column else {
        return 0;
    };

    column
        .values
        .iter()
        .filter_map(Value::as_f64)
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n as u64)
        .sum()
}

// ── Conformance levels ────────────────────────────────────────────────────────

/// WCAG conformance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConformanceLevel {
    A,
    AA,
    AAA,
}

impl ConformanceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConformanceLevel::A => "A",
            ConformanceLevel::AA => "AA",
            ConformanceLevel::AAA => "AAA",
        }
    }

    /// Parse `A`, `AA` or `AAA`, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(ConformanceLevel::A),
            "AA" => Some(ConformanceLevel::AA),
            "AAA" => Some(ConformanceLevel::AAA),
            _ => None,
        }
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of issues at each conformance level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConformanceLevels {
    pub a: u64,
    pub aa: u64,
    pub aaa: u64,
}

impl ConformanceLevels {
    fn add(&mut self, level: ConformanceLevel, count: u64) {
        match level {
            ConformanceLevel::A => self.a += count,
            ConformanceLevel::AA => self.aa += count,
            ConformanceLevel::AAA => self.aaa += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.a + self.aa + self.aaa
    }
}

/// Count the values of the `wcag conformance` column by level.
pub fn count_conformance_levels(table: Option<&Table>) -> ConformanceLevels {
    let mut levels = ConformanceLevels::default();
    for value in column_values(table, columns::WCAG_CONFORMANCE) {
        if let Some(level) = value.as_text().as_deref().and_then(ConformanceLevel::parse) {
            levels.add(level, 1);
        }
    }
    levels
}

/// Compiled matcher for conformance labels under one prefix.
#[derive(Debug, Clone)]
pub struct ConformanceMatcher {
    re: Regex,
}

impl ConformanceMatcher {
    /// Build the matcher for `prefix`; `None` when the pattern fails to
    /// compile.
    pub fn new(prefix: &str) -> Option<Self> {
        let pattern = format!(r"(?i)^\s*{}[-_/ ]?(a{{1,3}})\s*$", regex::escape(prefix));
        match Regex::new(&pattern) {
            Ok(re) => Some(Self { re }),
            Err(e) => {
                warn!(prefix, error = %e, "invalid conformance label pattern");
                None
            }
        }
    }

    /// Level encoded in a label such as `wcag-aa`, `wcag aa` or `WCAG/AAA`.
    pub fn level_of(&self, label: &str) -> Option<ConformanceLevel> {
        self.re
            .captures(label)
            .and_then(|caps| caps.get(1))
            .and_then(|m| ConformanceLevel::parse(m.as_str()))
    }
}

/// One-off form of [`ConformanceMatcher::level_of`].
pub fn conformance_level_of(label: &str, prefix: &str) -> Option<ConformanceLevel> {
    ConformanceMatcher::new(prefix)?.level_of(label)
}

/// Derive level counts from a label breakdown table.
///
/// Every key that names a level adds the counts of the breakdown's first
/// numeric column.
pub fn levels_from_label_table(table: &Table, prefix: &str) -> ConformanceLevels {
    let mut levels = ConformanceLevels::default();
    let (Some(keys), Some(counts), Some(matcher)) = (
        table.field_by_type(FieldType::String),
        table.field_by_type(FieldType::Number),
        ConformanceMatcher::new(prefix),
    ) else {
        return levels;
    };

    for (key, count) in keys.values.iter().zip(&counts.values) {
        let level = key.as_text().and_then(|label| matcher.level_of(&label));
        if let (Some(level), Some(count)) = (level, count.as_f64()) {
            levels.add(level, count.max(0.0) as u64);
        }
    }
    levels
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use insights_core::table::Column;

    fn series(ref_id: &str, counts: Vec<u64>) -> Table {
        let times = (0..counts.len() as i64).map(|i| i * 1_000).collect();
        Table::new(
            ref_id,
            vec![
                Column::times(columns::RESET_DATE, times),
                Column::counts("count", counts),
            ],
        )
        .unwrap()
    }

    // ── summarize_issue_series ────────────────────────────────────────────────

    #[test]
    fn test_summary_totals_and_rate() {
        let tables = vec![
            series("issues_created_DATES", vec![2, 1]),
            series("issues_closed_DATES", vec![0, 2]),
        ];

        let summary = summarize_issue_series(&tables);
        assert_eq!(summary.created, 3);
        assert_eq!(summary.closed, 2);
        assert_eq!(summary.closure_rate, Some(0.67));
    }

    #[test]
    fn test_summary_without_created_has_no_rate() {
        let tables = vec![series("issues_closed_DATES", vec![4])];

        let summary = summarize_issue_series(&tables);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.closed, 4);
        assert_eq!(summary.closure_rate, None);
    }

    #[test]
    fn test_summary_of_nothing_is_zero() {
        assert_eq!(summarize_issue_series(&[]), IssueSummary::default());
    }

    // ── count_conformance_levels ──────────────────────────────────────────────

    #[test]
    fn test_count_conformance_levels() {
        let table = Table::new(
            "issues",
            vec![Column::new(
                columns::WCAG_CONFORMANCE,
                FieldType::String,
                vec![
                    Value::String("A".into()),
                    Value::String(" aa ".into()),
                    Value::String("AAA".into()),
                    Value::String("AA".into()),
                    Value::String("AAAA".into()),
                    Value::Null,
                ],
            )],
        )
        .unwrap();

        let levels = count_conformance_levels(Some(&table));
        assert_eq!(levels, ConformanceLevels { a: 1, aa: 2, aaa: 1 });
        assert_eq!(levels.total(), 4);
    }

    #[test]
    fn test_count_conformance_levels_absent_table() {
        assert_eq!(count_conformance_levels(None), ConformanceLevels::default());
    }

    // ── conformance_level_of ──────────────────────────────────────────────────

    #[test]
    fn test_conformance_level_of_label_spellings() {
        assert_eq!(conformance_level_of("wcag-a", "wcag"), Some(ConformanceLevel::A));
        assert_eq!(conformance_level_of("wcag aa", "wcag"), Some(ConformanceLevel::AA));
        assert_eq!(conformance_level_of("WCAG/AAA", "wcag"), Some(ConformanceLevel::AAA));
        assert_eq!(conformance_level_of("wcagaa", "wcag"), Some(ConformanceLevel::AA));
    }

    #[test]
    fn test_conformance_level_of_rejects_other_labels() {
        assert_eq!(conformance_level_of("no-wcag label", "wcag"), None);
        assert_eq!(conformance_level_of("wcag-2.1", "wcag"), None);
        assert_eq!(conformance_level_of("wcag-aaaa", "wcag"), None);
        assert_eq!(conformance_level_of("a11y-aa", "wcag"), None);
    }

    #[test]
    fn test_conformance_level_of_escapes_prefix() {
        assert_eq!(conformance_level_of("a.b-aa", "a.b"), Some(ConformanceLevel::AA));
        assert_eq!(conformance_level_of("axb-aa", "a.b"), None);
    }

    #[test]
    fn test_conformance_matcher_reused_across_labels() {
        let matcher = ConformanceMatcher::new("wcag").unwrap();
        let levels: Vec<_> = ["wcag-a", "bug", "WCAG AAA", "wcag-aa"]
            .iter()
            .map(|label| matcher.level_of(label))
            .collect();

        assert_eq!(
            levels,
            vec![
                Some(ConformanceLevel::A),
                None,
                Some(ConformanceLevel::AAA),
                Some(ConformanceLevel::AA),
            ]
        );
    }

    #[test]
    fn test_levels_from_label_table() {
        let table = Table::new(
            "LABEL_EXTRACTION_wcag",
            vec![
                Column::strings("wcag labels", vec!["wcag-a", "wcag-aa", "no-wcag label"]),
                Column::counts("Issues Created", vec![3, 2, 7]),
            ],
        )
        .unwrap();

        let levels = levels_from_label_table(&table, "wcag");
        assert_eq!(levels, ConformanceLevels { a: 3, aa: 2, aaa: 0 });
    }
}
