//! Issue export discovery and loading.
//!
//! Reads GitHub issue-search exports (either `{ "items": [...] }` envelopes
//! or bare arrays) from a file or a directory tree and turns them into the
//! tables the pipelines consume.

use std::path::{Path, PathBuf};

use insights_core::error::{InsightsError, Result};
use insights_core::models::{
    columns, Issue, IssueExport, ISSUES_CLOSED_NAME, ISSUES_CLOSED_REF, ISSUES_CREATED_NAME,
    ISSUES_CREATED_REF, ISSUES_REF,
};
use insights_core::table::{Column, FieldType, Table, Value};
use tracing::{debug, warn};

use crate::overview::ConformanceMatcher;

/// Label prefix that encodes an issue's conformance level.
pub const CONFORMANCE_LABEL_PREFIX: &str = "wcag";

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.json` files recursively under `data_path`, sorted by path.
pub fn find_export_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "json")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every issue from `path`, a single export file or a directory of them.
///
/// Files that cannot be read or parsed are skipped with a warning. Issues are
/// returned ordered by creation time.
pub fn load_issues(path: &Path) -> Result<Vec<Issue>> {
    if !path.exists() {
        return Err(InsightsError::DataPathNotFound(path.to_path_buf()));
    }

    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        find_export_files(path)
    };
    if files.is_empty() {
        return Err(InsightsError::NoDataFiles(path.to_path_buf()));
    }

    let mut issues: Vec<Issue> = Vec::new();
    for file in &files {
        match read_export(file) {
            Ok(parsed) => {
                debug!("Read {} issues from {}", parsed.len(), file.display());
                issues.extend(parsed);
            }
            Err(e) => warn!("Skipping {}: {}", file.display(), e),
        }
    }

    issues.sort_by_key(|issue| issue.created_at);

    debug!("Loaded {} issues from {} files", issues.len(), files.len());
    Ok(issues)
}

/// Parse one export file.
pub fn read_export(file: &Path) -> Result<Vec<Issue>> {
    let content = std::fs::read_to_string(file).map_err(|source| InsightsError::FileRead {
        path: file.to_path_buf(),
        source,
    })?;
    let export: IssueExport = serde_json::from_str(&content)?;
    Ok(export.into_issues())
}

/// Convert issues into a table with one row per issue.
pub fn issues_to_table(issues: &[&Issue], ref_id: &str, name: &str) -> Table {
    let matcher = ConformanceMatcher::new(CONFORMANCE_LABEL_PREFIX);
    let conformance = issues
        .iter()
        .map(|issue| {
            matcher
                .as_ref()
                .and_then(|m| issue.labels.iter().find_map(|label| m.level_of(&label.name)))
                .map_or(Value::Null, |level| Value::String(level.to_string()))
        })
        .collect();

    Table::from_aligned(
        ref_id,
        vec![
            Column::strings(columns::TITLE, issues.iter().map(|i| i.title.as_str()).collect()),
            Column::times(
                columns::CREATED_AT,
                issues.iter().map(|i| i.created_at.timestamp_millis()).collect(),
            ),
            Column::optional_times(
                columns::CLOSED_AT,
                issues
                    .iter()
                    .map(|i| i.closed_at.map(|t| t.timestamp_millis()))
                    .collect(),
            ),
            Column::times(
                columns::UPDATED_AT,
                issues.iter().map(|i| i.updated_at.timestamp_millis()).collect(),
            ),
            Column::strings(
                columns::AUTHOR,
                issues.iter().map(|i| i.user.login.as_str()).collect(),
            ),
            Column::strings(columns::STATE, issues.iter().map(|i| i.state.as_str()).collect()),
            Column::strings(
                columns::LABELS,
                issues.iter().map(|i| i.joined_labels()).collect(),
            ),
            Column::new(columns::WCAG_CONFORMANCE, FieldType::String, conformance),
        ],
    )
    .with_name(name)
}

/// Build the `issues`, `issues_created` and `issues_closed` tables.
///
/// Every issue counts as created; only issues with a close time count as
/// closed.
pub fn issue_tables(issues: &[Issue]) -> Vec<Table> {
    let all: Vec<&Issue> = issues.iter().collect();
    let closed: Vec<&Issue> = issues.iter().filter(|i| i.closed_at.is_some()).collect();

    vec![
        issues_to_table(&all, ISSUES_REF, "Issues"),
        issues_to_table(&all, ISSUES_CREATED_REF, ISSUES_CREATED_NAME),
        issues_to_table(&closed, ISSUES_CLOSED_REF, ISSUES_CLOSED_NAME),
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
