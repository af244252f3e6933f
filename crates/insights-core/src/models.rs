use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Reference identifiers ─────────────────────────────────────────────────────

/// `ref_id` of the table holding every issue row.
pub const ISSUES_REF: &str = "issues";
/// `ref_id` of the table of created issues (`createdAt`, `labels`).
pub const ISSUES_CREATED_REF: &str = "issues_created";
/// `ref_id` of the table of closed issues (`closedAt`, `labels`).
pub const ISSUES_CLOSED_REF: &str = "issues_closed";

/// Display name of the created-issues table and its count column.
pub const ISSUES_CREATED_NAME: &str = "Issues Created";
/// Display name of the closed-issues table and its count column.
pub const ISSUES_CLOSED_NAME: &str = "Issues Closed";

/// Suffix appended to an input `ref_id` for its time-bucketed output.
pub const DATES_SUFFIX: &str = "_DATES";

/// Column names shared between the reader and the pipelines.
pub mod columns {
    pub const TITLE: &str = "title";
    pub const CREATED_AT: &str = "createdAt";
    pub const CLOSED_AT: &str = "closedAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const AUTHOR: &str = "author";
    pub const STATE: &str = "state";
    pub const LABELS: &str = "labels";
    pub const WCAG_CONFORMANCE: &str = "wcag conformance";
    pub const RESET_DATE: &str = "reset date";
}

// ── Issue export models ───────────────────────────────────────────────────────

/// A single issue as found in a GitHub issue-search export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue title.
    #[serde(default)]
    pub title: String,
    /// When the issue was opened.
    pub created_at: DateTime<Utc>,
    /// When the issue was closed, if it has been.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// `"open"` or `"closed"`.
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Issue {
    /// Label names joined with `,`, the raw form the label pipeline consumes.
    pub fn joined_labels(&self) -> String {
        self.labels
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// Envelope of the issue-search API: `{ "items": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIssuesResponse {
    #[serde(default)]
    pub items: Vec<Issue>,
}

/// An export file holds either a search envelope or a bare array of issues.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IssueExport {
    Search(SearchIssuesResponse),
    List(Vec<Issue>),
}

impl IssueExport {
    pub fn into_issues(self) -> Vec<Issue> {
        match self {
            IssueExport::Search(response) => response.items,
            IssueExport::List(issues) => issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUE_JSON: &str = r#"{
        "title": "Button lacks accessible name",
        "created_at": "2024-01-05T10:00:00Z",
        "closed_at": null,
        "updated_at": "2024-01-06T10:00:00Z",
        "state": "open",
        "user": { "login": "octocat" },
        "labels": [
            { "name": "wcag-a", "color": "ff0000" },
            { "name": "type/accessibility", "color": "00ff00" }
        ]
    }"#;

    #[test]
    fn test_issue_deserializes_from_search_item() {
        let issue: Issue = serde_json::from_str(ISSUE_JSON).unwrap();
        assert_eq!(issue.title, "Button lacks accessible name");
        assert!(issue.closed_at.is_none());
        assert_eq!(issue.user.login, "octocat");
        assert_eq!(issue.labels.len(), 2);
    }

    #[test]
    fn test_joined_labels() {
        let issue: Issue = serde_json::from_str(ISSUE_JSON).unwrap();
        assert_eq!(issue.joined_labels(), "wcag-a,type/accessibility");
    }

    #[test]
    fn test_export_accepts_search_envelope() {
        let json = format!(r#"{{ "total_count": 1, "items": [{ISSUE_JSON}] }}"#);
        let export: IssueExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export.into_issues().len(), 1);
    }

    #[test]
    fn test_export_accepts_bare_array() {
        let json = format!("[{ISSUE_JSON}, {ISSUE_JSON}]");
        let export: IssueExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export.into_issues().len(), 2);
    }
}
