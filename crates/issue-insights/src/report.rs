//! Text and JSON rendering of [`DerivedTables`] for the terminal.

use insights_core::formatting::{format_number, render_table};
use insights_core::table::Table;
use insights_runtime::pipeline::DerivedTables;
use serde_json::{json, Map, Value};

/// Render the parts of `derived` selected by `view` in `format`.
pub fn render(derived: &DerivedTables, view: &str, format: &str) -> anyhow::Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(&to_json(derived, view))? + "\n"),
        _ => Ok(render_text(derived, view)),
    }
}

fn shows(view: &str, section: &str) -> bool {
    view == "all" || view == section
}

// ── Text ──────────────────────────────────────────────────────────────────────

fn render_text(derived: &DerivedTables, view: &str) -> String {
    let options = &derived.options;
    let mut sections = Vec::new();

    if shows(view, "labels") {
        sections.push(format!(
            "Labels ({})\n{}",
            options.label_prefix,
            render_table(&derived.labels, options.unit, &options.timezone)
        ));
    }

    if shows(view, "timeseries") {
        let body = match &derived.timeseries {
            Some(series) => render_table(&side_by_side(series), options.unit, &options.timezone),
            None => "No created and closed issues to compare.\n".to_string(),
        };
        sections.push(format!("Issues per {}\n{}", options.unit, body));
    }

    if shows(view, "summary") {
        let summary = &derived.summary;
        let rate = summary
            .closure_rate
            .map_or_else(|| "-".to_string(), |r| format!("{}%", format_number(r * 100.0, 0)));
        let levels = &derived.conformance;
        sections.push(format!(
            "Summary\nCreated:       {}\nClosed:        {}\nClosure rate:  {}\nConformance:   A {} / AA {} / AAA {}\n",
            format_number(summary.created as f64, 0),
            format_number(summary.closed as f64, 0),
            rate,
            levels.a,
            levels.aa,
            levels.aaa,
        ));
    }

    sections.join("\n")
}

/// Join the created and closed series on their shared date column.
fn side_by_side([created, closed]: &[Table; 2]) -> Table {
    let fields = created
        .fields()
        .iter()
        .chain(closed.fields().iter().skip(1))
        .cloned()
        .collect();
    Table::from_aligned("issues_by_date", fields)
}

// ── JSON ──────────────────────────────────────────────────────────────────────

fn to_json(derived: &DerivedTables, view: &str) -> Value {
    let options = &derived.options;
    let mut out = Map::new();
    out.insert("generation".into(), json!(derived.generation));
    out.insert("unit".into(), json!(options.unit.as_str()));
    out.insert("labelPrefix".into(), json!(options.label_prefix));
    out.insert("timezone".into(), json!(options.timezone.name()));

    if shows(view, "labels") {
        out.insert("labels".into(), json!(derived.labels));
    }
    if shows(view, "timeseries") {
        out.insert("timeseries".into(), json!(derived.timeseries));
    }
    if shows(view, "summary") {
        out.insert("summary".into(), json!(derived.summary));
        out.insert("conformance".into(), json!(derived.conformance));
    }

    Value::Object(out)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use insights_core::models::{columns, ISSUES_CLOSED_REF, ISSUES_CREATED_REF};
    use insights_core::table::Column;
    use insights_runtime::pipeline::{derive_tables, ViewOptions};

    // 2024-01-05T10:00Z, 2024-02-03T10:00Z
    const JAN_05: i64 = 1_704_448_800_000;
    const FEB_03: i64 = 1_706_954_400_000;

    fn derived() -> DerivedTables {
        let tables = vec![
            Table::new(
                ISSUES_CREATED_REF,
                vec![
                    Column::times(columns::CREATED_AT, vec![JAN_05, FEB_03]),
                    Column::strings(columns::LABELS, vec!["wcag-a", "bug"]),
                ],
            )
            .unwrap()
            .with_name("Issues Created"),
            Table::new(
                ISSUES_CLOSED_REF,
                vec![
                    Column::times(columns::CLOSED_AT, vec![FEB_03]),
                    Column::strings(columns::LABELS, vec!["wcag-a"]),
                ],
            )
            .unwrap()
            .with_name("Issues Closed"),
        ];
        derive_tables(&tables, &ViewOptions::default(), 3)
    }

    #[test]
    fn test_render_text_timeseries_side_by_side() {
        let text = render(&derived(), "timeseries", "table").unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Issues per month");
        assert_eq!(lines[1], "reset date  Issues Created  Issues Closed");
        assert_eq!(lines[3], "2024-01     1               0");
        assert_eq!(lines[4], "2024-02     1               1");
    }

    #[test]
    fn test_render_text_summary() {
        let text = render(&derived(), "summary", "table").unwrap();

        assert!(text.starts_with("Summary\n"));
        assert!(text.contains("Created:       2\n"));
        assert!(text.contains("Closure rate:  50%\n"));
        assert!(text.contains("A 1 / AA 0 / AAA 0"));
    }

    #[test]
    fn test_render_text_all_has_every_section() {
        let text = render(&derived(), "all", "table").unwrap();

        assert!(text.contains("Labels (wcag)\n"));
        assert!(text.contains("no-wcag label"));
        assert!(text.contains("Issues per month\n"));
        assert!(text.contains("Summary\n"));
    }

    #[test]
    fn test_render_json_selects_view() {
        let json: Value =
            serde_json::from_str(&render(&derived(), "labels", "json").unwrap()).unwrap();

        assert_eq!(json["generation"], 3);
        assert_eq!(json["unit"], "month");
        assert_eq!(json["timezone"], "UTC");
        assert_eq!(json["labels"]["refId"], "LABEL_EXTRACTION_wcag");
        assert!(json.get("timeseries").is_none());
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_render_json_timeseries_pair() {
        let json: Value =
            serde_json::from_str(&render(&derived(), "all", "json").unwrap()).unwrap();

        assert_eq!(json["timeseries"][0]["refId"], "issues_created_DATES");
        assert_eq!(json["timeseries"][1]["refId"], "issues_closed_DATES");
        assert_eq!(json["summary"]["closure_rate"], 0.5);
        assert_eq!(json["conformance"]["a"], 1);
    }
}
