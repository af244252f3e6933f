//! Plain-text rendering of derived tables and summary numbers.

use chrono_tz::Tz;

use crate::table::{Table, Value};
use crate::time_utils::{format_bucket, TimeUnit};

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by half an ULP at the target precision so exact midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` starts with "0.", keep only ".NN".
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Round `value` to `digits` significant digits.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::round_significant;
///
/// assert_eq!(round_significant(2.0 / 3.0, 2), 0.67);
/// assert_eq!(round_significant(123.0, 2), 120.0);
/// assert_eq!(round_significant(0.0, 2), 0.0);
/// ```
pub fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let shift = digits as i32 - 1 - magnitude;
    if shift >= 0 {
        let scale = 10_f64.powi(shift);
        (value * scale).round() / scale
    } else {
        let scale = 10_f64.powi(-shift);
        (value / scale).round() * scale
    }
}

/// Render one cell. Time values are shown as local bucket labels for `unit`.
pub fn format_value(value: &Value, unit: TimeUnit, tz: &Tz) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) if n.fract() == 0.0 => format_number(*n, 0),
        Value::Number(n) => format_number(*n, 2),
        Value::Time(t) => format_bucket(*t, unit, tz),
    }
}

/// Render a table as left-aligned text columns with a header rule.
///
/// A table without columns renders as an empty string.
pub fn render_table(table: &Table, unit: TimeUnit, tz: &Tz) -> String {
    let fields = table.fields();
    if fields.is_empty() {
        return String::new();
    }

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.len() + 1);
    grid.push(fields.iter().map(|c| c.name.clone()).collect());
    for row in 0..table.len() {
        grid.push(
            fields
                .iter()
                .map(|c| format_value(&c.values[row], unit, tz))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..fields.len())
        .map(|col| {
            grid.iter()
                .map(|r| r[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
        if i == 0 {
            let rule = widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  ");
            out.push_str(&rule);
            out.push('\n');
        }
    }
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_000.0, 0), "1,000");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    // ── round_significant ────────────────────────────────────────────────────

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(0.5, 2), 0.5);
        assert_eq!(round_significant(1.0 / 3.0, 2), 0.33);
        assert_eq!(round_significant(1.456, 2), 1.5);
        assert_eq!(round_significant(12_345.0, 2), 12_000.0);
    }

    #[test]
    fn test_round_significant_passes_through_non_finite() {
        assert!(round_significant(f64::NAN, 2).is_nan());
        assert_eq!(round_significant(f64::INFINITY, 2), f64::INFINITY);
    }

    // ── format_value ─────────────────────────────────────────────────────────

    #[test]
    fn test_format_value_variants() {
        let tz = Tz::UTC;
        assert_eq!(format_value(&Value::Null, TimeUnit::Month, &tz), "-");
        assert_eq!(
            format_value(&Value::String("wcag-a".into()), TimeUnit::Month, &tz),
            "wcag-a"
        );
        assert_eq!(format_value(&Value::Number(1200.0), TimeUnit::Month, &tz), "1,200");
        assert_eq!(format_value(&Value::Number(0.25), TimeUnit::Month, &tz), "0.25");
        // 2024-02-01T00:00:00Z
        assert_eq!(
            format_value(&Value::Time(1_706_745_600_000), TimeUnit::Month, &tz),
            "2024-02"
        );
    }

    // ── render_table ─────────────────────────────────────────────────────────

    #[test]
    fn test_render_table_aligns_columns() {
        let table = Table::new(
            "LABEL_EXTRACTION_wcag",
            vec![
                Column::strings("wcag labels", vec!["wcag-a", "no-wcag label"]),
                Column::counts("Issues Created", vec![3, 12]),
            ],
        )
        .unwrap();

        let text = render_table(&table, TimeUnit::Month, &Tz::UTC);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "wcag labels    Issues Created");
        assert_eq!(lines[1], "-------------  --------------");
        assert_eq!(lines[2], "wcag-a         3");
        assert_eq!(lines[3], "no-wcag label  12");
    }

    #[test]
    fn test_render_table_without_columns_is_empty() {
        let table = Table::new("empty", vec![]).unwrap();
        assert!(render_table(&table, TimeUnit::Month, &Tz::UTC).is_empty());
    }

    #[test]
    fn test_render_table_header_only_for_zero_rows() {
        let table = Table::new("A", vec![Column::strings("wcag labels", Vec::<String>::new())]).unwrap();
        let text = render_table(&table, TimeUnit::Month, &Tz::UTC);
        assert_eq!(text, "wcag labels\n-----------\n");
    }
}
