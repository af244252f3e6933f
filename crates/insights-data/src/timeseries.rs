//! Created-versus-closed issue counts bucketed by calendar period.
//!
//! Both outputs share one ascending bucket axis built from the union of
//! truncated timestamps, so the two tables line up row for row. Truncation
//! happens in the supplied time zone's local calendar.

use std::collections::{BTreeMap, BTreeSet};

use chrono_tz::Tz;
use insights_core::lookup::{find_table_by_ref, time_values};
use insights_core::models::{
    columns, DATES_SUFFIX, ISSUES_CLOSED_NAME, ISSUES_CLOSED_REF, ISSUES_CREATED_NAME,
    ISSUES_CREATED_REF,
};
use insights_core::table::{Column, Table};
use insights_core::time_utils::{truncate_millis, TimeUnit};
use tracing::debug;

/// Bucket the created and closed issue tables by `unit`.
///
/// Returns `None` unless both tables are present; a one-sided comparison is
/// not produced. The first output holds created counts, the second closed
/// counts, each with a `reset date` time column on the shared axis.
pub fn aggregate_by_time(
    created: Option<&Table>,
    closed: Option<&Table>,
    unit: TimeUnit,
    tz: &Tz,
) -> Option<[Table; 2]> {
    let (created, closed) = match (created, closed) {
        (Some(created), Some(closed)) => (created, closed),
        _ => {
            debug!("created or closed table missing, skipping time aggregation");
            return None;
        }
    };

    let created_buckets = truncate_all(&time_values(Some(created), columns::CREATED_AT), unit, tz);
    let closed_buckets = truncate_all(&time_values(Some(closed), columns::CLOSED_AT), unit, tz);

    let axis: Vec<i64> = created_buckets
        .iter()
        .chain(&closed_buckets)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    debug!(
        unit = %unit,
        buckets = axis.len(),
        created = created_buckets.len(),
        closed = closed_buckets.len(),
        "time buckets built"
    );

    Some([
        bucket_table(created, ISSUES_CREATED_NAME, &axis, &created_buckets),
        bucket_table(closed, ISSUES_CLOSED_NAME, &axis, &closed_buckets),
    ])
}

/// Look up the created and closed tables in `tables` and bucket them.
pub fn issues_by_date(tables: &[Table], unit: TimeUnit, tz: &Tz) -> Option<[Table; 2]> {
    aggregate_by_time(
        find_table_by_ref(tables, ISSUES_CREATED_REF),
        find_table_by_ref(tables, ISSUES_CLOSED_REF),
        unit,
        tz,
    )
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn truncate_all(millis: &[i64], unit: TimeUnit, tz: &Tz) -> Vec<i64> {
    millis.iter().map(|&m| truncate_millis(m, unit, tz)).collect()
}

fn bucket_table(source: &Table, count_name: &str, axis: &[i64], buckets: &[i64]) -> Table {
    let mut counts: BTreeMap<i64, u64> = axis.iter().map(|&b| (b, 0)).collect();
    for bucket in buckets {
        if let Some(count) = counts.get_mut(bucket) {
            *count += 1;
        }
    }

    Table::from_aligned(
        format!("{}{}", source.ref_id(), DATES_SUFFIX),
        vec![
            Column::times(columns::RESET_DATE, axis.to_vec()),
            Column::counts(count_name, counts.into_values().collect()),
        ],
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
