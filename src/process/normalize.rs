use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::policy::{Adjustment, Policy};
use crate::process::{date_parser, raw_table::RawTable};
use crate::table::{CleanTable, Counts, Cumulative, CumulativeTable, SeriesKey};

/// Source column names.
pub const STATE_COLUMN: &str = "state";
pub const DATE_COLUMN: &str = "date";
pub const POSITIVE_COLUMN: &str = "positive";
pub const TOTAL_COLUMN: &str = "total";

/// Key raw rows by (region, date), keeping only cumulative `positive` and `total`.
pub fn key_by_region_date(raw: &RawTable) -> Result<CumulativeTable, ParseError> {
    let region_col = raw.column(STATE_COLUMN)?;
    let date_col = raw.column(DATE_COLUMN)?;
    let positive_col = raw.column(POSITIVE_COLUMN)?;
    let total_col = raw.column(TOTAL_COLUMN)?;

    let mut table = CumulativeTable::new();
    for row in 0..raw.rows.len() {
        let region = raw.cell(row, region_col).trim();
        let date_str = raw.cell(row, date_col);
        let date =
            date_parser::parse_yyyymmdd(date_str).ok_or_else(|| ParseError::InvalidDate {
                row,
                value: date_str.to_string(),
            })?;
        let value = Cumulative {
            positive: parse_count(raw.cell(row, positive_col), row, POSITIVE_COLUMN)?,
            total: parse_count(raw.cell(row, total_col), row, TOTAL_COLUMN)?,
        };

        if table.insert(SeriesKey::new(region, date), value).is_some() {
            return Err(ParseError::DuplicateRow {
                row,
                region: region.to_string(),
                date,
            });
        }
    }
    Ok(table)
}

/// Empty cells are missing values. Integral floats (`"12.0"`) are accepted.
fn parse_count(cell: &str, row: usize, column: &'static str) -> Result<Option<i64>, ParseError> {
    let s = cell.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Ok(Some(n));
    }
    match s.parse::<f64>() {
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        Ok(f) if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&f) => {
            Ok(Some(f as i64))
        }
        _ => Err(ParseError::InvalidNumber {
            row,
            column,
            value: cell.to_string(),
        }),
    }
}

/// Remove every row of the regions the policy excludes.
pub fn drop_regions(table: &mut CumulativeTable, policy: &Policy) {
    let before = table.len();
    table.retain(|k, _| !policy.is_excluded(&k.region));
    debug!(dropped = before - table.len(), "dropped excluded regions");
}

/// Shift cumulative values by each adjustment from its start date onward.
/// Missing values stay missing.
pub fn apply_adjustments(
    table: &mut CumulativeTable,
    adjustments: &[Adjustment],
) -> Result<(), ParseError> {
    for adj in adjustments {
        let mut touched = 0usize;
        for (key, value) in table.range_mut(&adj.region, adj.from, NaiveDate::MAX) {
            value.positive = shift(value.positive, adj.positive, key, POSITIVE_COLUMN)?;
            value.total = shift(value.total, adj.total, key, TOTAL_COLUMN)?;
            touched += 1;
        }
        if touched == 0 {
            warn!(region = %adj.region, from = %adj.from, "adjustment matched no rows");
        } else {
            debug!(region = %adj.region, from = %adj.from, touched, "applied adjustment");
        }
    }
    Ok(())
}

fn shift(
    value: Option<i64>,
    by: i64,
    key: &SeriesKey,
    column: &'static str,
) -> Result<Option<i64>, ParseError> {
    match value {
        Some(v) => v.checked_add(by).map(Some).ok_or_else(|| overflow(key, column)),
        None => Ok(None),
    }
}

fn overflow(key: &SeriesKey, column: &'static str) -> ParseError {
    ParseError::Overflow {
        region: key.region.clone(),
        date: key.date,
        column,
    }
}

/// First difference of each region's cumulative series, row to row in date
/// order. A region's first row has no reference and is dropped, as is any row
/// where either delta is undefined. Negative deltas are revisions and clip to 0.
pub fn daily_deltas(table: &CumulativeTable) -> Result<CleanTable, ParseError> {
    let mut out = CleanTable::new();
    let mut prev: Option<(&SeriesKey, &Cumulative)> = None;

    for (key, cur) in table {
        if let Some((prev_key, prev_val)) = prev {
            if prev_key.region == key.region {
                let positive = delta(prev_val.positive, cur.positive, key, POSITIVE_COLUMN)?;
                let total = delta(prev_val.total, cur.total, key, TOTAL_COLUMN)?;
                if let (Some(positive), Some(total)) = (positive, total) {
                    out.insert(
                        key.clone(),
                        Counts {
                            positive: positive.max(0),
                            total: total.max(0),
                        },
                    );
                }
            }
        }
        prev = Some((key, cur));
    }
    Ok(out)
}

fn delta(
    prev: Option<i64>,
    cur: Option<i64>,
    key: &SeriesKey,
    column: &'static str,
) -> Result<Option<i64>, ParseError> {
    match (prev, cur) {
        (Some(p), Some(c)) => c.checked_sub(p).map(Some).ok_or_else(|| overflow(key, column)),
        _ => Ok(None),
    }
}
