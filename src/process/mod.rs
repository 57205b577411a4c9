// src/process/mod.rs
pub mod date_parser;
pub mod normalize;
pub mod raw_table;

use chrono::NaiveDate;
use tracing::info;

use crate::correction;
use crate::error::Result;
use crate::policy::Policy;
use crate::table::CleanTable;

pub use raw_table::RawTable;

/// Turn the raw state feed into corrected daily deltas, keeping only dates
/// strictly before `run_date`.
///
/// The data for `run_date` itself is not yet complete at run time, so it is
/// cut away along with anything later; backtests rely on this.
#[tracing::instrument(level = "info", skip(raw), fields(rows = raw.rows.len()))]
pub fn process(raw: &RawTable, run_date: NaiveDate) -> Result<CleanTable> {
    let policy = Policy::builtin();

    let mut cumulative = normalize::key_by_region_date(raw)?;
    normalize::drop_regions(&mut cumulative, policy);
    normalize::apply_adjustments(&mut cumulative, &policy.adjustments)?;

    let mut daily = normalize::daily_deltas(&cumulative)?;

    let report = correction::apply(&mut daily, &policy.corrections);
    info!(
        policy_version = policy.version,
        applied = report.applied,
        skipped = report.skipped.len(),
        "applied corrections"
    );

    daily.truncate_before(run_date);
    info!(
        rows = daily.len(),
        regions = daily.regions().len(),
        "processed state data"
    );
    Ok(daily)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ParseError};
    use crate::table::Counts;
    use anyhow::Result;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,covidclean=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Rows of (state, YYYYMMDD, positive, total) with the feed's column layout.
    fn raw(rows: &[(&str, &str, &str, &str)]) -> RawTable {
        RawTable {
            headers: ["date", "state", "positive", "negative", "pending", "total"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: rows
                .iter()
                .map(|(state, date, positive, total)| {
                    vec![
                        date.to_string(),
                        state.to_string(),
                        positive.to_string(),
                        String::new(),
                        String::new(),
                        total.to_string(),
                    ]
                })
                .collect(),
        }
    }

    /// Daily cumulative rows for `state`, `days` long, starting at `start`,
    /// growing by `step` per day.
    fn ramp(state: &'static str, start: NaiveDate, days: u64, step: i64) -> Vec<(String, String, String, String)> {
        start
            .iter_days()
            .take(days as usize)
            .enumerate()
            .map(|(i, day)| {
                let n = step * (i as i64 + 1);
                (
                    state.to_string(),
                    day.format("%Y%m%d").to_string(),
                    n.to_string(),
                    (n * 10).to_string(),
                )
            })
            .collect()
    }

    fn raw_owned(rows: &[(String, String, String, String)]) -> RawTable {
        let borrowed: Vec<(&str, &str, &str, &str)> = rows
            .iter()
            .map(|(a, b, c, e)| (a.as_str(), b.as_str(), c.as_str(), e.as_str()))
            .collect();
        raw(&borrowed)
    }

    #[test]
    fn test_unlisted_region_diff_and_clip() -> Result<()> {
        init_test_logging();
        let table = process(
            &raw(&[
                ("ZZ", "20200601", "100", "100"),
                ("ZZ", "20200602", "150", "150"),
                ("ZZ", "20200603", "140", "140"),
            ]),
            d("2020-07-01"),
        )?;

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("ZZ", d("2020-06-02")),
            Some(&Counts {
                positive: 50,
                total: 50
            })
        );
        assert_eq!(
            table.get("ZZ", d("2020-06-03")),
            Some(&Counts {
                positive: 0,
                total: 0
            })
        );
        Ok(())
    }

    #[test]
    fn test_excluded_regions_never_appear() -> Result<()> {
        init_test_logging();
        let mut rows = Vec::new();
        for state in ["MP", "GU", "AS", "PR", "VI", "NY"] {
            rows.extend(ramp(state, d("2020-05-01"), 5, 3));
        }
        let table = process(&raw_owned(&rows), d("2020-06-01"))?;

        assert_eq!(table.regions().into_iter().collect::<Vec<_>>(), vec!["NY"]);
        assert_eq!(table.len(), 4);
        Ok(())
    }

    #[test]
    fn test_run_date_and_later_are_cut() -> Result<()> {
        init_test_logging();
        let rows = ramp("NY", d("2020-06-01"), 10, 5);
        let run_date = d("2020-06-06");
        let table = process(&raw_owned(&rows), run_date)?;

        assert!(table.iter().all(|(k, _)| k.date < run_date));
        let last = table.iter().map(|(k, _)| k.date).last();
        assert_eq!(last, Some(d("2020-06-05")));
        Ok(())
    }

    #[test]
    fn test_all_counts_non_negative() -> Result<()> {
        init_test_logging();
        let table = process(
            &raw(&[
                ("TX", "20200601", "500", "9000"),
                ("TX", "20200602", "400", "8000"),
                ("TX", "20200603", "450", "7000"),
                ("TX", "20200604", "10", "10"),
            ]),
            d("2020-07-01"),
        )?;
        assert!(table
            .iter()
            .all(|(_, c)| c.positive >= 0 && c.total >= 0));
        Ok(())
    }

    #[test]
    fn test_mi_probable_cases_offset_and_lumped_totals() -> Result<()> {
        init_test_logging();
        let table = process(
            &raw(&[
                ("MI", "20200603", "50000", "600000"),
                ("MI", "20200604", "50100", "610000"),
                // +5014 probable cases folded in on Jun 5; the offset removes them.
                ("MI", "20200605", "55214", "620000"),
                ("MI", "20200617", "56000", "700000"),
                ("MI", "20200618", "56300", "700000"),
                ("MI", "20200619", "56600", "729742"),
            ]),
            d("2020-07-01"),
        )?;

        assert_eq!(table.get("MI", d("2020-06-05")).unwrap().positive, 100);
        assert_eq!(
            table.get("MI", d("2020-06-18")),
            Some(&Counts {
                positive: 300,
                total: 14871
            })
        );
        assert_eq!(
            table.get("MI", d("2020-06-19")),
            Some(&Counts {
                positive: 300,
                total: 14871
            })
        );
        Ok(())
    }

    #[test]
    fn test_la_dedup_re_added() -> Result<()> {
        init_test_logging();
        let table = process(
            &raw(&[
                ("LA", "20200618", "49000", "600000"),
                // 1666 duplicates removed from both counts on Jun 19.
                ("LA", "20200619", "47434", "598434"),
            ]),
            d("2020-07-01"),
        )?;
        assert_eq!(
            table.get("LA", d("2020-06-19")),
            Some(&Counts {
                positive: 100,
                total: 100
            })
        );
        Ok(())
    }

    #[test]
    fn test_outlier_day_zeroed() -> Result<()> {
        init_test_logging();
        let table = process(
            &raw(&[
                ("NJ", "20200510", "1000", "10000"),
                ("NJ", "20200511", "9000", "90000"),
                ("NJ", "20200512", "9100", "91000"),
            ]),
            d("2020-07-01"),
        )?;
        assert_eq!(table.get("NJ", d("2020-05-11")), Some(&Counts::default()));
        assert_eq!(
            table.get("NJ", d("2020-05-12")),
            Some(&Counts {
                positive: 100,
                total: 1000
            })
        );
        Ok(())
    }

    #[test]
    fn test_correction_outside_window_is_not_created() -> Result<()> {
        init_test_logging();
        let rows = ramp("WA", d("2020-06-01"), 5, 2);
        let table = process(&raw_owned(&rows), d("2020-06-05"))?;
        // 06-05 is targeted by a WA rule but cut by the run date.
        assert_eq!(table.get("WA", d("2020-06-05")), None);
        assert_eq!(table.len(), 3);
        Ok(())
    }

    #[test]
    fn test_invalid_date_is_fatal() {
        init_test_logging();
        let err = process(&raw(&[("NY", "2020-06-01", "1", "2")]), d("2020-07-01")).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::InvalidDate { .. })));
    }

    #[test]
    fn test_adjustment_past_i64_is_an_error() {
        init_test_logging();
        let max = i64::MAX.to_string();
        let err = process(
            &raw(&[
                ("LA", "20200618", "0", "0"),
                ("LA", "20200619", max.as_str(), "10"),
            ]),
            d("2020-07-01"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::Overflow {
                column: "positive",
                ..
            })
        ));
    }

    #[test]
    fn test_delta_past_i64_is_an_error() {
        init_test_logging();
        let low = (-i64::MAX).to_string();
        let high = i64::MAX.to_string();
        let err = process(
            &raw(&[
                ("NY", "20200601", low.as_str(), "0"),
                ("NY", "20200602", high.as_str(), "10"),
            ]),
            d("2020-07-01"),
        )
        .unwrap_err();
        match err {
            Error::Parse(ParseError::Overflow { region, date, .. }) => {
                assert_eq!(region, "NY");
                assert_eq!(date, d("2020-06-02"));
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_float_is_invalid_number() {
        init_test_logging();
        let err = process(&raw(&[("NY", "20200601", "1e300", "2")]), d("2020-07-01")).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::InvalidNumber {
                column: "positive",
                ..
            })
        ));
    }
}
