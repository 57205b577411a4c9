// src/correction/mod.rs
use tracing::debug;

use crate::policy::{Action, Correction};
use crate::table::{CleanTable, Counts, SeriesKey};

/// What a pass over the correction list touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Rows patched (a row hit by two rules counts twice).
    pub applied: usize,
    /// Targeted cells with no row in the table. Left absent, never created.
    pub skipped: Vec<SeriesKey>,
}

/// Apply `rules` to `table` in order. Rows that a rule targets but the table
/// does not hold are reported and otherwise ignored.
#[tracing::instrument(level = "debug", skip_all, fields(rules = rules.len()))]
pub fn apply(table: &mut CleanTable, rules: &[Correction]) -> CorrectionReport {
    let mut report = CorrectionReport::default();

    for rule in rules {
        for span in &rule.dates {
            let (from, to) = span.bounds();
            let mut hit = Vec::new();
            for (key, counts) in table.range_mut(&rule.region, from, to) {
                patch(counts, rule.action);
                hit.push(key.date);
            }
            report.applied += hit.len();

            // Both spans and `hit` are date-ordered, so a merge finds the gaps.
            let mut hit = hit.into_iter().peekable();
            for day in span.days() {
                if hit.peek() == Some(&day) {
                    hit.next();
                    continue;
                }
                debug!(region = %rule.region, date = %day, "correction target missing; skipped");
                report.skipped.push(SeriesKey::new(rule.region.clone(), day));
            }
        }
    }

    report
}

fn patch(counts: &mut Counts, action: Action) {
    match action {
        Action::Zero => *counts = Counts::default(),
        Action::Overwrite { positive, total } => {
            if let Some(p) = positive {
                counts.positive = p;
            }
            if let Some(t) = total {
                counts.total = t;
            }
        }
    }
}
