// src/policy/mod.rs
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// The versioned policy compiled into the crate.
static BUILTIN_YAML: &str = include_str!("../../assets/corrections.yaml");

static BUILTIN: Lazy<Policy> = Lazy::new(|| {
    Policy::from_yaml(BUILTIN_YAML).expect("embedded correction policy should be valid")
});

/// Fixed cleaning policy: which regions to drop, which cumulative offsets to
/// apply before differencing, and which daily cells to patch afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    pub version: u32,
    pub excluded_regions: BTreeSet<String>,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(default)]
    pub corrections: Vec<Correction>,
}

/// Additive offset on cumulative counts for `region`, for every date >= `from`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Adjustment {
    pub region: String,
    pub from: NaiveDate,
    #[serde(default)]
    pub positive: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// One patch on the daily table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Correction {
    pub region: String,
    pub dates: Vec<DateSpan>,
    pub action: Action,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DateSpan {
    Day(NaiveDate),
    /// Inclusive on both ends.
    Range { from: NaiveDate, to: NaiveDate },
}

impl DateSpan {
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            DateSpan::Day(d) => (d, d),
            DateSpan::Range { from, to } => (from, to),
        }
    }

    /// Calendar days covered.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let (from, to) = self.bounds();
        from.iter_days().take_while(move |d| *d <= to)
    }
}

/// Absolute overwrite; applying it twice is the same as once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    /// Both fields set to 0; downstream drops the date from the likelihood.
    Zero,
    Overwrite {
        #[serde(default)]
        positive: Option<i64>,
        #[serde(default)]
        total: Option<i64>,
    },
}

impl Policy {
    /// The policy embedded at build time, parsed on first use.
    pub fn builtin() -> &'static Policy {
        &BUILTIN
    }

    pub fn from_yaml(doc: &str) -> Result<Self> {
        let policy: Policy =
            serde_yaml::from_str(doc).map_err(|e| Error::Policy(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn is_excluded(&self, region: &str) -> bool {
        self.excluded_regions.contains(region)
    }

    fn validate(&self) -> Result<()> {
        for region in &self.excluded_regions {
            check_region(region)?;
        }
        for adj in &self.adjustments {
            check_region(&adj.region)?;
        }
        for (i, rule) in self.corrections.iter().enumerate() {
            check_region(&rule.region)?;
            if rule.dates.is_empty() {
                return Err(Error::Policy(format!(
                    "correction #{} for {} targets no dates",
                    i, rule.region
                )));
            }
            for span in &rule.dates {
                let (from, to) = span.bounds();
                if from > to {
                    return Err(Error::Policy(format!(
                        "correction #{} for {}: range {}..{} is reversed",
                        i, rule.region, from, to
                    )));
                }
            }
            if let Action::Overwrite { positive, total } = rule.action {
                if positive.is_none() && total.is_none() {
                    return Err(Error::Policy(format!(
                        "correction #{} for {} overwrites nothing",
                        i, rule.region
                    )));
                }
                if positive.unwrap_or(0) < 0 || total.unwrap_or(0) < 0 {
                    return Err(Error::Policy(format!(
                        "correction #{} for {} writes a negative count",
                        i, rule.region
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_region(region: &str) -> Result<()> {
    if region.trim().is_empty() {
        return Err(Error::Policy("empty region code".into()));
    }
    Ok(())
}
