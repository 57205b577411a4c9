// src/table/mod.rs
use chrono::NaiveDate;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Composite key of every table: region code, then calendar day.
/// Field order matters: the derived `Ord` sorts by region first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    pub region: String,
    pub date: NaiveDate,
}

impl SeriesKey {
    pub fn new(region: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            region: region.into(),
            date,
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.region, self.date)
    }
}

/// Running totals as published. `None` where the source cell was empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cumulative {
    pub positive: Option<i64>,
    pub total: Option<i64>,
}

/// New positive tests and new tests administered on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub positive: i64,
    pub total: i64,
}

/// An ordered (region, date) → value table.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<V> {
    rows: BTreeMap<SeriesKey, V>,
}

pub type CumulativeTable = TimeSeries<Cumulative>;

/// Daily deltas, the shape handed to the model.
pub type CleanTable = TimeSeries<Counts>;

impl<V> Default for TimeSeries<V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<V> TimeSeries<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, returning the previous value for that key if any.
    pub fn insert(&mut self, key: SeriesKey, value: V) -> Option<V> {
        self.rows.insert(key, value)
    }

    pub fn get(&self, region: &str, date: NaiveDate) -> Option<&V> {
        self.rows.get(&SeriesKey::new(region, date))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SeriesKey, V> {
        self.rows.iter()
    }

    /// Distinct region codes, sorted.
    pub fn regions(&self) -> BTreeSet<&str> {
        self.rows.keys().map(|k| k.region.as_str()).collect()
    }

    /// Existing rows of `region` with `from <= date <= to`.
    pub fn range_mut(
        &mut self,
        region: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> btree_map::RangeMut<'_, SeriesKey, V> {
        self.rows
            .range_mut(SeriesKey::new(region, from)..=SeriesKey::new(region, to))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&SeriesKey, &mut V) -> bool) {
        self.rows.retain(|k, v| keep(k, v));
    }

    /// Drop `cutoff` and every later date, in every region.
    pub fn truncate_before(&mut self, cutoff: NaiveDate) {
        self.rows.retain(|k, _| k.date < cutoff);
    }
}

impl<'a, V> IntoIterator for &'a TimeSeries<V> {
    type Item = (&'a SeriesKey, &'a V);
    type IntoIter = btree_map::Iter<'a, SeriesKey, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl<V> FromIterator<(SeriesKey, V)> for TimeSeries<V> {
    fn from_iter<I: IntoIterator<Item = (SeriesKey, V)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
