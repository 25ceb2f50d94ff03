use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Format a date as its `MMDD` trading-day marker.
pub fn day_marker(date: NaiveDate) -> String {
    date.format("%m%d").to_string()
}

/// `true` for four ASCII digits forming a plausible month/day (`0101..=1231`).
pub fn is_valid_marker(marker: &str) -> bool {
    let b = marker.as_bytes();
    if b.len() != 4 || !b.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let month = (b[0] - b'0') * 10 + (b[1] - b'0');
    let day = (b[2] - b'0') * 10 + (b[3] - b'0');
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Year -> set of `MMDD` markers for every trading day of that year.
///
/// Serializes as a JSON object keyed by year string (`{"2024": ["0102", ...]}`),
/// years ascending and markers sorted, so the file diff is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradingDayIndex {
    years: BTreeMap<i32, BTreeSet<String>>,
}

impl TradingDayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the complete marker set for `year`.
    pub fn insert_year<I, S>(&mut self, year: i32, markers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.years
            .insert(year, markers.into_iter().map(Into::into).collect());
    }

    pub fn year(&self, year: i32) -> Option<&BTreeSet<String>> {
        self.years.get(&year)
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    /// `Some(is_trading)` when the date's year is present, `None` when absent.
    pub fn lookup(&self, date: NaiveDate) -> Option<bool> {
        self.years
            .get(&date.year())
            .map(|markers| markers.contains(&day_marker(date)))
    }

    /// Years present, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Union by year. Years present in `other` replace the same year here.
    pub fn merge(&mut self, other: TradingDayIndex) {
        self.years.extend(other.years);
    }

    /// First marker that is not a valid `MMDD`, as `(year, marker)`.
    pub fn first_invalid_marker(&self) -> Option<(i32, &str)> {
        self.years.iter().find_map(|(year, markers)| {
            markers
                .iter()
                .find(|m| !is_valid_marker(m))
                .map(|m| (*year, m.as_str()))
        })
    }
}

impl FromIterator<(i32, BTreeSet<String>)> for TradingDayIndex {
    fn from_iter<T: IntoIterator<Item = (i32, BTreeSet<String>)>>(iter: T) -> Self {
        Self {
            years: iter.into_iter().collect(),
        }
    }
}
