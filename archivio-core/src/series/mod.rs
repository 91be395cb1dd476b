//! Date-keyed numeric series and the merge algebra over them.

pub mod merge;

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ArchivioError;

pub use merge::{remove_range, union_no_intersect, union_second_wins};

/// An ordered mapping from calendar date to a floating-point value.
///
/// Dates are strictly increasing and unique by construction; all merge
/// operations are total-order merges over the date key space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl PointSeries {
    /// The empty series.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from `(date, value)` pairs.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the same date appears twice.
    pub fn from_points<I>(points: I) -> Result<Self, ArchivioError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut map = BTreeMap::new();
        for (date, value) in points {
            if map.insert(date, value).is_some() {
                return Err(ArchivioError::invalid_arg(format!(
                    "duplicate date {date} in point series"
                )));
            }
        }
        Ok(Self { points: map })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The value stored for `date`, if any.
    #[must_use]
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    /// The earliest `(date, value)` point, if any.
    #[must_use]
    pub fn earliest(&self) -> Option<(NaiveDate, f64)> {
        self.points.first_key_value().map(|(d, v)| (*d, *v))
    }

    /// The latest `(date, value)` point, if any.
    #[must_use]
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points.last_key_value().map(|(d, v)| (*d, *v))
    }

    /// Iterate points in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, v)| (*d, *v))
    }

    /// Select the sub-series over `[start, end)`. Open bounds default to the
    /// full range.
    #[must_use]
    pub fn sub_series(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let lower = start.map_or(Bound::Unbounded, Bound::Included);
        let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
        Self {
            points: self
                .points
                .range((lower, upper))
                .map(|(d, v)| (*d, *v))
                .collect(),
        }
    }

    /// The earliest `n` points.
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        Self {
            points: self.points.iter().take(n).map(|(d, v)| (*d, *v)).collect(),
        }
    }

    /// The latest `n` points.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.points.len().saturating_sub(n);
        Self {
            points: self.points.iter().skip(skip).map(|(d, v)| (*d, *v)).collect(),
        }
    }

    /// Apply a signed max-points bound: positive keeps the earliest `n`
    /// points, negative keeps the latest `|n|`, zero keeps everything.
    #[must_use]
    pub fn limit(&self, max_points: i64) -> Self {
        match max_points {
            0 => self.clone(),
            n if n > 0 => self.head(usize::try_from(n).unwrap_or(usize::MAX)),
            n => self.tail(usize::try_from(-n).unwrap_or(usize::MAX)),
        }
    }

    pub(crate) fn into_map(self) -> BTreeMap<NaiveDate, f64> {
        self.points
    }

    pub(crate) fn from_map(points: BTreeMap<NaiveDate, f64>) -> Self {
        Self { points }
    }
}

impl FromIterator<(NaiveDate, f64)> for PointSeries {
    /// Collect points, keeping the last value on duplicate dates.
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
