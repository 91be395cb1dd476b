//! The point-series merge algebra backing the master's mutation operations.
//!
//! `update` is append-only and merges via [`union_no_intersect`]; `correct`
//! merges via [`union_second_wins`]; `remove` deletes an inclusive date
//! range via [`remove_range`].

use chrono::NaiveDate;

use super::PointSeries;
use crate::ArchivioError;

/// Union two series whose date sets must not intersect.
///
/// Backs the append-only `update` operation: callers are expected to have
/// checked that `b` starts after `a` ends, so an actual key collision is a
/// violated precondition, not a data condition.
///
/// # Errors
/// Returns `InvalidArg` naming the first colliding date.
pub fn union_no_intersect(a: PointSeries, b: PointSeries) -> Result<PointSeries, ArchivioError> {
    let mut out = a.into_map();
    for (date, value) in b.into_map() {
        if out.insert(date, value).is_some() {
            return Err(ArchivioError::invalid_arg(format!(
                "series intersect at {date}"
            )));
        }
    }
    Ok(PointSeries::from_map(out))
}

/// Union two series; any date present in both keeps `b`'s value.
///
/// Backs the `correct` operation, which is always legal and idempotent.
#[must_use]
pub fn union_second_wins(a: PointSeries, b: PointSeries) -> PointSeries {
    let mut out = a.into_map();
    out.extend(b.into_map());
    PointSeries::from_map(out)
}

/// Delete every point whose date falls in `[from, to]`. Open-ended bounds
/// default to the full range.
#[must_use]
pub fn remove_range(
    series: PointSeries,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> PointSeries {
    let mut map = series.into_map();
    map.retain(|date, _| {
        !(from.is_none_or(|f| f <= *date) && to.is_none_or(|t| *date <= t))
    });
    PointSeries::from_map(map)
}
