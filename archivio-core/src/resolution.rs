//! Resolution outputs: the chosen metadata plus an optional value adjuster.

use std::fmt;
use std::sync::Arc;

use crate::document::TimeSeriesInfo;
use crate::ident::ExternalIdBundle;
use crate::series::PointSeries;

/// Adjusts raw series values after resolution, e.g. to normalize a vendor's
/// quoting convention. Implementations must be pure.
pub trait SeriesAdjuster: Send + Sync {
    /// Adjust `series` as resolved for `bundle`.
    fn adjust(&self, bundle: &ExternalIdBundle, series: PointSeries) -> PointSeries;
}

impl<F> SeriesAdjuster for F
where
    F: Fn(&ExternalIdBundle, PointSeries) -> PointSeries + Send + Sync,
{
    fn adjust(&self, bundle: &ExternalIdBundle, series: PointSeries) -> PointSeries {
        self(bundle, series)
    }
}

/// The outcome of a successful resolution: the selected metadata record and
/// an optional adjuster. Immutable and cheap to clone, so it is safe to
/// cache and share across callers.
///
/// A result with no metadata is the "exists" sentinel produced by an
/// existence-only query (no identifier bundle supplied).
#[derive(Clone)]
pub struct ResolutionResult {
    info: Option<TimeSeriesInfo>,
    adjuster: Option<Arc<dyn SeriesAdjuster>>,
}

impl ResolutionResult {
    /// A resolution that selected `info`, optionally with an adjuster.
    #[must_use]
    pub fn of(info: TimeSeriesInfo, adjuster: Option<Arc<dyn SeriesAdjuster>>) -> Self {
        Self {
            info: Some(info),
            adjuster,
        }
    }

    /// The "exists" sentinel: something matched an existence-only query,
    /// but no record was materialized.
    #[must_use]
    pub fn exists() -> Self {
        Self {
            info: None,
            adjuster: None,
        }
    }

    /// The selected metadata, absent for the exists sentinel.
    #[must_use]
    pub fn info(&self) -> Option<&TimeSeriesInfo> {
        self.info.as_ref()
    }

    /// The adjuster to apply to fetched series values, if any.
    #[must_use]
    pub fn adjuster(&self) -> Option<&Arc<dyn SeriesAdjuster>> {
        self.adjuster.as_ref()
    }

    /// Apply the adjuster to `series`, passing it through untouched when
    /// there is none.
    #[must_use]
    pub fn adjust(&self, bundle: &ExternalIdBundle, series: PointSeries) -> PointSeries {
        match &self.adjuster {
            Some(adj) => adj.adjust(bundle, series),
            None => series,
        }
    }
}

impl fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionResult")
            .field("info", &self.info)
            .field("has_adjuster", &self.adjuster.is_some())
            .finish()
    }
}
