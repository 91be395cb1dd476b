//! Field adjustments: mapping a logical request field onto the underlying
//! stored field, optionally with a value adjuster.
//!
//! Some vendors store a logical field under a different name, a specific
//! provider, or a different quoting convention. An adjustment entry, keyed
//! by `(data_source, requested_field)`, redirects the search and attaches
//! the adjuster that converts stored values back to the requested
//! convention.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use archivio_core::SeriesAdjuster;

/// One adjustment entry.
#[derive(Clone)]
pub struct FieldAdjustment {
    /// Provider the underlying data lives under, when constrained.
    pub underlying_provider: Option<String>,
    /// Stored field that backs the requested field.
    pub underlying_field: String,
    /// Value adjuster applied to fetched series, if any.
    pub adjuster: Option<Arc<dyn SeriesAdjuster>>,
}

impl FieldAdjustment {
    /// A plain field rename with no provider constraint or adjuster.
    #[must_use]
    pub fn rename(underlying_field: impl Into<String>) -> Self {
        Self {
            underlying_provider: None,
            underlying_field: underlying_field.into(),
            adjuster: None,
        }
    }
}

impl fmt::Debug for FieldAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAdjustment")
            .field("underlying_provider", &self.underlying_provider)
            .field("underlying_field", &self.underlying_field)
            .field("has_adjuster", &self.adjuster.is_some())
            .finish()
    }
}

/// Adjustment entries keyed by `(data_source, requested_field)`.
#[derive(Debug, Clone, Default)]
pub struct FieldAdjustmentMap {
    entries: HashMap<(String, String), FieldAdjustment>,
}

impl FieldAdjustmentMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adjustment` for requests of `requested_field` against
    /// `data_source`.
    pub fn insert(
        &mut self,
        data_source: impl Into<String>,
        requested_field: impl Into<String>,
        adjustment: FieldAdjustment,
    ) {
        self.entries
            .insert((data_source.into(), requested_field.into()), adjustment);
    }

    /// The adjustments applying to a request.
    ///
    /// With a source given, at most one entry comes back. Without one the
    /// union across all configured sources is returned, sorted by source for
    /// deterministic iteration.
    #[must_use]
    pub fn adjustments_for(
        &self,
        data_source: Option<&str>,
        requested_field: &str,
    ) -> Vec<(String, FieldAdjustment)> {
        match data_source {
            Some(source) => self
                .entries
                .get(&(source.to_owned(), requested_field.to_owned()))
                .map(|adj| vec![(source.to_owned(), adj.clone())])
                .unwrap_or_default(),
            None => {
                let mut all: Vec<(String, FieldAdjustment)> = self
                    .entries
                    .iter()
                    .filter(|((_, field), _)| field == requested_field)
                    .map(|((source, _), adj)| (source.clone(), adj.clone()))
                    .collect();
                all.sort_by(|a, b| a.0.cmp(&b.0));
                all
            }
        }
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
