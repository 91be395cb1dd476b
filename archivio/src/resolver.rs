//! Candidate search, adjustment, and rating orchestration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use archivio_core::{
    ArchivioError, ExternalIdBundle, InfoSearchRequest, PagingRequest, ResolutionResult,
    TimeSeriesInfo, TimeSeriesMaster,
};

use crate::adjustment::{FieldAdjustment, FieldAdjustmentMap};
use crate::rating::RatingEngine;

/// The criteria of one resolution.
///
/// `bundle == None` turns the call into an existence-only query for the
/// `(source, provider, field)` triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResolutionRequest {
    /// Identifiers of the wanted entity; `None` for existence-only.
    pub bundle: Option<ExternalIdBundle>,
    /// Date the stored identifiers must be valid on.
    pub validity_date: Option<NaiveDate>,
    /// Requested data source; `None` leaves it unconstrained.
    pub data_source: Option<String>,
    /// Requested data provider; `None` leaves it unconstrained.
    pub data_provider: Option<String>,
    /// The logical field wanted, e.g. `"PX_LAST"`.
    pub data_field: String,
    /// Rating policy name breaking ambiguities; `None` uses the default.
    pub resolution_key: Option<String>,
}

impl ResolutionRequest {
    /// A request for `field` of the entity identified by `bundle`.
    #[must_use]
    pub fn of(bundle: ExternalIdBundle, field: impl Into<String>) -> Self {
        Self {
            bundle: Some(bundle),
            data_field: field.into(),
            ..Default::default()
        }
    }

    /// An existence-only request for the given triple.
    #[must_use]
    pub fn exists(
        source: Option<String>,
        provider: Option<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            bundle: None,
            data_source: source,
            data_provider: provider,
            data_field: field.into(),
            ..Default::default()
        }
    }
}

/// Turns loose criteria into at most one resolved record.
///
/// A resolution miss is a normal outcome, not an error: `Ok(None)`.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `req` against the backing store.
    async fn resolve(
        &self,
        req: &ResolutionRequest,
    ) -> Result<Option<ResolutionResult>, ArchivioError>;
}

/// The canonical resolver: searches the master for candidates, applies the
/// field adjustment map, and lets the rating engine pick one.
pub struct TimeSeriesResolver {
    master: Arc<dyn TimeSeriesMaster>,
    ratings: RatingEngine,
    adjustments: FieldAdjustmentMap,
}

impl TimeSeriesResolver {
    /// Build a resolver over `master`.
    #[must_use]
    pub fn new(master: Arc<dyn TimeSeriesMaster>, ratings: RatingEngine) -> Self {
        Self {
            master,
            ratings,
            adjustments: FieldAdjustmentMap::new(),
        }
    }

    /// Attach a field adjustment map.
    #[must_use]
    pub fn with_adjustments(mut self, adjustments: FieldAdjustmentMap) -> Self {
        self.adjustments = adjustments;
        self
    }

    /// The master this resolver queries.
    #[must_use]
    pub fn master(&self) -> &Arc<dyn TimeSeriesMaster> {
        &self.master
    }

    async fn check_exists(
        &self,
        req: &ResolutionRequest,
    ) -> Result<Option<ResolutionResult>, ArchivioError> {
        let search = InfoSearchRequest {
            data_source: req.data_source.clone(),
            data_provider: req.data_provider.clone(),
            data_field: Some(req.data_field.clone()),
            paging: PagingRequest::NONE,
            ..Default::default()
        };
        let result = self.master.search(search).await?;
        Ok((result.paging.total() > 0).then(ResolutionResult::exists))
    }

    fn compatible(candidate: &TimeSeriesInfo, adjustments: &[(String, FieldAdjustment)]) -> bool {
        adjustments.iter().any(|(source, adj)| {
            source == &candidate.data_source
                && adj.underlying_field == candidate.data_field
                && adj
                    .underlying_provider
                    .as_deref()
                    .is_none_or(|p| p == candidate.data_provider)
        })
    }
}

#[async_trait]
impl Resolver for TimeSeriesResolver {
    async fn resolve(
        &self,
        req: &ResolutionRequest,
    ) -> Result<Option<ResolutionResult>, ArchivioError> {
        let Some(bundle) = &req.bundle else {
            return self.check_exists(req).await;
        };

        let adjustments = self
            .adjustments
            .adjustments_for(req.data_source.as_deref(), &req.data_field);

        let mut search = InfoSearchRequest {
            external_ids: Some(bundle.clone()),
            validity_date: req.validity_date,
            data_source: req.data_source.clone(),
            data_provider: req.data_provider.clone(),
            data_field: Some(req.data_field.clone()),
            paging: PagingRequest::ALL,
            ..Default::default()
        };
        match adjustments.as_slice() {
            [] => {}
            [(source, adj)] => {
                // A single adjustment lets the search narrow to the
                // underlying triple directly.
                search.data_source = Some(source.clone());
                search.data_field = Some(adj.underlying_field.clone());
                if adj.underlying_provider.is_some() {
                    search.data_provider = adj.underlying_provider.clone();
                }
            }
            _ => {
                // Several sources map the field differently; the underlying
                // constraints diverge, so search wide and post-filter.
                search.data_provider = None;
                search.data_field = None;
            }
        }

        let result = self.master.search(search).await?;
        let mut candidates: Vec<TimeSeriesInfo> =
            result.documents.into_iter().map(|doc| doc.info).collect();
        if adjustments.len() > 1 {
            candidates.retain(|c| Self::compatible(c, &adjustments));
        }

        let Some(info) = self
            .ratings
            .select(candidates, req.resolution_key.as_deref())
        else {
            debug!(?req, "time-series resolution miss");
            return Ok(None);
        };

        let adjuster = adjustments
            .iter()
            .find(|(source, _)| source == &info.data_source)
            .and_then(|(_, adj)| adj.adjuster.clone());
        Ok(Some(ResolutionResult::of(info, adjuster)))
    }
}
