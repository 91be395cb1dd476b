//! The system-of-record contract for time-series metadata and data points.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::change::ChangeManager;
use crate::document::{
    InfoDocument, InfoHistoryRequest, InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest,
    InfoSearchResult,
};
use crate::error::ArchivioError;
use crate::ident::{ObjectId, UniqueId};
use crate::series::PointSeries;

/// Request for a slice of one stored point series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesGetRequest {
    /// The series' record identity.
    pub object_id: ObjectId,
    /// Inclusive start date; open when `None`.
    pub start: Option<NaiveDate>,
    /// Exclusive end date; open when `None`.
    pub end: Option<NaiveDate>,
    /// Signed point bound: positive keeps the earliest N points of the
    /// filtered range, negative the latest |N|, zero keeps everything.
    pub max_points: i64,
}

impl SeriesGetRequest {
    /// Request the full series for `object_id`.
    #[must_use]
    pub fn all(object_id: ObjectId) -> Self {
        Self {
            object_id,
            start: None,
            end: None,
            max_points: 0,
        }
    }

    /// Request only the latest point of the series.
    #[must_use]
    pub fn latest_point(object_id: ObjectId) -> Self {
        Self {
            object_id,
            start: None,
            end: None,
            max_points: -1,
        }
    }
}

/// Outcome of a bulk read: the documents found plus the number withheld by
/// a permission decorator on the way out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkGetResult {
    /// The found documents, keyed by the id they were requested under.
    pub documents: HashMap<UniqueId, InfoDocument>,
    /// Number of found documents withheld by a permission decorator.
    /// Zero unless the result passed through one.
    pub unauthorized_count: usize,
}

impl BulkGetResult {
    /// Wrap a document map with nothing withheld.
    #[must_use]
    pub fn of(documents: HashMap<UniqueId, InfoDocument>) -> Self {
        Self {
            documents,
            unauthorized_count: 0,
        }
    }
}

/// The system of record for time-series metadata and data points.
///
/// Storage adapters (in-memory, database, remote) implement this trait;
/// decorators wrap it to add routing, fan-out, caching, and authorization.
/// Storage-layer errors (`NotFound`, `ConcurrentModification`) propagate
/// unchanged through every decorator.
#[async_trait]
pub trait TimeSeriesMaster: Send + Sync {
    /// A stable name for diagnostics, e.g. `"archivio-mem"`.
    fn name(&self) -> &str;

    /// The object-id scheme this master issues. Used by fan-out composites
    /// to build their dispatch table.
    fn scheme(&self) -> &str;

    /// Fetch one document. Version 0 addresses the latest version.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError>;

    /// Fetch several documents at once. Unknown ids are silently omitted;
    /// bulk reads are lenient where single reads are strict. Documents a
    /// permission decorator withholds are counted, not returned.
    async fn get_bulk(&self, uids: &[UniqueId]) -> Result<BulkGetResult, ArchivioError>;

    /// Store a new document, assigning its unique id and version instant.
    async fn add(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError>;

    /// Replace the latest version of a document.
    ///
    /// # Errors
    /// `ConcurrentModification` if the stored version no longer matches the
    /// version the caller read; the caller must re-read and retry.
    async fn update(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError>;

    /// Correct the latest version in place (bumps the correction instant,
    /// not the version).
    async fn correct(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError>;

    /// Remove a document and its data points.
    async fn remove(&self, oid: &ObjectId) -> Result<(), ArchivioError>;

    /// Search metadata. Results are paged; order is stable iff the
    /// underlying storage provides a stable order (implementations must
    /// document which).
    async fn search(&self, req: InfoSearchRequest) -> Result<InfoSearchResult, ArchivioError>;

    /// List the version history of one record, paged like a search.
    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError>;

    /// Distinct metadata field values across the master's records.
    async fn meta_data(
        &self,
        req: InfoMetaDataRequest,
    ) -> Result<InfoMetaDataResult, ArchivioError>;

    /// Fetch a slice of a stored point series.
    async fn get_points(&self, req: SeriesGetRequest) -> Result<PointSeries, ArchivioError>;

    /// Append data points. The new series must start after the stored
    /// series ends; overlap is an `InvalidArg` error.
    async fn update_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError>;

    /// Merge corrected data points; dates present on both sides keep the
    /// new value. Always legal and idempotent.
    async fn correct_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError>;

    /// Delete every point in `[from, to]` (open bounds cover the full
    /// range). A missing series is a no-op returning the latest id.
    async fn remove_points(
        &self,
        oid: &ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<UniqueId, ArchivioError>;

    /// The master's change-notification hub.
    fn change_manager(&self) -> &ChangeManager;

    /// Monotonic change stamp used by caching decorators. Composites that
    /// aggregate several masters override this to combine member stamps, so
    /// the synchronous-invalidation guarantee survives stacking.
    fn change_generation(&self) -> u64 {
        self.change_manager().generation()
    }
}
