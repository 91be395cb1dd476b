//! Authorization decorator for a [`TimeSeriesMaster`].
//!
//! Two levels of checking, mirroring the split in
//! [`archivio_types::PermissionConfig`]:
//!
//! - **Operation level**: the caller either may or may not invoke an
//!   operation at all. Denied single-record calls fail fast with
//!   `Forbidden` before the inner master is touched.
//! - **Record level**: individual records can be hidden. A denied record
//!   turns a single `get` into `Forbidden`, but is *silently dropped* from
//!   bulk reads, searches, and history, with the withheld count surfaced in
//!   `unauthorized_count` and the paging total reduced to match.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use archivio_core::{
    ArchivioError, BulkGetResult, ChangeManager, InfoDocument, InfoHistoryRequest,
    InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest, InfoSearchResult, ObjectId,
    PointSeries, SeriesGetRequest, TimeSeriesInfo, TimeSeriesMaster, UniqueId,
};
use archivio_types::{Operation, PermissionConfig};

/// Authorization policy consulted by [`PermissionedMaster`].
pub trait PermissionChecker: Send + Sync {
    /// Whether the caller may invoke `op` at all.
    fn allows_operation(&self, op: Operation) -> bool;

    /// Whether the caller may see `info`.
    fn allows_record(&self, info: &TimeSeriesInfo) -> bool;
}

/// A [`PermissionChecker`] evaluating a static [`PermissionConfig`] for one
/// principal. Principals absent from the config are denied everything.
pub struct ConfigPermissionChecker {
    config: PermissionConfig,
    principal: String,
}

impl ConfigPermissionChecker {
    /// Bind `config` to `principal`.
    #[must_use]
    pub fn new(config: PermissionConfig, principal: impl Into<String>) -> Self {
        Self {
            config,
            principal: principal.into(),
        }
    }
}

impl PermissionChecker for ConfigPermissionChecker {
    fn allows_operation(&self, op: Operation) -> bool {
        self.config.allows_operation(&self.principal, op)
    }

    fn allows_record(&self, info: &TimeSeriesInfo) -> bool {
        self.config.allows_source(&self.principal, &info.data_source)
    }
}

/// Authorization decorator.
pub struct PermissionedMaster {
    inner: Arc<dyn TimeSeriesMaster>,
    checker: Arc<dyn PermissionChecker>,
    name: String,
}

impl PermissionedMaster {
    /// Wrap `inner`, consulting `checker` on every call.
    #[must_use]
    pub fn new(inner: Arc<dyn TimeSeriesMaster>, checker: Arc<dyn PermissionChecker>) -> Self {
        Self {
            name: format!("permissioned({})", inner.name()),
            inner,
            checker,
        }
    }

    fn require(&self, op: Operation) -> Result<(), ArchivioError> {
        if self.checker.allows_operation(op) {
            Ok(())
        } else {
            Err(ArchivioError::forbidden(format!("operation {op:?} denied")))
        }
    }

    fn require_record(&self, info: &TimeSeriesInfo) -> Result<(), ArchivioError> {
        if self.checker.allows_record(info) {
            Ok(())
        } else {
            Err(ArchivioError::forbidden(match info.object_id() {
                Some(oid) => format!("access to {oid} denied"),
                None => "access to record denied".to_owned(),
            }))
        }
    }

    /// Drop denied documents from a result page and account for them in the
    /// unauthorized count and the paging total.
    fn filter_result(&self, mut result: InfoSearchResult) -> InfoSearchResult {
        let before = result.documents.len();
        result
            .documents
            .retain(|doc| self.checker.allows_record(&doc.info));
        let dropped = before - result.documents.len();
        result.unauthorized_count += dropped;
        result.paging.reduce_total(dropped);
        result
    }
}

#[async_trait]
impl TimeSeriesMaster for PermissionedMaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError> {
        self.require(Operation::View)?;
        let doc = self.inner.get(uid).await?;
        self.require_record(&doc.info)?;
        Ok(doc)
    }

    async fn get_bulk(&self, uids: &[UniqueId]) -> Result<BulkGetResult, ArchivioError> {
        self.require(Operation::View)?;
        let mut result = self.inner.get_bulk(uids).await?;
        let before = result.documents.len();
        result
            .documents
            .retain(|_, doc| self.checker.allows_record(&doc.info));
        result.unauthorized_count += before - result.documents.len();
        Ok(result)
    }

    async fn add(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.require(Operation::Add)?;
        self.require_record(&doc.info)?;
        self.inner.add(doc).await
    }

    async fn update(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.require(Operation::Update)?;
        self.require_record(&doc.info)?;
        self.inner.update(doc).await
    }

    async fn correct(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.require(Operation::Correct)?;
        self.require_record(&doc.info)?;
        self.inner.correct(doc).await
    }

    async fn remove(&self, oid: &ObjectId) -> Result<(), ArchivioError> {
        self.require(Operation::Remove)?;
        let doc = self.inner.get(&UniqueId::latest(oid.clone())).await?;
        self.require_record(&doc.info)?;
        self.inner.remove(oid).await
    }

    async fn search(&self, req: InfoSearchRequest) -> Result<InfoSearchResult, ArchivioError> {
        self.require(Operation::View)?;
        let result = self.inner.search(req).await?;
        Ok(self.filter_result(result))
    }

    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError> {
        self.require(Operation::View)?;
        let result = self.inner.history(req).await?;
        Ok(self.filter_result(result))
    }

    async fn meta_data(
        &self,
        req: InfoMetaDataRequest,
    ) -> Result<InfoMetaDataResult, ArchivioError> {
        self.require(Operation::View)?;
        self.inner.meta_data(req).await
    }

    async fn get_points(&self, req: SeriesGetRequest) -> Result<PointSeries, ArchivioError> {
        self.require(Operation::View)?;
        let doc = self
            .inner
            .get(&UniqueId::latest(req.object_id.clone()))
            .await?;
        self.require_record(&doc.info)?;
        self.inner.get_points(req).await
    }

    async fn update_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.require(Operation::Update)?;
        let doc = self.inner.get(&UniqueId::latest(oid.clone())).await?;
        self.require_record(&doc.info)?;
        self.inner.update_points(oid, series).await
    }

    async fn correct_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.require(Operation::Correct)?;
        let doc = self.inner.get(&UniqueId::latest(oid.clone())).await?;
        self.require_record(&doc.info)?;
        self.inner.correct_points(oid, series).await
    }

    async fn remove_points(
        &self,
        oid: &ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<UniqueId, ArchivioError> {
        self.require(Operation::Remove)?;
        let doc = self.inner.get(&UniqueId::latest(oid.clone())).await?;
        self.require_record(&doc.info)?;
        self.inner.remove_points(oid, from, to).await
    }

    fn change_manager(&self) -> &ChangeManager {
        self.inner.change_manager()
    }

    fn change_generation(&self) -> u64 {
        self.inner.change_generation()
    }
}
