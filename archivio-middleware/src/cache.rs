//! Caching decorator for a [`TimeSeriesMaster`].
//!
//! Three caches: latest documents keyed by [`ObjectId`], search result
//! fingerprints keyed by the full request, and history pages keyed likewise.
//! A search fingerprint stores only the page's unique ids; the page is
//! re-assembled from the document cache on a hit, so one cached document
//! serves both `get` and every search page it appears on.
//!
//! Consistency: before touching any cache, every read compares the inner
//! master's change generation against the last one seen and drops all three
//! caches on a mismatch. The inner master bumps its generation before its
//! mutating call returns, so a read started after a write completes can
//! never observe pre-write cache state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache;
use tokio::sync::Semaphore;
use tracing::warn;

use archivio_core::{
    ArchivioError, BulkGetResult, ChangeManager, InfoDocument, InfoHistoryRequest,
    InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest, InfoSearchResult, ObjectId, Paging,
    PagingRequest, PointSeries, SeriesGetRequest, TimeSeriesMaster, UniqueId,
};
use archivio_types::MasterCacheConfig;

/// A cached search page: the totals plus the ids of the page's documents.
#[derive(Debug, Clone)]
struct CachedPage {
    total: usize,
    unauthorized: usize,
    ids: Vec<UniqueId>,
}

/// Caching decorator. Cheap to clone via `Arc`; share one instance per
/// underlying master.
pub struct CachingMaster {
    inner: Arc<dyn TimeSeriesMaster>,
    name: String,
    docs: Cache<ObjectId, Arc<InfoDocument>>,
    searches: Cache<InfoSearchRequest, Arc<CachedPage>>,
    // History pages hold non-latest versions, which the object-id keyed
    // document cache cannot represent, so they are stored whole.
    histories: Cache<InfoHistoryRequest, Arc<InfoSearchResult>>,
    generation: AtomicU64,
    prefetch: Arc<Semaphore>,
    self_check: bool,
}

impl CachingMaster {
    /// Wrap `inner` with caches sized per `config`.
    #[must_use]
    pub fn new(inner: Arc<dyn TimeSeriesMaster>, config: &MasterCacheConfig) -> Self {
        let generation = AtomicU64::new(inner.change_generation());
        Self {
            name: format!("caching({})", inner.name()),
            docs: Cache::new(config.max_documents),
            searches: Cache::new(config.max_fingerprints),
            histories: Cache::new(config.max_fingerprints),
            generation,
            prefetch: Arc::new(Semaphore::new(config.prefetch_workers)),
            self_check: config.self_check,
            inner,
        }
    }

    /// Drop every cache if the inner master changed since the last read.
    fn sync_generation(&self) {
        let current = self.inner.change_generation();
        if self.generation.swap(current, Ordering::AcqRel) != current {
            self.docs.invalidate_all();
            self.searches.invalidate_all();
            self.histories.invalidate_all();
        }
    }

    async fn remember_page(
        docs: &Cache<ObjectId, Arc<InfoDocument>>,
        searches: &Cache<InfoSearchRequest, Arc<CachedPage>>,
        req: InfoSearchRequest,
        result: &InfoSearchResult,
    ) {
        for doc in &result.documents {
            if let Some(oid) = doc.object_id() {
                docs.insert(oid.clone(), Arc::new(doc.clone())).await;
            }
        }
        let page = CachedPage {
            total: result.paging.total(),
            unauthorized: result.unauthorized_count,
            ids: result
                .documents
                .iter()
                .filter_map(|d| d.unique_id().cloned())
                .collect(),
        };
        searches.insert(req, Arc::new(page)).await;
    }

    /// Re-assemble a search page from the document cache. `None` when any
    /// document was evicted, in which case the caller re-queries.
    async fn assemble(
        &self,
        paging: PagingRequest,
        page: &CachedPage,
    ) -> Option<InfoSearchResult> {
        let mut documents = Vec::with_capacity(page.ids.len());
        for uid in &page.ids {
            let doc = self.docs.get(uid.object_id()).await?;
            documents.push((*doc).clone());
        }
        let mut result = InfoSearchResult::new(Paging::of(paging, page.total), documents);
        result.unauthorized_count = page.unauthorized;
        Some(result)
    }

    /// Fill the first-page fingerprint for `req` in the background, bounded
    /// by the prefetch semaphore. Skipped when all workers are busy.
    fn spawn_first_page_prefetch(&self, req: &InfoSearchRequest) {
        let mut head = req.clone();
        head.paging = PagingRequest::default();
        if head.paging == req.paging {
            return;
        }
        let Ok(permit) = Arc::clone(&self.prefetch).try_acquire_owned() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        let docs = self.docs.clone();
        let searches = self.searches.clone();
        let started_at = inner.change_generation();
        tokio::spawn(async move {
            let _permit = permit;
            if searches.get(&head).await.is_some() {
                return;
            }
            if let Ok(result) = inner.search(head.clone()).await {
                // A write raced the prefetch; the result may predate it.
                if inner.change_generation() != started_at {
                    return;
                }
                Self::remember_page(&docs, &searches, head, &result).await;
            }
        });
    }

    async fn verify_cached_document(&self, uid: &UniqueId, cached: &InfoDocument) {
        match self.inner.get(uid).await {
            Ok(fresh) if &fresh == cached => {}
            Ok(_) => warn!(%uid, "cached document diverges from master"),
            Err(err) => warn!(%uid, %err, "self-check re-read failed"),
        }
    }

    async fn verify_cached_search(&self, req: &InfoSearchRequest, cached: &InfoSearchResult) {
        match self.inner.search(req.clone()).await {
            Ok(fresh) if &fresh == cached => {}
            Ok(fresh) => warn!(
                cached_total = cached.paging.total(),
                fresh_total = fresh.paging.total(),
                "cached search page diverges from master"
            ),
            Err(err) => warn!(%err, "self-check search re-query failed"),
        }
    }

    async fn verify_cached_history(&self, req: &InfoHistoryRequest, cached: &InfoSearchResult) {
        match self.inner.history(req.clone()).await {
            Ok(fresh) if &fresh == cached => {}
            Ok(fresh) => warn!(
                object_id = %req.object_id,
                cached_total = cached.paging.total(),
                fresh_total = fresh.paging.total(),
                "cached history page diverges from master"
            ),
            Err(err) => warn!(object_id = %req.object_id, %err, "self-check history re-query failed"),
        }
    }
}

#[async_trait]
impl TimeSeriesMaster for CachingMaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError> {
        self.sync_generation();
        // Version-pinned reads address immutable history; not cached.
        if !uid.is_latest() {
            return self.inner.get(uid).await;
        }
        if let Some(doc) = self.docs.get(uid.object_id()).await {
            if self.self_check {
                self.verify_cached_document(uid, &doc).await;
            }
            return Ok((*doc).clone());
        }
        let doc = self.inner.get(uid).await?;
        self.docs
            .insert(uid.object_id().clone(), Arc::new(doc.clone()))
            .await;
        Ok(doc)
    }

    async fn get_bulk(&self, uids: &[UniqueId]) -> Result<BulkGetResult, ArchivioError> {
        self.sync_generation();
        let mut out = HashMap::with_capacity(uids.len());
        let mut unauthorized = 0;
        let mut misses = Vec::new();
        for uid in uids {
            if uid.is_latest() {
                if let Some(doc) = self.docs.get(uid.object_id()).await {
                    out.insert(uid.clone(), (*doc).clone());
                    continue;
                }
            }
            misses.push(uid.clone());
        }
        if !misses.is_empty() {
            let fetched = self.inner.get_bulk(&misses).await?;
            unauthorized = fetched.unauthorized_count;
            for (uid, doc) in fetched.documents {
                if uid.is_latest() {
                    self.docs
                        .insert(uid.object_id().clone(), Arc::new(doc.clone()))
                        .await;
                }
                out.insert(uid, doc);
            }
        }
        Ok(BulkGetResult {
            documents: out,
            unauthorized_count: unauthorized,
        })
    }

    async fn add(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.inner.add(doc).await
    }

    async fn update(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.inner.update(doc).await
    }

    async fn correct(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.inner.correct(doc).await
    }

    async fn remove(&self, oid: &ObjectId) -> Result<(), ArchivioError> {
        self.inner.remove(oid).await
    }

    async fn search(&self, req: InfoSearchRequest) -> Result<InfoSearchResult, ArchivioError> {
        self.sync_generation();
        if let Some(page) = self.searches.get(&req).await {
            if let Some(result) = self.assemble(req.paging, &page).await {
                if self.self_check {
                    self.verify_cached_search(&req, &result).await;
                }
                return Ok(result);
            }
            // A page document was evicted; fall through to the master.
        }
        let result = self.inner.search(req.clone()).await?;
        self.spawn_first_page_prefetch(&req);
        Self::remember_page(&self.docs, &self.searches, req, &result).await;
        Ok(result)
    }

    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError> {
        self.sync_generation();
        if let Some(result) = self.histories.get(&req).await {
            if self.self_check {
                self.verify_cached_history(&req, &result).await;
            }
            return Ok((*result).clone());
        }
        let result = self.inner.history(req.clone()).await?;
        self.histories.insert(req, Arc::new(result.clone())).await;
        Ok(result)
    }

    async fn meta_data(
        &self,
        req: InfoMetaDataRequest,
    ) -> Result<InfoMetaDataResult, ArchivioError> {
        self.inner.meta_data(req).await
    }

    async fn get_points(&self, req: SeriesGetRequest) -> Result<PointSeries, ArchivioError> {
        self.inner.get_points(req).await
    }

    async fn update_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.inner.update_points(oid, series).await
    }

    async fn correct_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.inner.correct_points(oid, series).await
    }

    async fn remove_points(
        &self,
        oid: &ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<UniqueId, ArchivioError> {
        self.inner.remove_points(oid, from, to).await
    }

    fn change_manager(&self) -> &ChangeManager {
        self.inner.change_manager()
    }

    fn change_generation(&self) -> u64 {
        self.inner.change_generation()
    }
}
