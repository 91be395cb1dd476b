use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use archivio_core::{
    ArchivioError, BulkGetResult, ChangeManager, ExternalId, ExternalIdBundle, InfoDocument,
    InfoHistoryRequest, InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest,
    InfoSearchResult, ObjectId, PagingRequest, PointSeries, SeriesGetRequest, TimeSeriesInfo,
    TimeSeriesMaster, UniqueId,
};
use archivio_mem::InMemoryMaster;
use archivio_middleware::CachingMaster;
use archivio_types::MasterCacheConfig;

/// Delegating wrapper that counts reads hitting the underlying master.
struct CountingMaster {
    inner: InMemoryMaster,
    gets: AtomicUsize,
    searches: AtomicUsize,
    histories: AtomicUsize,
}

impl CountingMaster {
    fn new() -> Self {
        Self {
            inner: InMemoryMaster::new(),
            gets: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
            histories: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TimeSeriesMaster for CountingMaster {
    fn name(&self) -> &str {
        "counting"
    }
    fn scheme(&self) -> &str {
        self.inner.scheme()
    }
    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(uid).await
    }
    async fn get_bulk(&self, uids: &[UniqueId]) -> Result<BulkGetResult, ArchivioError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_bulk(uids).await
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
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(req).await
    }
    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError> {
        self.histories.fetch_add(1, Ordering::SeqCst);
        self.inner.history(req).await
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
}

fn info(name: &str) -> TimeSeriesInfo {
    TimeSeriesInfo {
        unique_id: None,
        external_ids: ExternalIdBundle::of([ExternalId::new("TICKER", name)]),
        data_source: "BLOOMBERG".to_owned(),
        data_provider: "CMPL".to_owned(),
        data_field: "PX_LAST".to_owned(),
        observation_time: "LONDON_CLOSE".to_owned(),
        name: name.to_owned(),
    }
}

fn no_prefetch_config() -> MasterCacheConfig {
    // Prefetch disabled so read counts stay deterministic.
    MasterCacheConfig {
        prefetch_workers: 0,
        ..Default::default()
    }
}

#[tokio::test]
async fn repeated_gets_hit_the_cache() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let uid = UniqueId::latest(doc.object_id().unwrap().clone());

    let cached = CachingMaster::new(counting.clone(), &no_prefetch_config());
    let first = cached.get(&uid).await.unwrap();
    let second = cached.get(&uid).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(counting.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn version_pinned_gets_bypass_the_cache() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let pinned = doc.unique_id().unwrap().clone();
    assert!(!pinned.is_latest());

    let cached = CachingMaster::new(counting.clone(), &no_prefetch_config());
    cached.get(&pinned).await.unwrap();
    cached.get(&pinned).await.unwrap();
    assert_eq!(counting.gets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn a_write_invalidates_every_cache_before_returning() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let uid = UniqueId::latest(doc.object_id().unwrap().clone());

    let cached = CachingMaster::new(counting.clone(), &no_prefetch_config());
    cached.get(&uid).await.unwrap();
    cached.get(&uid).await.unwrap();
    assert_eq!(counting.gets.load(Ordering::SeqCst), 1);

    // Write through the decorator; the very next read must see fresh state.
    let mut renamed = cached.get(&uid).await.unwrap();
    renamed.info.name = "Apple Inc".to_owned();
    cached.update(renamed).await.unwrap();

    let fresh = cached.get(&uid).await.unwrap();
    assert_eq!(fresh.info.name, "Apple Inc");
    assert_eq!(counting.gets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn a_direct_write_to_the_inner_master_also_invalidates() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let uid = UniqueId::latest(doc.object_id().unwrap().clone());

    let cached = CachingMaster::new(counting.clone(), &no_prefetch_config());
    cached.get(&uid).await.unwrap();

    // Bypass the decorator entirely; the generation still moves.
    let mut renamed = counting.get(&uid).await.unwrap();
    renamed.info.name = "Apple Inc".to_owned();
    counting.update(renamed).await.unwrap();

    assert_eq!(cached.get(&uid).await.unwrap().info.name, "Apple Inc");
}

#[tokio::test]
async fn search_pages_are_reused_from_the_fingerprint_cache() {
    let counting = Arc::new(CountingMaster::new());
    for name in ["AAPL", "MSFT", "GOOG"] {
        counting.add(InfoDocument::new(info(name))).await.unwrap();
    }

    let cached = CachingMaster::new(counting.clone(), &no_prefetch_config());
    let req = InfoSearchRequest {
        data_source: Some("BLOOMBERG".to_owned()),
        ..Default::default()
    };
    let first = cached.search(req.clone()).await.unwrap();
    let second = cached.search(req.clone()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(counting.searches.load(Ordering::SeqCst), 1);

    // A cached search also warms the document cache.
    let uid = UniqueId::latest(first.documents[0].object_id().unwrap().clone());
    cached.get(&uid).await.unwrap();
    assert_eq!(counting.gets.load(Ordering::SeqCst), 0);

    // Any write drops the fingerprints.
    cached.add(InfoDocument::new(info("AMZN"))).await.unwrap();
    let third = cached.search(req).await.unwrap();
    assert_eq!(third.paging.total(), 4);
    assert_eq!(counting.searches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn history_pages_are_cached_whole() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let oid = doc.object_id().unwrap().clone();
    let mut renamed = doc.clone();
    renamed.info.name = "Apple Inc".to_owned();
    counting.update(renamed).await.unwrap();

    let cached = CachingMaster::new(counting.clone(), &no_prefetch_config());
    let req = InfoHistoryRequest {
        object_id: oid,
        paging: PagingRequest::ALL,
    };
    let first = cached.history(req.clone()).await.unwrap();
    let second = cached.history(req).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.paging.total(), 2);
    assert_eq!(counting.histories.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn self_check_keeps_results_identical() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let uid = UniqueId::latest(doc.object_id().unwrap().clone());

    let config = MasterCacheConfig {
        self_check: true,
        prefetch_workers: 0,
        ..Default::default()
    };
    let cached = CachingMaster::new(counting.clone(), &config);
    let first = cached.get(&uid).await.unwrap();
    // The cached read re-queries for the diagnostic but still serves the
    // cached value.
    let second = cached.get(&uid).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(counting.gets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn self_check_re_queries_cached_search_and_history_pages() {
    let counting = Arc::new(CountingMaster::new());
    let doc = counting.add(InfoDocument::new(info("AAPL"))).await.unwrap();
    let oid = doc.object_id().unwrap().clone();

    let config = MasterCacheConfig {
        self_check: true,
        prefetch_workers: 0,
        ..Default::default()
    };
    let cached = CachingMaster::new(counting.clone(), &config);

    let req = InfoSearchRequest::default();
    let first = cached.search(req.clone()).await.unwrap();
    let second = cached.search(req).await.unwrap();
    assert_eq!(first, second);
    // The assembled-from-cache page was re-fetched for the comparison.
    assert_eq!(counting.searches.load(Ordering::SeqCst), 2);

    let hist = InfoHistoryRequest {
        object_id: oid,
        paging: PagingRequest::ALL,
    };
    let first = cached.history(hist.clone()).await.unwrap();
    let second = cached.history(hist).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(counting.histories.load(Ordering::SeqCst), 2);
}
