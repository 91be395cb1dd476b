//! In-memory [`TimeSeriesMaster`] backed by lock-guarded maps.
//!
//! This is the reference storage adapter: tests run against it, and
//! decorators are validated against its behavior. It keeps every version of
//! every document, so `history` works without a real database.
//!
//! Ordering guarantee: `search` sorts matches by [`ObjectId`] before paging,
//! so result pages are stable across calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use archivio_core::{
    ArchivioError, BulkGetResult, ChangeEvent, ChangeKind, ChangeManager, InfoDocument,
    InfoHistoryRequest, InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest,
    InfoSearchResult, ObjectId, Paging, PointSeries, SeriesGetRequest, TimeSeriesMaster, UniqueId,
    remove_range, union_no_intersect, union_second_wins,
};

/// Default object-id scheme issued by [`InMemoryMaster`].
pub const DEFAULT_SCHEME: &str = "MemTs";

#[derive(Default)]
struct Store {
    // All versions per record, oldest first; the last entry is the latest.
    docs: HashMap<ObjectId, Vec<InfoDocument>>,
    points: HashMap<ObjectId, PointSeries>,
}

/// An in-memory master. Cheap to create, safe to share behind an `Arc`.
pub struct InMemoryMaster {
    scheme: String,
    store: Mutex<Store>,
    next_id: AtomicU64,
    changes: ChangeManager,
}

impl InMemoryMaster {
    /// Create an empty master issuing ids under [`DEFAULT_SCHEME`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_scheme(DEFAULT_SCHEME)
    }

    /// Create an empty master issuing ids under `scheme`.
    #[must_use]
    pub fn with_scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            store: Mutex::new(Store::default()),
            next_id: AtomicU64::new(1),
            changes: ChangeManager::new(),
        }
    }

    fn latest<'a>(
        &self,
        store: &'a Store,
        oid: &ObjectId,
    ) -> Result<&'a InfoDocument, ArchivioError> {
        store
            .docs
            .get(oid)
            .and_then(|versions| versions.last())
            .ok_or_else(|| ArchivioError::not_found(format!("time-series {oid}")))
    }

    fn latest_uid(&self, store: &Store, oid: &ObjectId) -> Result<UniqueId, ArchivioError> {
        let doc = self.latest(store, oid)?;
        doc.unique_id()
            .cloned()
            .ok_or_else(|| ArchivioError::Internal(format!("stored document {oid} has no id")))
    }

    /// Version check shared by `update` and `correct`: the incoming document
    /// must address the stored latest version, either explicitly or via the
    /// latest sentinel.
    fn check_version(
        &self,
        stored: &InfoDocument,
        incoming: &InfoDocument,
    ) -> Result<(ObjectId, u64), ArchivioError> {
        let incoming_uid = incoming
            .unique_id()
            .ok_or_else(|| ArchivioError::invalid_arg("document has no unique id"))?;
        let stored_uid = stored
            .unique_id()
            .ok_or_else(|| ArchivioError::Internal("stored document has no id".to_owned()))?;
        if !incoming_uid.is_latest() && incoming_uid.version() != stored_uid.version() {
            return Err(ArchivioError::concurrent(incoming_uid.object_id()));
        }
        Ok((stored_uid.object_id().clone(), stored_uid.version()))
    }
}

impl Default for InMemoryMaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeSeriesMaster for InMemoryMaster {
    fn name(&self) -> &str {
        "archivio-mem"
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError> {
        let store = self.store.lock().await;
        let versions = store
            .docs
            .get(uid.object_id())
            .ok_or_else(|| ArchivioError::not_found(format!("time-series {}", uid.object_id())))?;
        let doc = if uid.is_latest() {
            versions.last()
        } else {
            versions
                .iter()
                .find(|d| d.unique_id().is_some_and(|u| u.version() == uid.version()))
        };
        doc.cloned()
            .ok_or_else(|| ArchivioError::not_found(format!("time-series {uid}")))
    }

    async fn get_bulk(&self, uids: &[UniqueId]) -> Result<BulkGetResult, ArchivioError> {
        let mut out = HashMap::with_capacity(uids.len());
        for uid in uids {
            if let Ok(doc) = self.get(uid).await {
                out.insert(uid.clone(), doc);
            }
        }
        Ok(BulkGetResult::of(out))
    }

    async fn add(&self, mut doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        let value = self.next_id.fetch_add(1, Ordering::Relaxed);
        let oid = ObjectId::new(self.scheme.clone(), value.to_string());
        let uid = UniqueId::versioned(oid.clone(), 1);
        doc.info.unique_id = Some(uid);
        doc.version_instant = Some(Utc::now());
        doc.correction_instant = doc.version_instant;

        let mut store = self.store.lock().await;
        store.docs.insert(oid.clone(), vec![doc.clone()]);
        let mut event = ChangeEvent::now(ChangeKind::Added, oid);
        event.version_to = doc.version_instant;
        self.changes.publish(event);
        Ok(doc)
    }

    async fn update(&self, mut doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        let mut store = self.store.lock().await;
        let incoming_oid = doc
            .unique_id()
            .map(|u| u.object_id().clone())
            .ok_or_else(|| ArchivioError::invalid_arg("document has no unique id"))?;
        let stored = self.latest(&store, &incoming_oid)?;
        let (oid, version) = self.check_version(stored, &doc)?;
        let version_from = stored.version_instant;

        doc.info.unique_id = Some(UniqueId::versioned(oid.clone(), version + 1));
        doc.version_instant = Some(Utc::now());
        doc.correction_instant = doc.version_instant;
        store
            .docs
            .get_mut(&oid)
            .ok_or_else(|| ArchivioError::not_found(format!("time-series {oid}")))?
            .push(doc.clone());

        let mut event = ChangeEvent::now(ChangeKind::Changed, oid);
        event.version_from = version_from;
        event.version_to = doc.version_instant;
        self.changes.publish(event);
        Ok(doc)
    }

    async fn correct(&self, mut doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        let mut store = self.store.lock().await;
        let incoming_oid = doc
            .unique_id()
            .map(|u| u.object_id().clone())
            .ok_or_else(|| ArchivioError::invalid_arg("document has no unique id"))?;
        let stored = self.latest(&store, &incoming_oid)?;
        let (oid, version) = self.check_version(stored, &doc)?;
        let version_instant = stored.version_instant;

        doc.info.unique_id = Some(UniqueId::versioned(oid.clone(), version));
        doc.version_instant = version_instant;
        doc.correction_instant = Some(Utc::now());
        let slot = store
            .docs
            .get_mut(&oid)
            .and_then(|versions| versions.last_mut())
            .ok_or_else(|| ArchivioError::not_found(format!("time-series {oid}")))?;
        *slot = doc.clone();

        let mut event = ChangeEvent::now(ChangeKind::Changed, oid);
        event.version_from = version_instant;
        event.version_to = version_instant;
        self.changes.publish(event);
        Ok(doc)
    }

    async fn remove(&self, oid: &ObjectId) -> Result<(), ArchivioError> {
        let mut store = self.store.lock().await;
        if store.docs.remove(oid).is_none() {
            return Err(ArchivioError::not_found(format!("time-series {oid}")));
        }
        store.points.remove(oid);
        self.changes
            .publish(ChangeEvent::now(ChangeKind::Removed, oid.clone()));
        Ok(())
    }

    async fn search(&self, req: InfoSearchRequest) -> Result<InfoSearchResult, ArchivioError> {
        let store = self.store.lock().await;
        let mut matches: Vec<&InfoDocument> = store
            .docs
            .values()
            .filter_map(|versions| versions.last())
            .filter(|doc| req.matches(&doc.info))
            .collect();
        matches.sort_by(|a, b| a.object_id().cmp(&b.object_id()));

        let total = matches.len();
        let page = req
            .paging
            .select(matches.into_iter().cloned().collect());
        Ok(InfoSearchResult::new(Paging::of(req.paging, total), page))
    }

    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError> {
        let store = self.store.lock().await;
        let versions = store
            .docs
            .get(&req.object_id)
            .ok_or_else(|| ArchivioError::not_found(format!("time-series {}", req.object_id)))?;
        // Newest first.
        let all: Vec<InfoDocument> = versions.iter().rev().cloned().collect();
        let total = all.len();
        let page = req.paging.select(all);
        Ok(InfoSearchResult::new(Paging::of(req.paging, total), page))
    }

    async fn meta_data(
        &self,
        _req: InfoMetaDataRequest,
    ) -> Result<InfoMetaDataResult, ArchivioError> {
        let store = self.store.lock().await;
        let mut docs: Vec<&InfoDocument> = store
            .docs
            .values()
            .filter_map(|versions| versions.last())
            .collect();
        docs.sort_by(|a, b| a.object_id().cmp(&b.object_id()));

        let mut out = InfoMetaDataResult::default();
        for doc in docs {
            let one = InfoMetaDataResult {
                data_sources: vec![doc.info.data_source.clone()],
                data_providers: vec![doc.info.data_provider.clone()],
                data_fields: vec![doc.info.data_field.clone()],
                observation_times: vec![doc.info.observation_time.clone()],
            };
            out.merge(one);
        }
        Ok(out)
    }

    async fn get_points(&self, req: SeriesGetRequest) -> Result<PointSeries, ArchivioError> {
        let store = self.store.lock().await;
        self.latest(&store, &req.object_id)?;
        let series = store
            .points
            .get(&req.object_id)
            .cloned()
            .unwrap_or_default();
        Ok(series.sub_series(req.start, req.end).limit(req.max_points))
    }

    async fn update_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        let mut store = self.store.lock().await;
        let uid = self.latest_uid(&store, oid)?;
        let stored = store.points.get(oid).cloned().unwrap_or_default();
        if let (Some((last, _)), Some((first, _))) = (stored.latest(), series.earliest()) {
            if first <= last {
                return Err(ArchivioError::invalid_arg(format!(
                    "new points for {oid} start on {first}, on or before stored end {last}"
                )));
            }
        }
        let merged = union_no_intersect(stored, series)?;
        store.points.insert(oid.clone(), merged);
        self.changes
            .publish(ChangeEvent::now(ChangeKind::Changed, oid.clone()));
        Ok(uid)
    }

    async fn correct_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        let mut store = self.store.lock().await;
        let uid = self.latest_uid(&store, oid)?;
        let stored = store.points.get(oid).cloned().unwrap_or_default();
        store.points.insert(oid.clone(), union_second_wins(stored, series));
        self.changes
            .publish(ChangeEvent::now(ChangeKind::Changed, oid.clone()));
        Ok(uid)
    }

    async fn remove_points(
        &self,
        oid: &ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<UniqueId, ArchivioError> {
        let mut store = self.store.lock().await;
        let uid = self.latest_uid(&store, oid)?;
        let Some(stored) = store.points.get(oid).cloned() else {
            // No series yet: nothing to delete.
            return Ok(uid);
        };
        store.points.insert(oid.clone(), remove_range(stored, from, to));
        self.changes
            .publish(ChangeEvent::now(ChangeKind::Changed, oid.clone()));
        Ok(uid)
    }

    fn change_manager(&self) -> &ChangeManager {
        &self.changes
    }
}
