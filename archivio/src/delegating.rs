//! Scheme-based routing across several masters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use archivio_core::{
    ArchivioError, BulkGetResult, ChangeManager, InfoDocument, InfoHistoryRequest,
    InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest, InfoSearchResult, ObjectId,
    PointSeries, SeriesGetRequest, TimeSeriesMaster, UniqueId,
};

/// Routes identifier-bearing calls to the master registered for the
/// identifier's scheme, falling back to a default master.
///
/// `add` always targets the default: a not-yet-stored record has no scheme.
/// `get_bulk` and `meta_data` are not scheme-addressed and fan out to every
/// member. The composite's [`ChangeManager`] republishes every member's
/// events; its change generation is the sum of the members', so caching
/// decorators stacked on top keep the synchronous-invalidation guarantee.
pub struct SchemeDelegatingMaster {
    default: Arc<dyn TimeSeriesMaster>,
    delegates: HashMap<String, Arc<dyn TimeSeriesMaster>>,
    // default first, then delegates in registration order
    members: Vec<Arc<dyn TimeSeriesMaster>>,
    changes: Arc<ChangeManager>,
    forwarders: Vec<JoinHandle<()>>,
}

impl SchemeDelegatingMaster {
    /// Build the composite. Each delegate registers under its own scheme;
    /// requires a running Tokio runtime for the event-forwarding tasks.
    #[must_use]
    pub fn new(
        default: Arc<dyn TimeSeriesMaster>,
        delegate_list: Vec<Arc<dyn TimeSeriesMaster>>,
    ) -> Self {
        let mut delegates = HashMap::new();
        let mut members = vec![Arc::clone(&default)];
        for master in delegate_list {
            delegates.insert(master.scheme().to_owned(), Arc::clone(&master));
            members.push(master);
        }
        let changes = Arc::new(ChangeManager::new());
        let forwarders = members
            .iter()
            .map(|member| forward_events(member.change_manager(), Arc::clone(&changes)))
            .collect();
        Self {
            default,
            delegates,
            members,
            changes,
            forwarders,
        }
    }

    fn route(&self, scheme: &str) -> &Arc<dyn TimeSeriesMaster> {
        self.delegates.get(scheme).unwrap_or(&self.default)
    }

    fn route_doc<'a>(
        &'a self,
        doc: &InfoDocument,
    ) -> Result<&'a Arc<dyn TimeSeriesMaster>, ArchivioError> {
        let oid = doc
            .object_id()
            .ok_or_else(|| ArchivioError::invalid_arg("document has no unique id"))?;
        Ok(self.route(oid.scheme()))
    }
}

fn forward_events(source: &ChangeManager, sink: Arc<ChangeManager>) -> JoinHandle<()> {
    let mut rx = source.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => sink.publish(event),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

impl Drop for SchemeDelegatingMaster {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
    }
}

#[async_trait]
impl TimeSeriesMaster for SchemeDelegatingMaster {
    fn name(&self) -> &str {
        "delegating"
    }

    fn scheme(&self) -> &str {
        self.default.scheme()
    }

    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError> {
        self.route(uid.object_id().scheme()).get(uid).await
    }

    async fn get_bulk(&self, uids: &[UniqueId]) -> Result<BulkGetResult, ArchivioError> {
        let mut out = BulkGetResult::default();
        for member in &self.members {
            let part = member.get_bulk(uids).await?;
            out.documents.extend(part.documents);
            out.unauthorized_count += part.unauthorized_count;
        }
        Ok(out)
    }

    async fn add(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.default.add(doc).await
    }

    async fn update(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.route_doc(&doc)?.update(doc).await
    }

    async fn correct(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        self.route_doc(&doc)?.correct(doc).await
    }

    async fn remove(&self, oid: &ObjectId) -> Result<(), ArchivioError> {
        self.route(oid.scheme()).remove(oid).await
    }

    async fn search(&self, req: InfoSearchRequest) -> Result<InfoSearchResult, ArchivioError> {
        // Only an object-id restriction confined to one scheme can be
        // routed; everything else belongs to the default master.
        if let Some(oids) = &req.object_ids {
            let mut schemes = oids.iter().map(ObjectId::scheme);
            if let Some(first) = schemes.next()
                && schemes.all(|s| s == first)
            {
                let scheme = first.to_owned();
                return self.route(&scheme).search(req).await;
            }
        }
        self.default.search(req).await
    }

    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError> {
        self.route(req.object_id.scheme()).history(req).await
    }

    async fn meta_data(
        &self,
        req: InfoMetaDataRequest,
    ) -> Result<InfoMetaDataResult, ArchivioError> {
        let mut out = InfoMetaDataResult::default();
        for member in &self.members {
            out.merge(member.meta_data(req).await?);
        }
        Ok(out)
    }

    async fn get_points(&self, req: SeriesGetRequest) -> Result<PointSeries, ArchivioError> {
        self.route(req.object_id.scheme()).get_points(req).await
    }

    async fn update_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.route(oid.scheme()).update_points(oid, series).await
    }

    async fn correct_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.route(oid.scheme()).correct_points(oid, series).await
    }

    async fn remove_points(
        &self,
        oid: &ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<UniqueId, ArchivioError> {
        self.route(oid.scheme()).remove_points(oid, from, to).await
    }

    fn change_manager(&self) -> &ChangeManager {
        &self.changes
    }

    fn change_generation(&self) -> u64 {
        // Members may be wrapped or shared; summing their stamps keeps the
        // composite stamp monotonic under any interleaving.
        self.members
            .iter()
            .fold(0u64, |acc, m| acc.wrapping_add(m.change_generation()))
    }
}
