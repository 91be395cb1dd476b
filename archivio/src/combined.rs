//! Fan-out view over several masters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use archivio_core::{
    ArchivioError, BulkGetResult, ChangeManager, InfoDocument, InfoHistoryRequest,
    InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest, InfoSearchResult, ObjectId, Paging,
    PagingRequest, PointSeries, SeriesGetRequest, TimeSeriesMaster, UniqueId,
};

/// A read-mostly combined view: `search` and `history` accumulate one page
/// window across every member's results in member order; per-identifier
/// calls dispatch through a lookup table built from each member's declared
/// scheme, with no silent default. `add` is unsupported, a combined view
/// has no authoritative home for new records.
pub struct CombinedMaster {
    members: Vec<Arc<dyn TimeSeriesMaster>>,
    table: HashMap<String, Arc<dyn TimeSeriesMaster>>,
    changes: Arc<ChangeManager>,
    forwarders: Vec<JoinHandle<()>>,
}

impl CombinedMaster {
    /// Scheme the combined view itself declares.
    pub const SCHEME: &'static str = "Combined";

    /// Build the view over `members`.
    ///
    /// # Errors
    /// `Config` when two members declare the same scheme; dispatch would be
    /// ambiguous.
    pub fn new(members: Vec<Arc<dyn TimeSeriesMaster>>) -> Result<Self, ArchivioError> {
        let mut table = HashMap::new();
        for member in &members {
            if table
                .insert(member.scheme().to_owned(), Arc::clone(member))
                .is_some()
            {
                return Err(ArchivioError::config(format!(
                    "combined master: duplicate scheme {}",
                    member.scheme()
                )));
            }
        }
        let changes = Arc::new(ChangeManager::new());
        let forwarders = members
            .iter()
            .map(|member| {
                let sink = Arc::clone(&changes);
                let mut rx = member.change_manager().subscribe();
                tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(event) => sink.publish(event),
                            Err(RecvError::Lagged(_)) => {}
                            Err(RecvError::Closed) => break,
                        }
                    }
                })
            })
            .collect();
        Ok(Self {
            members,
            table,
            changes,
            forwarders,
        })
    }

    fn route(&self, scheme: &str) -> Result<&Arc<dyn TimeSeriesMaster>, ArchivioError> {
        self.table
            .get(scheme)
            .ok_or_else(|| ArchivioError::unknown_scheme(scheme))
    }
}

impl Drop for CombinedMaster {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
    }
}

/// Accumulates one page window across the concatenation of several paged
/// result sets queried member by member.
struct PageWindow {
    requested: PagingRequest,
    skip: usize,
    need: usize,
    total: usize,
    unauthorized: usize,
    documents: Vec<InfoDocument>,
}

impl PageWindow {
    fn new(requested: PagingRequest) -> Self {
        Self {
            requested,
            skip: requested.first(),
            need: requested.size(),
            total: 0,
            unauthorized: 0,
            documents: Vec::new(),
        }
    }

    /// Paging to request from the next member: the still-unconsumed part of
    /// the window, or a count-only probe once the window is full.
    fn next_request(&self) -> PagingRequest {
        if self.need == 0 {
            PagingRequest::NONE
        } else {
            PagingRequest::of_index(self.skip, self.need)
        }
    }

    fn absorb(&mut self, result: InfoSearchResult) {
        let member_total = result.paging.total();
        self.total += member_total;
        self.unauthorized += result.unauthorized_count;
        self.need = self.need.saturating_sub(result.documents.len());
        self.documents.extend(result.documents);
        // Whatever this member held consumed that much of the offset.
        self.skip = self.skip.saturating_sub(member_total);
    }

    fn finish(self) -> InfoSearchResult {
        let mut result =
            InfoSearchResult::new(Paging::of(self.requested, self.total), self.documents);
        result.unauthorized_count = self.unauthorized;
        result
    }
}

#[async_trait]
impl TimeSeriesMaster for CombinedMaster {
    fn name(&self) -> &str {
        "combined"
    }

    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    async fn get(&self, uid: &UniqueId) -> Result<InfoDocument, ArchivioError> {
        self.route(uid.object_id().scheme())?.get(uid).await
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

    async fn add(&self, _doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        Err(ArchivioError::invalid_arg(
            "combined master cannot add records; add through a member master",
        ))
    }

    async fn update(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        let oid = doc
            .object_id()
            .ok_or_else(|| ArchivioError::invalid_arg("document has no unique id"))?;
        let scheme = oid.scheme().to_owned();
        self.route(&scheme)?.update(doc).await
    }

    async fn correct(&self, doc: InfoDocument) -> Result<InfoDocument, ArchivioError> {
        let oid = doc
            .object_id()
            .ok_or_else(|| ArchivioError::invalid_arg("document has no unique id"))?;
        let scheme = oid.scheme().to_owned();
        self.route(&scheme)?.correct(doc).await
    }

    async fn remove(&self, oid: &ObjectId) -> Result<(), ArchivioError> {
        self.route(oid.scheme())?.remove(oid).await
    }

    async fn search(&self, req: InfoSearchRequest) -> Result<InfoSearchResult, ArchivioError> {
        let mut window = PageWindow::new(req.paging);
        for member in &self.members {
            let mut member_req = req.clone();
            member_req.paging = window.next_request();
            window.absorb(member.search(member_req).await?);
        }
        Ok(window.finish())
    }

    async fn history(&self, req: InfoHistoryRequest) -> Result<InfoSearchResult, ArchivioError> {
        let mut window = PageWindow::new(req.paging);
        for member in &self.members {
            let mut member_req = req.clone();
            member_req.paging = window.next_request();
            match member.history(member_req).await {
                Ok(result) => window.absorb(result),
                // Members that never stored the record contribute nothing.
                Err(ArchivioError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(window.finish())
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
        self.route(req.object_id.scheme())?.get_points(req).await
    }

    async fn update_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.route(oid.scheme())?.update_points(oid, series).await
    }

    async fn correct_points(
        &self,
        oid: &ObjectId,
        series: PointSeries,
    ) -> Result<UniqueId, ArchivioError> {
        self.route(oid.scheme())?.correct_points(oid, series).await
    }

    async fn remove_points(
        &self,
        oid: &ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<UniqueId, ArchivioError> {
        self.route(oid.scheme())?.remove_points(oid, from, to).await
    }

    fn change_manager(&self) -> &ChangeManager {
        &self.changes
    }

    fn change_generation(&self) -> u64 {
        self.members
            .iter()
            .fold(0u64, |acc, m| acc.wrapping_add(m.change_generation()))
    }
}
