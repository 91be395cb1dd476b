//! Time-series metadata documents and the search/history request types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::{ExternalIdBundle, ObjectId, UniqueId};
use crate::paging::{Paging, PagingRequest};

/// Metadata describing one stored time-series.
///
/// Identity is the object id inside `unique_id`; a record that has not yet
/// been added to a master carries no id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesInfo {
    /// Versioned identity, assigned by the master on add.
    pub unique_id: Option<UniqueId>,
    /// External identifiers of the underlying entity, each optionally dated.
    pub external_ids: ExternalIdBundle,
    /// Originating data source, e.g. `"BLOOMBERG"`.
    pub data_source: String,
    /// Originating data provider within the source, e.g. `"CMPL"`.
    pub data_provider: String,
    /// The observed field, e.g. `"PX_LAST"`.
    pub data_field: String,
    /// Observation time label, e.g. `"LONDON_CLOSE"`.
    pub observation_time: String,
    /// Human-readable name.
    pub name: String,
}

impl TimeSeriesInfo {
    /// The stable record identity, if assigned.
    #[must_use]
    pub fn object_id(&self) -> Option<&ObjectId> {
        self.unique_id.as_ref().map(UniqueId::object_id)
    }
}

/// A master's unit of storage: the metadata plus version/correction stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoDocument {
    /// The metadata record.
    pub info: TimeSeriesInfo,
    /// Instant this version was created.
    pub version_instant: Option<DateTime<Utc>>,
    /// Instant this version was last corrected.
    pub correction_instant: Option<DateTime<Utc>>,
}

impl InfoDocument {
    /// Wrap a not-yet-stored metadata record.
    #[must_use]
    pub fn new(info: TimeSeriesInfo) -> Self {
        Self {
            info,
            version_instant: None,
            correction_instant: None,
        }
    }

    /// The document's versioned identity, if stored.
    #[must_use]
    pub fn unique_id(&self) -> Option<&UniqueId> {
        self.info.unique_id.as_ref()
    }

    /// The document's stable identity, if stored.
    #[must_use]
    pub fn object_id(&self) -> Option<&ObjectId> {
        self.info.object_id()
    }
}

/// Search request over time-series metadata.
///
/// All criteria are conjunctive; unset criteria match everything. The name
/// criterion is matched case-insensitively and may contain `*` (any run)
/// and `?` (any single character) wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfoSearchRequest {
    /// Match records whose bundle shares an identifier with this one.
    pub external_ids: Option<ExternalIdBundle>,
    /// Date on which the stored record's identifiers must be valid.
    pub validity_date: Option<NaiveDate>,
    /// Restrict to these object ids.
    pub object_ids: Option<Vec<ObjectId>>,
    /// Exact data source.
    pub data_source: Option<String>,
    /// Exact data provider.
    pub data_provider: Option<String>,
    /// Exact data field.
    pub data_field: Option<String>,
    /// Exact observation time.
    pub observation_time: Option<String>,
    /// Name pattern, wildcard-capable.
    pub name: Option<String>,
    /// Requested page.
    pub paging: PagingRequest,
}

impl InfoSearchRequest {
    /// Whether `info` satisfies every criterion except paging.
    #[must_use]
    pub fn matches(&self, info: &TimeSeriesInfo) -> bool {
        if let Some(oids) = &self.object_ids {
            match info.object_id() {
                Some(oid) if oids.contains(oid) => {}
                _ => return false,
            }
        }
        if let Some(bundle) = &self.external_ids {
            // Project the stored bundle onto the validity date, then look for
            // any requested id among the surviving identifiers.
            if !info.external_ids.intersects_on(bundle, self.validity_date) {
                return false;
            }
        }
        if let Some(source) = &self.data_source {
            if source != &info.data_source {
                return false;
            }
        }
        if let Some(provider) = &self.data_provider {
            if provider != &info.data_provider {
                return false;
            }
        }
        if let Some(field) = &self.data_field {
            if field != &info.data_field {
                return false;
            }
        }
        if let Some(time) = &self.observation_time {
            if time != &info.observation_time {
                return false;
            }
        }
        if let Some(pattern) = &self.name {
            if !glob_matches(pattern, &info.name) {
                return false;
            }
        }
        true
    }
}

/// Request for the version history of one record, paged like a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfoHistoryRequest {
    /// The record whose versions are requested.
    pub object_id: ObjectId,
    /// Requested page.
    pub paging: PagingRequest,
}

/// One page of search or history results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSearchResult {
    /// Paging metadata: the request and the total match count.
    pub paging: Paging,
    /// The requested page of documents, in stable order where the
    /// underlying storage provides one.
    pub documents: Vec<InfoDocument>,
    /// Number of matching records withheld by a permission decorator.
    /// Zero unless the result passed through one.
    pub unauthorized_count: usize,
}

impl InfoSearchResult {
    /// Assemble a result page.
    #[must_use]
    pub fn new(paging: Paging, documents: Vec<InfoDocument>) -> Self {
        Self {
            paging,
            documents,
            unauthorized_count: 0,
        }
    }
}

/// Request for the distinct metadata field values known to a master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoMetaDataRequest;

/// Distinct metadata field values, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoMetaDataResult {
    /// Distinct data sources.
    pub data_sources: Vec<String>,
    /// Distinct data providers.
    pub data_providers: Vec<String>,
    /// Distinct data fields.
    pub data_fields: Vec<String>,
    /// Distinct observation times.
    pub observation_times: Vec<String>,
}

impl InfoMetaDataResult {
    /// Union `other` into `self`, preserving first-seen order.
    pub fn merge(&mut self, other: InfoMetaDataResult) {
        fn union(into: &mut Vec<String>, from: Vec<String>) {
            for v in from {
                if !into.contains(&v) {
                    into.push(v);
                }
            }
        }
        union(&mut self.data_sources, other.data_sources);
        union(&mut self.data_providers, other.data_providers);
        union(&mut self.data_fields, other.data_fields);
        union(&mut self.observation_times, other.observation_times);
    }
}

/// Case-insensitive glob match supporting `*` and `?`.
///
/// Iterative two-pointer matcher: on a mismatch the scan backtracks to the
/// last `*`, consuming one more name character, so matching stays linear in
/// the name even for pathological patterns.
#[must_use]
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
    let n: Vec<char> = name.to_ascii_lowercase().chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((star_p, star_n)) = star {
            pi = star_p + 1;
            ni = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}
