//! archivio
//!
//! Historical time-series resolution and master composition.
//!
//! The crate turns loose lookup criteria, an identifier bundle plus
//! optional source, provider, field, and rating key, into exactly one
//! stored record:
//!
//! - [`RatingEngine`]: scores candidate records against configured rules
//!   and picks the best one.
//! - [`FieldAdjustmentMap`]: maps a logical request field onto the
//!   underlying stored triple, with an optional value adjuster.
//! - [`TimeSeriesResolver`]: candidate search + adjustment + rating.
//! - [`CachingResolver`]: adaptive optimistic/pessimistic caching over any
//!   [`Resolver`].
//! - [`SchemeDelegatingMaster`] / [`CombinedMaster`]: routing and fan-out
//!   composition of several masters.
//!
//! Storage adapters implement [`TimeSeriesMaster`] from `archivio-core`;
//! the caching and authorization decorators live in `archivio-middleware`
//! and are re-exported here.
#![warn(missing_docs)]

/// Field adjustments and the adjustment map.
pub mod adjustment;
/// Adaptive caching decorator for resolvers.
pub mod caching;
/// Fan-out view over several masters.
pub mod combined;
/// Scheme-based routing across several masters.
pub mod delegating;
/// Rating policies and candidate selection.
pub mod rating;
/// The resolver trait and its canonical implementation.
pub mod resolver;

pub use adjustment::{FieldAdjustment, FieldAdjustmentMap};
pub use caching::CachingResolver;
pub use combined::CombinedMaster;
pub use delegating::SchemeDelegatingMaster;
pub use rating::{DEFAULT_POLICY, RatingEngine, RatingPolicy};
pub use resolver::{ResolutionRequest, Resolver, TimeSeriesResolver};

pub use archivio_core::{
    ArchivioError, BulkGetResult, ChangeEvent, ChangeKind, ChangeManager, ExternalId,
    ExternalIdBundle, ExternalIdWithDates, ExternalScheme, InfoDocument, InfoHistoryRequest,
    InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest, InfoSearchResult, ObjectId, Paging,
    PagingRequest, PointSeries, ResolutionResult, SeriesAdjuster, SeriesGetRequest, TimeSeriesInfo,
    TimeSeriesMaster, UniqueId,
};
pub use archivio_middleware::{
    CachingMaster, ConfigPermissionChecker, PermissionChecker, PermissionedMaster,
};
pub use archivio_types::{
    MasterCacheConfig, Operation, PermissionConfig, PrincipalGrants, RatingConfig, RatingField,
    RatingRuleConfig, ResolverCacheConfig, WILDCARD,
};
