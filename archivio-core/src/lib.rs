//! archivio-core
//!
//! Core types and contracts shared across the archivio ecosystem.
//!
//! - `ident`: external identifiers, bundles, and record identity.
//! - `series`: the date-keyed point series and its merge algebra.
//! - `document`: metadata documents and search/history request types.
//! - `master`: the `TimeSeriesMaster` system-of-record trait.
//! - `change`: the change-notification hub masters publish to.
//! - `resolution`: resolution results and series adjusters.
//!
//! Async runtime (Tokio)
//! ---------------------
//! This crate assumes the Tokio ecosystem as the async runtime: the master
//! trait is an `async_trait` contract and `ChangeManager` is built on
//! `tokio::sync::broadcast`. Code driving a master must run under a Tokio
//! 1.x runtime.
#![warn(missing_docs)]

/// Change notifications published by masters.
pub mod change;
/// Metadata documents and search request types.
pub mod document;
mod error;
/// External identifiers and record identity.
pub mod ident;
/// The system-of-record trait.
pub mod master;
/// Paging of search results.
pub mod paging;
/// Resolution results and series adjusters.
pub mod resolution;
/// Point series and the merge algebra.
pub mod series;

pub use change::{ChangeEvent, ChangeKind, ChangeManager};
pub use document::{
    InfoDocument, InfoHistoryRequest, InfoMetaDataRequest, InfoMetaDataResult, InfoSearchRequest,
    InfoSearchResult, TimeSeriesInfo, glob_matches,
};
pub use error::ArchivioError;
pub use ident::{
    ExternalId, ExternalIdBundle, ExternalIdWithDates, ExternalScheme, ObjectId, UniqueId,
};
pub use master::{BulkGetResult, SeriesGetRequest, TimeSeriesMaster};
pub use paging::{Paging, PagingRequest};
pub use resolution::{ResolutionResult, SeriesAdjuster};
pub use series::PointSeries;
pub use series::merge::{remove_range, union_no_intersect, union_second_wins};
