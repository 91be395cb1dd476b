//! Decorators over a single [`TimeSeriesMaster`].
//!
//! - [`CachingMaster`] keeps a document cache plus search/history result
//!   fingerprints, invalidated through the master's change generation.
//! - [`PermissionedMaster`] enforces operation- and record-level
//!   authorization, filtering bulk results silently.
//!
//! Decorators compose: wrap a master in a `PermissionedMaster`, then cache
//! the authorized view, or the other way around to share one cache across
//! principals.
//!
//! [`TimeSeriesMaster`]: archivio_core::TimeSeriesMaster

pub mod cache;
pub mod permission;

pub use cache::CachingMaster;
pub use permission::{ConfigPermissionChecker, PermissionChecker, PermissionedMaster};
