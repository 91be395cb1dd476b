//! Archivio-specific configuration primitives shared across the workspace.
#![warn(missing_docs)]

mod config;
mod permission;
mod rating;

pub use config::{MasterCacheConfig, ResolverCacheConfig};
pub use permission::{Operation, PermissionConfig, PrincipalGrants};
pub use rating::{RatingConfig, RatingField, RatingRuleConfig, WILDCARD};
