//! Static authorization configuration for the permissioned master decorator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Master operations subject to the static operation-level permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// All read operations: get, bulk get, search, history, meta-data,
    /// point-series reads.
    View,
    /// Adding a new document.
    Add,
    /// Updating a document or appending data points.
    Update,
    /// Correcting a document or data points.
    Correct,
    /// Removing a document or data points.
    Remove,
}

/// Grants for one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalGrants {
    /// Operations the principal may invoke.
    pub operations: Vec<Operation>,
    /// Data sources whose records are hidden from the principal.
    #[serde(default)]
    pub denied_sources: Vec<String>,
}

/// Declarative permission policy keyed by principal name.
///
/// Principals absent from the map are denied every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Per-principal grants.
    pub principals: HashMap<String, PrincipalGrants>,
}

impl PermissionConfig {
    /// Whether `principal` may invoke `op` at all.
    #[must_use]
    pub fn allows_operation(&self, principal: &str, op: Operation) -> bool {
        self.principals
            .get(principal)
            .is_some_and(|g| g.operations.contains(&op))
    }

    /// Whether `principal` may see records from `data_source`.
    #[must_use]
    pub fn allows_source(&self, principal: &str, data_source: &str) -> bool {
        self.principals
            .get(principal)
            .is_some_and(|g| !g.denied_sources.iter().any(|s| s == data_source))
    }
}
