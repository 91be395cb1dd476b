//! Configuration for rating-based candidate selection.

use serde::{Deserialize, Serialize};

/// Rule value that matches any field value not covered by an exact rule.
pub const WILDCARD: &str = "*";

/// The metadata field a rating rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingField {
    /// Rules matched against a record's data source.
    DataSource,
    /// Rules matched against a record's data provider.
    DataProvider,
}

/// A single weighted rule inside a rating policy.
///
/// `value` is either an exact string or [`WILDCARD`]. Every policy must carry
/// a wildcard rule for each field it rates; scoring a value with no matching
/// rule and no wildcard is a fatal misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRuleConfig {
    /// Field this rule applies to.
    pub field: RatingField,
    /// Exact field value, or [`WILDCARD`].
    pub value: String,
    /// Weight contributed when this rule matches.
    pub weight: u32,
}

impl RatingRuleConfig {
    /// Build a rule in one expression.
    pub fn new(field: RatingField, value: impl Into<String>, weight: u32) -> Self {
        Self {
            field,
            value: value.into(),
            weight,
        }
    }
}

/// A named set of rating rules, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Policy name, looked up by the resolution key.
    pub name: String,
    /// The rules; order is irrelevant, rules are indexed by field at build time.
    pub rules: Vec<RatingRuleConfig>,
}

impl RatingConfig {
    /// Build a named policy configuration from rules.
    pub fn new(name: impl Into<String>, rules: Vec<RatingRuleConfig>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}
