//! Rating-based selection of one metadata record among many candidates.

use std::collections::HashMap;

use tracing::warn;

use archivio_core::{ArchivioError, TimeSeriesInfo};
use archivio_types::{RatingConfig, RatingField, WILDCARD};

/// Policy name used when a resolution carries no explicit key.
pub const DEFAULT_POLICY: &str = "DEFAULT";

/// A compiled rating policy: per-field weight tables with wildcard fallback.
///
/// `score(info)` is the product of the source weight and the provider
/// weight. Field groups with no rules at all contribute weight 1.
#[derive(Debug, Clone)]
pub struct RatingPolicy {
    sources: HashMap<String, u32>,
    providers: HashMap<String, u32>,
}

impl RatingPolicy {
    /// Compile `config` into a policy.
    ///
    /// # Errors
    /// `Config` if a non-empty field group lacks a wildcard rule; without it
    /// scoring would be undefined for unanticipated values.
    pub fn from_config(config: &RatingConfig) -> Result<Self, ArchivioError> {
        let mut sources = HashMap::new();
        let mut providers = HashMap::new();
        for rule in &config.rules {
            let table = match rule.field {
                RatingField::DataSource => &mut sources,
                RatingField::DataProvider => &mut providers,
            };
            table.insert(rule.value.clone(), rule.weight);
        }
        for (field, table) in [("data_source", &sources), ("data_provider", &providers)] {
            if !table.is_empty() && !table.contains_key(WILDCARD) {
                return Err(ArchivioError::config(format!(
                    "rating policy {}: {field} rules lack a wildcard",
                    config.name
                )));
            }
        }
        Ok(Self { sources, providers })
    }

    fn weight(table: &HashMap<String, u32>, value: &str) -> u64 {
        if table.is_empty() {
            return 1;
        }
        // Construction guarantees the wildcard entry exists.
        u64::from(
            table
                .get(value)
                .or_else(|| table.get(WILDCARD))
                .copied()
                .unwrap_or(0),
        )
    }

    /// The candidate's score under this policy.
    #[must_use]
    pub fn score(&self, info: &TimeSeriesInfo) -> u64 {
        Self::weight(&self.sources, &info.data_source)
            * Self::weight(&self.providers, &info.data_provider)
    }
}

/// Holds named [`RatingPolicy`] instances and picks the best candidate.
#[derive(Debug, Clone, Default)]
pub struct RatingEngine {
    policies: HashMap<String, RatingPolicy>,
}

impl RatingEngine {
    /// An engine with no policies. Single-candidate selection still works.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every config into the engine, keyed by policy name.
    ///
    /// # Errors
    /// Propagates the first policy compilation failure.
    pub fn from_configs<I>(configs: I) -> Result<Self, ArchivioError>
    where
        I: IntoIterator<Item = RatingConfig>,
    {
        let mut engine = Self::new();
        for config in configs {
            let policy = RatingPolicy::from_config(&config)?;
            engine.policies.insert(config.name, policy);
        }
        Ok(engine)
    }

    /// Register `policy` under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, policy: RatingPolicy) {
        self.policies.insert(name.into(), policy);
    }

    /// Pick the best candidate.
    ///
    /// Zero candidates give `None`; exactly one is returned without any
    /// policy lookup. With several, the policy named by `policy_key`
    /// (default [`DEFAULT_POLICY`]) scores them all and the maximum wins;
    /// a missing policy is logged and yields `None`. Equal top scores keep
    /// the first-encountered candidate, which callers must treat as
    /// unspecified.
    #[must_use]
    pub fn select(
        &self,
        candidates: Vec<TimeSeriesInfo>,
        policy_key: Option<&str>,
    ) -> Option<TimeSeriesInfo> {
        if candidates.len() <= 1 {
            return candidates.into_iter().next();
        }
        let key = policy_key.unwrap_or(DEFAULT_POLICY);
        let Some(policy) = self.policies.get(key) else {
            warn!(policy = key, "rating policy not configured; cannot disambiguate candidates");
            return None;
        };
        let mut best: Option<(u64, TimeSeriesInfo)> = None;
        for candidate in candidates {
            let score = policy.score(&candidate);
            match &best {
                Some((top, _)) if *top >= score => {}
                _ => best = Some((score, candidate)),
            }
        }
        best.map(|(_, info)| info)
    }
}
