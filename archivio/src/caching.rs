//! Adaptive caching decorator for a [`Resolver`].
//!
//! Two key spaces:
//!
//! - **Fine**: one entry per `(external id, field, source, provider,
//!   resolution key, validity date)` combination, holding the full outcome
//!   including misses. Keying per identifier rather than per bundle lets
//!   overlapping bundles share hits.
//! - **Coarse**: `(source, provider, field)` → known-present/known-absent.
//!   Consulted only in pessimistic mode, where it short-circuits whole
//!   classes of hopeless lookups before the store is touched.
//!
//! The mode adapts to the observed hit ratio: a signed counter moves up on
//! hits and down on misses; every `flip_window` observations it is reset
//! and, past the configured thresholds, the mode flips. The counters are
//! atomic but deliberately not linearizable; they feed a heuristic, not a
//! correctness decision.
//!
//! Entries carry no TTL. Invalidation piggybacks on the master's change
//! generation, checked on every call; any change drops both caches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache;

use archivio_core::{ArchivioError, ExternalId, ResolutionResult, TimeSeriesMaster};
use archivio_types::ResolverCacheConfig;

use crate::resolver::{ResolutionRequest, Resolver};

const COARSE_CAPACITY: u64 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FineKey {
    id: ExternalId,
    field: String,
    source: Option<String>,
    provider: Option<String>,
    resolution_key: Option<String>,
    validity_date: Option<NaiveDate>,
}

impl FineKey {
    fn of(req: &ResolutionRequest, id: ExternalId) -> Self {
        Self {
            id,
            field: req.data_field.clone(),
            source: req.data_source.clone(),
            provider: req.data_provider.clone(),
            resolution_key: req.resolution_key.clone(),
            validity_date: req.validity_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CoarseKey {
    source: Option<String>,
    provider: Option<String>,
    field: String,
}

impl CoarseKey {
    fn of(req: &ResolutionRequest) -> Self {
        Self {
            source: req.data_source.clone(),
            provider: req.data_provider.clone(),
            field: req.data_field.clone(),
        }
    }
}

/// Caching decorator over any [`Resolver`].
pub struct CachingResolver {
    inner: Arc<dyn Resolver>,
    master: Arc<dyn TimeSeriesMaster>,
    fine: Cache<FineKey, Option<ResolutionResult>>,
    coarse: Cache<CoarseKey, bool>,
    pessimistic: AtomicBool,
    net: AtomicI64,
    observations: AtomicU64,
    generation: AtomicU64,
    config: ResolverCacheConfig,
}

impl CachingResolver {
    /// Wrap `inner`. `master` supplies the change generation that drives
    /// invalidation; pass the same master the resolver queries.
    #[must_use]
    pub fn new(
        inner: Arc<dyn Resolver>,
        master: Arc<dyn TimeSeriesMaster>,
        config: ResolverCacheConfig,
    ) -> Self {
        let generation = AtomicU64::new(master.change_generation());
        Self {
            inner,
            fine: Cache::new(config.max_entries),
            coarse: Cache::new(COARSE_CAPACITY),
            pessimistic: AtomicBool::new(false),
            net: AtomicI64::new(0),
            observations: AtomicU64::new(0),
            generation,
            config,
            master,
        }
    }

    /// Whether the resolver currently runs in pessimistic mode.
    #[must_use]
    pub fn is_pessimistic(&self) -> bool {
        self.pessimistic.load(Ordering::Relaxed)
    }

    fn sync_generation(&self) {
        let current = self.master.change_generation();
        if self.generation.swap(current, Ordering::AcqRel) != current {
            self.fine.invalidate_all();
            self.coarse.invalidate_all();
        }
    }

    /// Feed one observation into the adaptive counter, flipping the mode at
    /// window boundaries.
    fn record(&self, hit: bool) {
        self.net
            .fetch_add(if hit { 1 } else { -1 }, Ordering::Relaxed);
        let seen = self.observations.fetch_add(1, Ordering::Relaxed) + 1;
        let window = self.config.flip_window;
        if window == 0 || seen % window != 0 {
            return;
        }
        let net = self.net.swap(0, Ordering::Relaxed);
        if net < self.config.pessimistic_below {
            self.pessimistic.store(true, Ordering::Relaxed);
        } else if net > self.config.optimistic_above {
            self.pessimistic.store(false, Ordering::Relaxed);
        }
    }

    fn requested_keys(&self, req: &ResolutionRequest) -> Vec<FineKey> {
        req.bundle
            .as_ref()
            .map(|bundle| {
                bundle
                    .ids_valid_on(req.validity_date)
                    .into_iter()
                    .map(|id| FineKey::of(req, id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Populate positive entries for every identifier of the resolved
    /// record that is valid on the requested date, crossed with the
    /// resolved source and provider and their wildcard variants, so
    /// partially-specified follow-ups still hit.
    async fn fan_out(&self, req: &ResolutionRequest, result: &ResolutionResult) {
        let Some(info) = result.info() else { return };
        let source = Some(info.data_source.clone());
        let provider = Some(info.data_provider.clone());
        let variants: [(Option<String>, Option<String>); 4] = [
            (source.clone(), provider.clone()),
            (None, provider),
            (source, None),
            (None, None),
        ];
        for dated in info.external_ids.iter() {
            if !dated.is_valid_on(req.validity_date) {
                continue;
            }
            for (source, provider) in &variants {
                let key = FineKey {
                    id: dated.id().clone(),
                    field: req.data_field.clone(),
                    source: source.clone(),
                    provider: provider.clone(),
                    resolution_key: req.resolution_key.clone(),
                    validity_date: req.validity_date,
                };
                self.fine.insert(key, Some(result.clone())).await;
            }
        }
    }

    async fn remember_misses(&self, keys: Vec<FineKey>) {
        for key in keys {
            self.fine.insert(key, None).await;
        }
    }

    /// Coarse presence fact for the request's triple, resolving and caching
    /// it when unknown.
    async fn triple_present(&self, req: &ResolutionRequest) -> Result<bool, ArchivioError> {
        let key = CoarseKey::of(req);
        if let Some(present) = self.coarse.get(&key).await {
            return Ok(present);
        }
        let probe = ResolutionRequest {
            bundle: None,
            ..req.clone()
        };
        let present = self.inner.resolve(&probe).await?.is_some();
        self.coarse.insert(key, present).await;
        Ok(present)
    }
}

#[async_trait]
impl Resolver for CachingResolver {
    async fn resolve(
        &self,
        req: &ResolutionRequest,
    ) -> Result<Option<ResolutionResult>, ArchivioError> {
        self.sync_generation();

        if req.bundle.is_none() {
            // Existence-only queries are the coarse facts themselves.
            let key = CoarseKey::of(req);
            if let Some(present) = self.coarse.get(&key).await {
                return Ok(present.then(ResolutionResult::exists));
            }
            let outcome = self.inner.resolve(req).await?;
            self.coarse.insert(key, outcome.is_some()).await;
            return Ok(outcome);
        }

        let keys = self.requested_keys(req);
        let mut all_negative = !keys.is_empty();
        for key in &keys {
            match self.fine.get(key).await {
                Some(Some(result)) => {
                    self.record(true);
                    return Ok(Some(result));
                }
                Some(None) => {}
                None => all_negative = false,
            }
        }
        if all_negative {
            self.record(false);
            return Ok(None);
        }

        if self.is_pessimistic() && !self.triple_present(req).await? {
            self.remember_misses(keys).await;
            self.record(false);
            return Ok(None);
        }

        match self.inner.resolve(req).await? {
            Some(result) => {
                self.coarse.insert(CoarseKey::of(req), true).await;
                self.fan_out(req, &result).await;
                self.record(true);
                Ok(Some(result))
            }
            None => {
                self.remember_misses(keys).await;
                self.record(false);
                Ok(None)
            }
        }
    }
}
