//! Shared response cache with family invalidation.
//!
//! Store writes and family bookkeeping happen under one short critical
//! section, so `put` and `invalidate_family` are linearizable: once an
//! invalidation returns, no entry registered before it is reachable.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use metrics::{counter, gauge};
use tracing::{debug, error};

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::{CacheKey, Family};
use super::lock::mutex_lock;
use super::registry::{FamilyIndex, Generation};
use super::store::{CachedResponse, MemoryStore, ResponseStore};

/// Outcome of a generation-checked store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// The family was invalidated after the response was computed.
    Stale,
}

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn ResponseStore>,
    index: Arc<Mutex<FamilyIndex>>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn ResponseStore>) -> Self {
        Self {
            store,
            index: Arc::new(Mutex::new(FamilyIndex::new())),
        }
    }

    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new(config)))
    }

    pub fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError> {
        self.store.get(key)
    }

    /// Current generation of `family`; pass it back to [`Self::put_if_current`].
    pub fn generation(&self, family: Family) -> Generation {
        mutex_lock(&self.index, "cache.generation").generation(family)
    }

    /// Store unconditionally and register the key under `family`.
    pub fn put(
        &self,
        key: CacheKey,
        response: CachedResponse,
        family: Family,
    ) -> Result<(), CacheError> {
        let mut index = mutex_lock(&self.index, "cache.put");
        self.store_locked(&mut index, key, response, family)
    }

    /// Store only if no invalidation of `family` happened since `observed`
    /// was read.
    pub fn put_if_current(
        &self,
        key: CacheKey,
        response: CachedResponse,
        family: Family,
        observed: Generation,
    ) -> Result<PutOutcome, CacheError> {
        let mut index = mutex_lock(&self.index, "cache.put_if_current");
        if index.generation(family) != observed {
            debug!(
                family = %family,
                observed,
                current = index.generation(family),
                "discarding response computed before invalidation"
            );
            return Ok(PutOutcome::Stale);
        }
        self.store_locked(&mut index, key, response, family)?;
        Ok(PutOutcome::Stored)
    }

    fn store_locked(
        &self,
        index: &mut FamilyIndex,
        key: CacheKey,
        response: CachedResponse,
        family: Family,
    ) -> Result<(), CacheError> {
        let evicted = self.store.set(key.clone(), response)?;
        index.register(key, family);
        if let Some(evicted) = evicted {
            counter!("shareabouts_cache_evict_total").increment(1);
            index.forget(&evicted);
        }
        gauge!("shareabouts_cache_entries").set(self.store.len() as f64);
        Ok(())
    }

    /// Remove every key cached under `family` and clear its set.
    ///
    /// Returns how many keys were removed. Keys that could not be removed
    /// stay registered so the next invalidation retries them.
    pub fn invalidate_family(&self, family: Family) -> Result<usize, CacheError> {
        let mut index = mutex_lock(&self.index, "cache.invalidate_family");
        let keys = index.drain(family);

        let mut removed = 0;
        let mut failures = Vec::new();
        for key in keys {
            match self.store.remove(&key) {
                Ok(()) => removed += 1,
                Err(err) => failures.push((key, err)),
            }
        }

        counter!("shareabouts_cache_invalidate_total", "family" => family.as_str()).increment(1);
        gauge!("shareabouts_cache_entries").set(self.store.len() as f64);

        if failures.is_empty() {
            debug!(family = %family, removed, "invalidated cache family");
            return Ok(removed);
        }

        let failed = failures.len();
        let message = failures
            .first()
            .map(|(_, err)| err.to_string())
            .unwrap_or_default();
        let failed_keys: Vec<String> = failures.iter().map(|(key, _)| key.to_string()).collect();
        for (key, _) in failures {
            index.register(key, family);
        }
        error!(
            family = %family,
            removed,
            failed,
            keys = ?failed_keys,
            detail = %message,
            "cache invalidation incomplete; stale responses may be served"
        );
        Err(CacheError::Invalidation {
            family,
            failed,
            message,
        })
    }

    pub fn keys_for_family(&self, family: Family) -> HashSet<CacheKey> {
        mutex_lock(&self.index, "cache.keys_for_family").keys_for_family(family)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
