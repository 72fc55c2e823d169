//! Family index.
//!
//! Tracks which cache keys were stored under each family so a write can drop
//! all of them at once, plus the reverse mapping so evicted keys can be
//! forgotten.

use std::collections::{HashMap, HashSet};

use super::keys::{CacheKey, Family};

/// Monotonic counter bumped by every invalidation of a family.
///
/// A reader captures it before computing a response; a store carrying an
/// older generation lost a race with a write and is discarded.
pub type Generation = u64;

#[derive(Debug, Default)]
struct FamilySlot {
    generation: Generation,
    keys: HashSet<CacheKey>,
}

/// Bidirectional family <-> key bookkeeping. Not synchronized on its own;
/// `ResponseCache` guards it together with the store writes.
#[derive(Debug, Default)]
pub struct FamilyIndex {
    families: HashMap<Family, FamilySlot>,
    key_to_family: HashMap<CacheKey, Family>,
}

impl FamilyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self, family: Family) -> Generation {
        self.families
            .get(&family)
            .map(|slot| slot.generation)
            .unwrap_or_default()
    }

    /// Record `key` as cached under `family`. A key belongs to one family.
    pub fn register(&mut self, key: CacheKey, family: Family) {
        if let Some(previous) = self.key_to_family.insert(key.clone(), family)
            && previous != family
            && let Some(slot) = self.families.get_mut(&previous)
        {
            slot.keys.remove(&key);
        }
        self.families.entry(family).or_default().keys.insert(key);
    }

    /// Drop a key that left the store without an invalidation (eviction).
    pub fn forget(&mut self, key: &CacheKey) {
        if let Some(family) = self.key_to_family.remove(key)
            && let Some(slot) = self.families.get_mut(&family)
        {
            slot.keys.remove(key);
        }
    }

    /// Bump the family generation and take its key set, leaving the family
    /// present with an empty set.
    pub fn drain(&mut self, family: Family) -> HashSet<CacheKey> {
        let slot = self.families.entry(family).or_default();
        slot.generation += 1;
        let keys = std::mem::take(&mut slot.keys);
        for key in &keys {
            self.key_to_family.remove(key);
        }
        keys
    }

    pub fn keys_for_family(&self, family: Family) -> HashSet<CacheKey> {
        self.families
            .get(&family)
            .map(|slot| slot.keys.clone())
            .unwrap_or_default()
    }

    pub fn family_for_key(&self, key: &CacheKey) -> Option<Family> {
        self.key_to_family.get(key).copied()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_family.len()
    }
}
