//! Cache key and family definitions.
//!
//! Keys are derived from the request components that can change a cached
//! representation. Families group keys that are invalidated together.

use std::fmt;

use sha2::{Digest, Sha256};

/// A named group of cache keys invalidated together, one per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    DatasetCollection,
    PlaceCollection,
    SubmissionCollection,
    Activity,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::DatasetCollection,
        Family::PlaceCollection,
        Family::SubmissionCollection,
        Family::Activity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Family::DatasetCollection => "dataset_collection",
            Family::PlaceCollection => "place_collection",
            Family::SubmissionCollection => "submission_collection",
            Family::Activity => "activity",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque key of a cached response.
///
/// Built from a fixed-order, length-prefixed list of components and hashed,
/// so `("a=1", "json")` and `("a=1j", "son")` never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a view prefix, raw query string and raw Accept header.
    pub fn build(prefix: &str, query_string: &str, accept: &str) -> Self {
        Self::from_components(&[
            prefix.as_bytes(),
            query_string.as_bytes(),
            accept.as_bytes(),
        ])
    }

    /// Key over an arbitrary ordered component list. Components are raw
    /// bytes so header values outside UTF-8 stay distinct.
    pub fn from_components(components: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for component in components {
            hasher.update((component.len() as u64).to_be_bytes());
            hasher.update(component);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request components that select one cached representation.
#[derive(Debug, Clone, Default)]
pub struct RequestKey<'a> {
    /// `scheme://host` the request was addressed to.
    pub origin: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    /// Raw Accept header bytes; empty when absent.
    pub accept: &'a [u8],
}

impl RequestKey<'_> {
    /// Absolutized URLs embed the origin, and several routes share a family,
    /// so both origin and path take part in the key.
    pub fn to_cache_key(&self, family: Family) -> CacheKey {
        CacheKey::from_components(&[
            family.as_str().as_bytes(),
            self.origin.as_bytes(),
            self.path.as_bytes(),
            self.query.as_bytes(),
            self.accept,
        ])
    }
}
