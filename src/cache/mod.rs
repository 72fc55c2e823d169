//! Shareabouts response cache.
//!
//! Caches complete HTTP responses of collection views and drops them by
//! family when a write changes the underlying data.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! response_limit = 1000
//! ```

mod config;
mod dispatcher;
mod error;
mod keys;
mod lock;
mod registry;
mod response_cache;
mod store;

pub use config::CacheConfig;
pub use dispatcher::{
    CachePolicy, CachedRoute, CachingDispatcher, FamilyTable, ResourceKind,
    response_cache_layer, should_store_response,
};
pub use error::CacheError;
pub use keys::{CacheKey, Family, RequestKey};
pub use registry::{FamilyIndex, Generation};
pub use response_cache::{PutOutcome, ResponseCache};
pub use store::{CachedResponse, MemoryStore, ResponseStore, buffer_response};
