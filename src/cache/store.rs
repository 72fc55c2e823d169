//! Response storage.
//!
//! `ResponseStore` is the seam for the concrete key-value backend. The
//! default `MemoryStore` is a bounded LRU; evictions are silent, which every
//! caller must tolerate as an ordinary miss.

use std::sync::RwLock;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use lru::LruCache;

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

/// Everything needed to replay a response byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    /// Header pairs in their original order, duplicates included.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

/// Collect a response body so it can be both stored and returned.
///
/// On failure the returned response has an empty body and the error says why.
pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            Ok((Response::from_parts(parts, Body::from(bytes)), cached))
        }
        Err(error) => Err((
            Response::from_parts(parts, Body::empty()),
            CacheError::store(format!("failed to buffer response body: {error}")),
        )),
    }
}

/// Key-value backend holding cached responses.
///
/// `ResponseCache` calls `set` and `remove` while holding its family index
/// lock. Implementations must not block or wait on network I/O.
pub trait ResponseStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError>;

    /// Store `response`, overwriting any previous value. Returns the key
    /// evicted to make room, if any.
    fn set(&self, key: CacheKey, response: CachedResponse)
    -> Result<Option<CacheKey>, CacheError>;

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process LRU store bounded by `CacheConfig::response_limit`.
pub struct MemoryStore {
    responses: RwLock<LruCache<CacheKey, CachedResponse>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.response_limit_non_zero())),
        }
    }
}

impl ResponseStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError> {
        Ok(rw_write(&self.responses, "store.get").get(key).cloned())
    }

    fn set(
        &self,
        key: CacheKey,
        response: CachedResponse,
    ) -> Result<Option<CacheKey>, CacheError> {
        let evicted = rw_write(&self.responses, "store.set")
            .push(key.clone(), response)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        Ok(evicted)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        rw_write(&self.responses, "store.remove").pop(key);
        Ok(())
    }

    fn len(&self) -> usize {
        rw_read(&self.responses, "store.len").len()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::{CONTENT_TYPE, SET_COOKIE};

    use super::*;

    fn sample(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: StatusCode::OK,
            headers: vec![(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn memory_store_roundtrip_and_remove() {
        let store = MemoryStore::new(&CacheConfig::default());
        let key = CacheKey::build("activity", "", "");

        assert!(store.get(&key).expect("read").is_none());
        store.set(key.clone(), sample("[]")).expect("write");
        assert_eq!(store.get(&key).expect("read"), Some(sample("[]")));

        store.remove(&key).expect("remove");
        assert!(store.get(&key).expect("read").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn overwrite_is_not_reported_as_eviction() {
        let store = MemoryStore::new(&CacheConfig::default());
        let key = CacheKey::build("activity", "", "");

        assert!(store.set(key.clone(), sample("[1]")).expect("write").is_none());
        assert!(store.set(key.clone(), sample("[2]")).expect("write").is_none());
        assert_eq!(store.get(&key).expect("read"), Some(sample("[2]")));
    }

    #[test]
    fn lru_bound_evicts_least_recent() {
        let config = CacheConfig {
            response_limit: 2,
            ..Default::default()
        };
        let store = MemoryStore::new(&config);
        let k1 = CacheKey::build("a", "1", "");
        let k2 = CacheKey::build("a", "2", "");
        let k3 = CacheKey::build("a", "3", "");

        store.set(k1.clone(), sample("1")).expect("write");
        store.set(k2.clone(), sample("2")).expect("write");
        let evicted = store.set(k3.clone(), sample("3")).expect("write");

        assert_eq!(evicted, Some(k1.clone()));
        assert!(store.get(&k1).expect("read").is_none());
        assert!(store.get(&k3).expect("read").is_some());
    }

    #[test]
    fn replay_preserves_header_order_and_duplicates() {
        let cached = CachedResponse {
            status: StatusCode::CREATED,
            headers: vec![
                (SET_COOKIE, HeaderValue::from_static("a=1")),
                (CONTENT_TYPE, HeaderValue::from_static("text/plain")),
                (SET_COOKIE, HeaderValue::from_static("b=2")),
            ],
            body: Bytes::from_static(b"hello"),
        };

        let response = cached.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn buffer_response_captures_body() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"id\":1}"))
            .expect("response");

        let (rebuilt, cached) = buffer_response(response).await.expect("buffered");
        assert_eq!(cached.body, Bytes::from_static(b"{\"id\":1}"));
        assert_eq!(cached.status, StatusCode::OK);

        let bytes = rebuilt.into_body().collect().await.expect("body").to_bytes();
        assert_eq!(bytes, cached.body);
    }
}
