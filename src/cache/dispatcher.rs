//! Caching dispatcher.
//!
//! Wraps a resource handler. Reads are answered from the response cache or
//! computed and stored; writes bypass the cache and invalidate every family
//! the resource kind declares.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderMap, Method, Request, StatusCode,
        header::{ACCEPT, CONTENT_TYPE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, error, instrument, warn};

use crate::application::error::ErrorReport;
use crate::util::origin::request_origin;

use super::config::CacheConfig;
use super::keys::{Family, RequestKey};
use super::response_cache::{PutOutcome, ResponseCache};
use super::store::buffer_response;

/// API resource kinds that take part in caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DatasetCollection,
    DatasetInstance,
    PlaceCollection,
    PlaceInstance,
    SubmissionCollection,
    SubmissionInstance,
    Activity,
}

/// How one resource kind participates in caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Family reads are cached under; `None` means reads are never cached.
    pub read: Option<Family>,
    /// Families a successful write must invalidate.
    pub writes: &'static [Family],
}

/// Static mapping from resource kind to cache policy.
#[derive(Debug, Clone, Copy)]
pub struct FamilyTable {
    lookup: fn(ResourceKind) -> CachePolicy,
}

impl FamilyTable {
    pub const fn new(lookup: fn(ResourceKind) -> CachePolicy) -> Self {
        Self { lookup }
    }

    /// The Shareabouts API table. Collections are cached; any write drops the
    /// collections it can change, and place or submission writes also drop the
    /// activity feed because they append to it.
    pub const fn shareabouts() -> Self {
        Self::new(shareabouts_policy)
    }

    pub fn policy(&self, kind: ResourceKind) -> CachePolicy {
        (self.lookup)(kind)
    }
}

impl Default for FamilyTable {
    fn default() -> Self {
        Self::shareabouts()
    }
}

fn shareabouts_policy(kind: ResourceKind) -> CachePolicy {
    use Family::*;

    match kind {
        ResourceKind::DatasetCollection => CachePolicy {
            read: Some(DatasetCollection),
            writes: &[DatasetCollection],
        },
        ResourceKind::DatasetInstance => CachePolicy {
            read: None,
            writes: &[DatasetCollection, PlaceCollection, SubmissionCollection, Activity],
        },
        ResourceKind::PlaceCollection => CachePolicy {
            read: Some(PlaceCollection),
            writes: &[PlaceCollection, Activity],
        },
        ResourceKind::PlaceInstance => CachePolicy {
            read: None,
            writes: &[PlaceCollection, SubmissionCollection, Activity],
        },
        ResourceKind::SubmissionCollection => CachePolicy {
            read: Some(SubmissionCollection),
            writes: &[SubmissionCollection, Activity],
        },
        ResourceKind::SubmissionInstance => CachePolicy {
            read: None,
            writes: &[SubmissionCollection, Activity],
        },
        ResourceKind::Activity => CachePolicy {
            read: Some(Activity),
            writes: &[],
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestClass {
    Read { head: bool },
    Write,
    Passthrough,
}

fn classify(method: &Method) -> RequestClass {
    match *method {
        Method::GET => RequestClass::Read { head: false },
        Method::HEAD => RequestClass::Read { head: true },
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE => RequestClass::Write,
        _ => RequestClass::Passthrough,
    }
}

/// Only complete, successful, session-free responses are stored.
pub fn should_store_response(response: &Response) -> bool {
    if !response.status().is_success() {
        return false;
    }

    if response.headers().contains_key(SET_COOKIE) {
        return false;
    }

    !response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
}

/// Raw header bytes, so values outside UTF-8 never collapse together.
fn header_bytes(headers: &HeaderMap, name: axum::http::HeaderName) -> &[u8] {
    headers
        .get(name)
        .map(|value| value.as_bytes())
        .unwrap_or_default()
}

pub struct CachingDispatcher {
    cache: ResponseCache,
    config: CacheConfig,
    table: FamilyTable,
}

impl CachingDispatcher {
    pub fn new(cache: ResponseCache, config: CacheConfig, table: FamilyTable) -> Self {
        Self {
            cache,
            config,
            table,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Serve `request` for a resource of `kind`, calling `compute` when the
    /// cache cannot answer.
    #[instrument(
        skip_all,
        fields(kind = ?kind, method = %request.method(), path = %request.uri().path())
    )]
    pub async fn dispatch<F, Fut>(
        &self,
        kind: ResourceKind,
        request: Request<Body>,
        compute: F,
    ) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        if !self.config.enabled {
            return compute(request).await;
        }

        let policy = self.table.policy(kind);
        match classify(request.method()) {
            RequestClass::Read { head } => match policy.read {
                Some(family) => self.serve_read(family, head, request, compute).await,
                None => compute(request).await,
            },
            RequestClass::Write => {
                let response = compute(request).await;
                if response.status().is_success() {
                    self.invalidate(policy.writes);
                }
                response
            }
            RequestClass::Passthrough => compute(request).await,
        }
    }

    async fn serve_read<F, Fut>(
        &self,
        family: Family,
        head: bool,
        request: Request<Body>,
        compute: F,
    ) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let origin = request_origin(request.headers(), request.uri());
        let accept = header_bytes(request.headers(), ACCEPT);
        let key = RequestKey {
            origin: &origin,
            path: request.uri().path(),
            query: request.uri().query().unwrap_or(""),
            accept,
        }
        .to_cache_key(family);

        match self.cache.get(&key) {
            Ok(Some(cached)) => {
                counter!("shareabouts_cache_hit_total", "family" => family.as_str()).increment(1);
                debug!(
                    cache = "response",
                    outcome = "hit",
                    family = %family,
                    "serving cached response"
                );
                return cached.into_response();
            }
            Ok(None) => {}
            Err(err) => {
                warn!(family = %family, error = %err, "cache read failed; recomputing");
            }
        }

        counter!("shareabouts_cache_miss_total", "family" => family.as_str()).increment(1);
        debug!(cache = "response", outcome = "miss", family = %family, "executing handler");

        let generation = self.cache.generation(family);
        let response = compute(request).await;

        if head || !should_store_response(&response) {
            return response;
        }

        let (response, cached) = match buffer_response(response).await {
            Ok(buffered) => buffered,
            Err((_, err)) => {
                let mut failed = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                ErrorReport::from_error("cache::dispatcher::buffer", failed.status(), &err)
                    .attach(&mut failed);
                return failed;
            }
        };

        match self.cache.put_if_current(key, cached, family, generation) {
            Ok(PutOutcome::Stored) => {
                debug!(cache = "response", family = %family, "cached response");
            }
            Ok(PutOutcome::Stale) => {}
            Err(err) => {
                counter!("shareabouts_cache_store_failed_total").increment(1);
                warn!(family = %family, error = %err, "failed to cache response; serving uncached");
            }
        }

        response
    }

    fn invalidate(&self, families: &[Family]) {
        for family in families {
            if let Err(err) = self.cache.invalidate_family(*family) {
                counter!("shareabouts_cache_invalidate_failed_total", "family" => family.as_str())
                    .increment(1);
                error!(
                    family = %family,
                    error = %err,
                    "failed to invalidate cache family after write"
                );
            }
        }
    }
}

/// Router state for one cached route.
#[derive(Clone)]
pub struct CachedRoute {
    pub dispatcher: Arc<CachingDispatcher>,
    pub kind: ResourceKind,
}

impl CachedRoute {
    pub fn new(dispatcher: Arc<CachingDispatcher>, kind: ResourceKind) -> Self {
        Self { dispatcher, kind }
    }
}

/// Route layer running the dispatcher in front of the route's handlers.
pub async fn response_cache_layer(
    State(route): State<CachedRoute>,
    request: Request<Body>,
    next: Next,
) -> Response {
    route
        .dispatcher
        .dispatch(route.kind, request, move |request| next.run(request))
        .await
}
