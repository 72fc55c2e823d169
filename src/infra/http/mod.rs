pub mod api;
mod middleware;
pub mod proxy;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;
pub use proxy::{ProxyState, build_proxy_router};

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware};

use crate::cache::CachingDispatcher;

/// The complete service: resource API, optional front end proxy, and the
/// shared logging and request-context middleware.
pub fn build_router(
    state: ApiState,
    dispatcher: Arc<CachingDispatcher>,
    proxy: Option<ProxyState>,
) -> Router {
    let mut router = build_api_router(state, dispatcher);
    if let Some(proxy) = proxy {
        router = router.merge(build_proxy_router(proxy));
    }

    router
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
