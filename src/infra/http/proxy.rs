//! Front end proxy exposing one configured dataset of an upstream API.

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Path, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode,
        header::{ACCEPT, CONNECTION, CONTENT_DISPOSITION, CONTENT_TYPE, TRANSFER_ENCODING},
    },
    response::{IntoResponse, Response},
    routing::any,
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tracing::{debug, instrument};

use crate::config::ProxySettings;

use super::api::error::{ApiError, codes};

const API_KEY_HEADER: &str = "x-shareabouts-key";
const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;
const DOWNLOAD_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
    #[error("failed to format download timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Header(_) | ProxyError::Timestamp(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(
            status,
            codes::UPSTREAM,
            "Proxy request failed",
            Some(self.to_string()),
        )
        .into_response()
    }
}

/// `{root}/datasets/{dataset}/{resource}/`, with surrounding slashes of each
/// part normalized.
pub fn make_resource_uri(root: &str, dataset: &str, resource: &str) -> String {
    format!(
        "{}/datasets/{}/{}/",
        root.trim_end_matches('/'),
        dataset.trim_matches('/'),
        resource.trim_matches('/')
    )
}

/// `<last path segment>.<YYYYmmddHHMMSS>.csv`
pub fn download_filename(path: &str, at: OffsetDateTime) -> Result<String, ProxyError> {
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("download");
    let stamp = at.format(DOWNLOAD_STAMP)?;
    Ok(format!("{name}.{stamp}.csv"))
}

#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    api_root: String,
    dataset: String,
    api_key: Option<String>,
}

impl ProxyState {
    /// `None` when the proxy is not configured.
    pub fn from_settings(settings: &ProxySettings) -> Result<Option<Self>, reqwest::Error> {
        let (Some(root), Some(dataset)) = (settings.api_root.as_ref(), settings.dataset.as_ref())
        else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("shareabouts/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Some(Self {
            client,
            api_root: root.as_str().to_string(),
            dataset: dataset.clone(),
            api_key: settings.api_key.clone(),
        }))
    }

    #[instrument(skip_all, fields(method = %request.method(), resource = %resource))]
    async fn forward(
        &self,
        resource: &str,
        request: Request<Body>,
        accept: Option<HeaderValue>,
    ) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let mut url = make_resource_uri(&self.api_root, &self.dataset, resource);
        if let Some(query) = parts.uri.query() {
            url.push('?');
            url.push_str(query);
        }

        let body = to_bytes(body, MAX_FORWARD_BODY_BYTES).await?;
        let mut upstream = self.client.request(parts.method.clone(), &url);
        if let Some(content_type) = parts.headers.get(CONTENT_TYPE) {
            upstream = upstream.header(CONTENT_TYPE, content_type.clone());
        }
        if let Some(accept) = accept.or_else(|| parts.headers.get(ACCEPT).cloned()) {
            upstream = upstream.header(ACCEPT, accept);
        }
        if let Some(key) = self.api_key.as_deref() {
            upstream = upstream.header(API_KEY_HEADER, HeaderValue::from_str(key)?);
        }
        if !body.is_empty() {
            upstream = upstream.body(body);
        }

        let reply = upstream.send().await?;
        let status = reply.status();
        let headers = reply.headers().clone();
        let bytes = reply.bytes().await?;
        debug!(status = status.as_u16(), url = %url, "proxied upstream response");

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        copy_end_to_end_headers(&headers, response.headers_mut());
        Ok(response)
    }
}

fn copy_end_to_end_headers(from: &HeaderMap, to: &mut HeaderMap) {
    let hop_by_hop: [HeaderName; 2] = [CONNECTION, TRANSFER_ENCODING];
    for (name, value) in from {
        if !hop_by_hop.contains(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

async fn api_proxy(
    State(proxy): State<ProxyState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    proxy.forward(&path, request, None).await
}

async fn csv_download(
    State(proxy): State<ProxyState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let mut response = proxy
        .forward(&path, request, Some(HeaderValue::from_static("text/csv")))
        .await?;
    let filename = download_filename(&path, OffsetDateTime::now_utc())?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename={filename}"))?;
    response
        .headers_mut()
        .insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}

pub fn build_proxy_router(proxy: ProxyState) -> Router {
    Router::new()
        .route("/api/{*path}", any(api_proxy))
        .route("/download/{*path}", any(csv_download))
        .with_state(proxy)
}
