use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde_json::Value;
use url::Url;

use crate::application::activity::ActivityParams;
use crate::util::absolute::absolutize_urls;
use crate::util::origin::request_origin;

use super::error::ApiError;

/// Base URL of the current request, used to absolutize `url` fields.
#[derive(Debug, Clone)]
pub struct RequestBase(pub Url);

impl RequestBase {
    pub fn absolutize(&self, value: Value) -> Value {
        absolutize_urls(value, &self.0)
    }
}

impl<S> FromRequestParts<S> for RequestBase
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let origin = request_origin(&parts.headers, &parts.uri);
        Url::parse(&origin)
            .map(RequestBase)
            .map_err(|err| ApiError::bad_request("Invalid request host", Some(err.to_string())))
    }
}

/// Unwrap a JSON body, reporting malformed input as `invalid_input`.
pub fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
}

/// Unwrap activity query parameters. A query string that does not even
/// deserialize (a repeated `after`, say) is a cursor error like any other.
pub fn activity_params(
    params: Result<Query<ActivityParams>, QueryRejection>,
) -> Result<ActivityParams, ApiError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::invalid_cursor(rejection.body_text()))
}
