use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::application::activity::ActivityParams;
use crate::application::repos::UpdateMode;
use crate::domain::entities::DatasetRecord;

use super::error::{ApiError, codes};
use super::extract::{RequestBase, activity_params, json_body};
use super::models::{ActivityResponse, DatasetResponse, PlaceResponse, SubmissionResponse};
use super::state::ApiState;

type DatasetPath = Path<(String, String)>;
type SubmissionSetPath = Path<(u64, String)>;
type SubmissionPath = Path<(u64, String, u64)>;
type JsonPayload = Result<Json<Value>, JsonRejection>;
type ActivityQueryParams = Result<Query<ActivityParams>, QueryRejection>;

/// Serialize `body`, absolutize its `url` fields and wrap it in a response.
fn represent<T: Serialize>(
    base: &RequestBase,
    status: StatusCode,
    body: T,
) -> Result<Response, ApiError> {
    let value = serde_json::to_value(body).map_err(|err| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::SERIALIZATION,
            "Failed to serialize response",
            Some(err.to_string()),
        )
    })?;
    Ok((status, Json(base.absolutize(value))).into_response())
}

fn represent_all<T, R>(base: &RequestBase, items: Vec<T>) -> Result<Response, ApiError>
where
    R: Serialize + From<T>,
{
    let items: Vec<R> = items.into_iter().map(R::from).collect();
    represent(base, StatusCode::OK, items)
}

// ----------------------------------------------------------------------------
// Datasets
// ----------------------------------------------------------------------------

pub async fn list_datasets(
    State(state): State<ApiState>,
    base: RequestBase,
) -> Result<Response, ApiError> {
    let datasets = state.resources.list_datasets().await?;
    represent_all::<_, DatasetResponse>(&base, datasets)
}

pub async fn create_dataset(
    State(state): State<ApiState>,
    base: RequestBase,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    let dataset = state.resources.create_dataset(json_body(payload)?).await?;
    represent(&base, StatusCode::CREATED, DatasetResponse::from(dataset))
}

pub async fn get_dataset(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((owner, dataset)): DatasetPath,
) -> Result<Response, ApiError> {
    let dataset = state.resources.get_dataset(&owner, &dataset).await?;
    represent(&base, StatusCode::OK, DatasetResponse::from(dataset))
}

pub async fn replace_dataset(
    state: State<ApiState>,
    base: RequestBase,
    path: DatasetPath,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    update_dataset(state, base, path, payload, UpdateMode::Replace).await
}

pub async fn patch_dataset(
    state: State<ApiState>,
    base: RequestBase,
    path: DatasetPath,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    update_dataset(state, base, path, payload, UpdateMode::Merge).await
}

async fn update_dataset(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((owner, dataset)): DatasetPath,
    payload: JsonPayload,
    mode: UpdateMode,
) -> Result<Response, ApiError> {
    let dataset = state
        .resources
        .update_dataset(&owner, &dataset, json_body(payload)?, mode)
        .await?;
    represent(&base, StatusCode::OK, DatasetResponse::from(dataset))
}

pub async fn delete_dataset(
    State(state): State<ApiState>,
    Path((owner, dataset)): DatasetPath,
) -> Result<StatusCode, ApiError> {
    state.resources.delete_dataset(&owner, &dataset).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve the `/datasets/{id}/` alias. Non-numeric ids are unknown datasets.
async fn dataset_by_id(state: &ApiState, id: &str) -> Result<DatasetRecord, ApiError> {
    let id = id
        .parse::<u64>()
        .map_err(|_| ApiError::not_found("Dataset not found"))?;
    Ok(state.resources.get_dataset_by_id(id).await?)
}

pub async fn get_dataset_by_id(
    State(state): State<ApiState>,
    base: RequestBase,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let dataset = dataset_by_id(&state, &id).await?;
    represent(&base, StatusCode::OK, DatasetResponse::from(dataset))
}

pub async fn replace_dataset_by_id(
    State(state): State<ApiState>,
    base: RequestBase,
    Path(id): Path<String>,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    let dataset = dataset_by_id(&state, &id).await?;
    let path = Path((dataset.owner, dataset.short_name));
    update_dataset(State(state), base, path, payload, UpdateMode::Replace).await
}

pub async fn patch_dataset_by_id(
    State(state): State<ApiState>,
    base: RequestBase,
    Path(id): Path<String>,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    let dataset = dataset_by_id(&state, &id).await?;
    let path = Path((dataset.owner, dataset.short_name));
    update_dataset(State(state), base, path, payload, UpdateMode::Merge).await
}

pub async fn delete_dataset_by_id(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let dataset = dataset_by_id(&state, &id).await?;
    state
        .resources
        .delete_dataset(&dataset.owner, &dataset.short_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Places
// ----------------------------------------------------------------------------

pub async fn list_dataset_places(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((owner, dataset)): DatasetPath,
) -> Result<Response, ApiError> {
    let places = state
        .resources
        .list_places(Some((owner.as_str(), dataset.as_str())))
        .await?;
    represent_all::<_, PlaceResponse>(&base, places)
}

pub async fn create_dataset_place(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((owner, dataset)): DatasetPath,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    let place = state
        .resources
        .create_place(Some((owner.as_str(), dataset.as_str())), json_body(payload)?)
        .await?;
    represent(&base, StatusCode::CREATED, PlaceResponse::from(place))
}

pub async fn list_places(
    State(state): State<ApiState>,
    base: RequestBase,
) -> Result<Response, ApiError> {
    let places = state.resources.list_places(None).await?;
    represent_all::<_, PlaceResponse>(&base, places)
}

pub async fn create_place(
    State(state): State<ApiState>,
    base: RequestBase,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    let place = state
        .resources
        .create_place(None, json_body(payload)?)
        .await?;
    represent(&base, StatusCode::CREATED, PlaceResponse::from(place))
}

pub async fn get_place(
    State(state): State<ApiState>,
    base: RequestBase,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let place = state.resources.get_place(id).await?;
    represent(&base, StatusCode::OK, PlaceResponse::from(place))
}

pub async fn replace_place(
    state: State<ApiState>,
    base: RequestBase,
    path: Path<u64>,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    update_place(state, base, path, payload, UpdateMode::Replace).await
}

pub async fn patch_place(
    state: State<ApiState>,
    base: RequestBase,
    path: Path<u64>,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    update_place(state, base, path, payload, UpdateMode::Merge).await
}

async fn update_place(
    State(state): State<ApiState>,
    base: RequestBase,
    Path(id): Path<u64>,
    payload: JsonPayload,
    mode: UpdateMode,
) -> Result<Response, ApiError> {
    let place = state
        .resources
        .update_place(id, json_body(payload)?, mode)
        .await?;
    represent(&base, StatusCode::OK, PlaceResponse::from(place))
}

pub async fn delete_place(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.resources.delete_place(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Submissions
// ----------------------------------------------------------------------------

pub async fn list_submissions(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((place_id, submission_type)): SubmissionSetPath,
) -> Result<Response, ApiError> {
    let submissions = state
        .resources
        .list_submissions(place_id, &submission_type)
        .await?;
    represent_all::<_, SubmissionResponse>(&base, submissions)
}

pub async fn create_submission(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((place_id, submission_type)): SubmissionSetPath,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    let submission = state
        .resources
        .create_submission(place_id, &submission_type, json_body(payload)?)
        .await?;
    represent(
        &base,
        StatusCode::CREATED,
        SubmissionResponse::from(submission),
    )
}

pub async fn get_submission(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((place_id, submission_type, id)): SubmissionPath,
) -> Result<Response, ApiError> {
    let submission = state
        .resources
        .get_submission(place_id, &submission_type, id)
        .await?;
    represent(&base, StatusCode::OK, SubmissionResponse::from(submission))
}

pub async fn replace_submission(
    state: State<ApiState>,
    base: RequestBase,
    path: SubmissionPath,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    update_submission(state, base, path, payload, UpdateMode::Replace).await
}

pub async fn patch_submission(
    state: State<ApiState>,
    base: RequestBase,
    path: SubmissionPath,
    payload: JsonPayload,
) -> Result<Response, ApiError> {
    update_submission(state, base, path, payload, UpdateMode::Merge).await
}

async fn update_submission(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((place_id, submission_type, id)): SubmissionPath,
    payload: JsonPayload,
    mode: UpdateMode,
) -> Result<Response, ApiError> {
    let submission = state
        .resources
        .update_submission(place_id, &submission_type, id, json_body(payload)?, mode)
        .await?;
    represent(&base, StatusCode::OK, SubmissionResponse::from(submission))
}

pub async fn delete_submission(
    State(state): State<ApiState>,
    Path((place_id, submission_type, id)): SubmissionPath,
) -> Result<StatusCode, ApiError> {
    state
        .resources
        .delete_submission(place_id, &submission_type, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Activity
// ----------------------------------------------------------------------------

pub async fn list_activity(
    State(state): State<ApiState>,
    base: RequestBase,
    params: ActivityQueryParams,
) -> Result<Response, ApiError> {
    let params = activity_params(params)?;
    let records = state.activity.recent(&params, None).await?;
    represent_all::<_, ActivityResponse>(&base, records)
}

pub async fn list_dataset_activity(
    State(state): State<ApiState>,
    base: RequestBase,
    Path((owner, dataset)): DatasetPath,
    params: ActivityQueryParams,
) -> Result<Response, ApiError> {
    let dataset = state.resources.get_dataset(&owner, &dataset).await?;
    let params = activity_params(params)?;
    let records = state
        .activity
        .recent(&params, Some(&dataset.reference()))
        .await?;
    represent_all::<_, ActivityResponse>(&base, records)
}
