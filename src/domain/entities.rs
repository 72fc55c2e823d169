//! Domain entities held by the resource store.

use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Free-form attributes submitted by clients.
pub type DataBlob = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    pub id: u64,
    pub owner: String,
    pub short_name: String,
    pub data: DataBlob,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl DatasetRecord {
    pub fn reference(&self) -> DatasetRef {
        DatasetRef {
            owner: self.owner.clone(),
            short_name: self.short_name.clone(),
        }
    }
}

/// Natural key of a dataset, as it appears in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DatasetRef {
    pub owner: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceRecord {
    pub id: u64,
    pub dataset_id: Option<u64>,
    pub data: DataBlob,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub id: u64,
    pub place_id: u64,
    pub submission_type: String,
    pub data: DataBlob,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
}

/// What an activity record describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPayload {
    pub action: ActivityAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetRef>,
    pub place_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<u64>,
    /// Attributes of the changed object at the time of the change.
    pub data: DataBlob,
}

/// One entry of the append-only activity log.
///
/// Ids are assigned by the log, strictly increase with append order, and are
/// never reused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub payload: ActivityPayload,
}
