//! JSON representations. Every `url` is relative to the API root and is made
//! absolute per request.

use serde::Serialize;
use time::OffsetDateTime;

use crate::application::resources::PlaceEntry;
use crate::domain::entities::{
    ActivityAction, ActivityRecord, DataBlob, DatasetRecord, DatasetRef, SubmissionRecord,
};

#[derive(Debug, Serialize)]
pub struct Link {
    pub url: String,
}

pub fn dataset_url(dataset: &DatasetRef) -> String {
    format!("/datasets/{}/{}/", dataset.owner, dataset.short_name)
}

pub fn place_url(place_id: u64) -> String {
    format!("/places/{place_id}/")
}

pub fn submission_url(place_id: u64, submission_type: &str, id: u64) -> String {
    format!("/places/{place_id}/{submission_type}/{id}/")
}

// Client attributes are flattened first so the fixed fields below win on a
// name clash.

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    #[serde(flatten)]
    pub data: DataBlob,
    pub url: String,
    pub id: u64,
    pub owner: String,
    pub slug: String,
    pub places: Link,
    pub activity: Link,
    #[serde(with = "time::serde::rfc3339")]
    pub created_datetime: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_datetime: OffsetDateTime,
}

impl From<DatasetRecord> for DatasetResponse {
    fn from(dataset: DatasetRecord) -> Self {
        let url = dataset_url(&dataset.reference());
        Self {
            places: Link {
                url: format!("{url}places/"),
            },
            activity: Link {
                url: format!("{url}activity/"),
            },
            url,
            id: dataset.id,
            owner: dataset.owner,
            slug: dataset.short_name,
            data: dataset.data,
            created_datetime: dataset.created_at,
            updated_datetime: dataset.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaceResponse {
    #[serde(flatten)]
    pub data: DataBlob,
    pub url: String,
    pub id: u64,
    pub dataset: Option<Link>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_datetime: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_datetime: OffsetDateTime,
}

impl From<PlaceEntry> for PlaceResponse {
    fn from(entry: PlaceEntry) -> Self {
        let PlaceEntry { place, dataset } = entry;
        Self {
            url: place_url(place.id),
            id: place.id,
            dataset: dataset.map(|dataset| Link {
                url: dataset_url(&dataset),
            }),
            data: place.data,
            created_datetime: place.created_at,
            updated_datetime: place.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    #[serde(flatten)]
    pub data: DataBlob,
    pub url: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub submission_type: String,
    pub place: Link,
    #[serde(with = "time::serde::rfc3339")]
    pub created_datetime: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_datetime: OffsetDateTime,
}

impl From<SubmissionRecord> for SubmissionResponse {
    fn from(submission: SubmissionRecord) -> Self {
        Self {
            url: submission_url(
                submission.place_id,
                &submission.submission_type,
                submission.id,
            ),
            id: submission.id,
            place: Link {
                url: place_url(submission.place_id),
            },
            submission_type: submission.submission_type,
            data: submission.data,
            created_datetime: submission.created_at,
            updated_datetime: submission.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: i64,
    pub action: ActivityAction,
    pub place: Link,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<Link>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub submission_type: Option<String>,
    pub data: DataBlob,
    #[serde(with = "time::serde::rfc3339")]
    pub created_datetime: OffsetDateTime,
}

impl From<ActivityRecord> for ActivityResponse {
    fn from(record: ActivityRecord) -> Self {
        let payload = record.payload;
        let submission = match (&payload.submission_type, payload.submission_id) {
            (Some(kind), Some(id)) => Some(Link {
                url: submission_url(payload.place_id, kind, id),
            }),
            _ => None,
        };
        Self {
            id: record.id,
            action: payload.action,
            place: Link {
                url: place_url(payload.place_id),
            },
            dataset: payload.dataset.as_ref().map(|dataset| Link {
                url: dataset_url(dataset),
            }),
            submission,
            submission_type: payload.submission_type,
            data: payload.data,
            created_datetime: record.created_at,
        }
    }
}
