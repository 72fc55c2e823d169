//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    ActivityPayload, ActivityRecord, DataBlob, DatasetRecord, PlaceRecord, SubmissionRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct NewDataset {
    pub owner: String,
    pub short_name: String,
    pub data: DataBlob,
}

/// How an update combines with the stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// PUT: the submitted blob replaces the stored one.
    Replace,
    /// PATCH: submitted keys overwrite, others are kept.
    Merge,
}

#[async_trait]
pub trait DatasetsRepo: Send + Sync {
    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>, RepoError>;

    async fn create_dataset(&self, dataset: NewDataset) -> Result<DatasetRecord, RepoError>;

    async fn find_dataset(
        &self,
        owner: &str,
        short_name: &str,
    ) -> Result<Option<DatasetRecord>, RepoError>;

    async fn find_dataset_by_id(&self, id: u64) -> Result<Option<DatasetRecord>, RepoError>;

    async fn update_dataset(
        &self,
        id: u64,
        data: DataBlob,
        mode: UpdateMode,
    ) -> Result<DatasetRecord, RepoError>;

    /// Delete a dataset with its places and their submissions.
    async fn delete_dataset(&self, id: u64) -> Result<DatasetRecord, RepoError>;
}

#[async_trait]
pub trait PlacesRepo: Send + Sync {
    /// Places of one dataset, or all places when `dataset_id` is `None`.
    async fn list_places(&self, dataset_id: Option<u64>) -> Result<Vec<PlaceRecord>, RepoError>;

    async fn create_place(
        &self,
        dataset_id: Option<u64>,
        data: DataBlob,
    ) -> Result<PlaceRecord, RepoError>;

    async fn find_place(&self, id: u64) -> Result<Option<PlaceRecord>, RepoError>;

    async fn update_place(
        &self,
        id: u64,
        data: DataBlob,
        mode: UpdateMode,
    ) -> Result<PlaceRecord, RepoError>;

    /// Delete a place with its submissions.
    async fn delete_place(&self, id: u64) -> Result<PlaceRecord, RepoError>;
}

#[async_trait]
pub trait SubmissionsRepo: Send + Sync {
    async fn list_submissions(
        &self,
        place_id: u64,
        submission_type: &str,
    ) -> Result<Vec<SubmissionRecord>, RepoError>;

    /// Create a submission, opening the (place, type) submission set if needed.
    async fn create_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        data: DataBlob,
    ) -> Result<SubmissionRecord, RepoError>;

    async fn find_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        id: u64,
    ) -> Result<Option<SubmissionRecord>, RepoError>;

    async fn update_submission(
        &self,
        id: u64,
        data: DataBlob,
        mode: UpdateMode,
    ) -> Result<SubmissionRecord, RepoError>;

    async fn delete_submission(&self, id: u64) -> Result<SubmissionRecord, RepoError>;
}

/// Append-only activity log.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Append a record and return its id, greater than every earlier id.
    async fn append(&self, payload: ActivityPayload) -> Result<i64, RepoError>;

    /// All records in ascending id order.
    async fn scan(&self) -> Result<Vec<ActivityRecord>, RepoError>;
}
