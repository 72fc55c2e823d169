//! Dataset, place and submission operations.
//!
//! Every place or submission change appends an activity record. A failed
//! append is logged and does not undo or fail the change itself.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::application::repos::{
    ActivityLog, DatasetsRepo, NewDataset, PlacesRepo, RepoError, SubmissionsRepo, UpdateMode,
};
use crate::domain::blob::{data_blob, dataset_short_name, path_segment};
use crate::domain::entities::{
    ActivityAction, ActivityPayload, DatasetRecord, DatasetRef, PlaceRecord,
    SubmissionRecord,
};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A place together with the dataset it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceEntry {
    pub place: PlaceRecord,
    pub dataset: Option<DatasetRef>,
}

#[derive(Clone)]
pub struct ResourceService {
    datasets: Arc<dyn DatasetsRepo>,
    places: Arc<dyn PlacesRepo>,
    submissions: Arc<dyn SubmissionsRepo>,
    activity: Arc<dyn ActivityLog>,
}

impl ResourceService {
    pub fn new(
        datasets: Arc<dyn DatasetsRepo>,
        places: Arc<dyn PlacesRepo>,
        submissions: Arc<dyn SubmissionsRepo>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            datasets,
            places,
            submissions,
            activity,
        }
    }

    // ------------------------------------------------------------------
    // Datasets
    // ------------------------------------------------------------------

    pub async fn list_datasets(&self) -> Result<Vec<DatasetRecord>, ResourceError> {
        Ok(self.datasets.list_datasets().await?)
    }

    /// Create a dataset. The owner comes from the blob's `owner` field.
    pub async fn create_dataset(&self, body: Value) -> Result<DatasetRecord, ResourceError> {
        let mut data = data_blob(body)?;
        let owner = data
            .remove("owner")
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| DomainError::validation("dataset requires an `owner`"))?;
        let owner = path_segment("owner", &owner)?;
        let short_name = dataset_short_name(&data)?;
        data.remove("short_name");

        let dataset = self
            .datasets
            .create_dataset(NewDataset {
                owner,
                short_name,
                data,
            })
            .await?;
        info!(
            dataset_id = dataset.id,
            owner = %dataset.owner,
            short_name = %dataset.short_name,
            "dataset created"
        );
        Ok(dataset)
    }

    pub async fn get_dataset(
        &self,
        owner: &str,
        short_name: &str,
    ) -> Result<DatasetRecord, ResourceError> {
        self.datasets
            .find_dataset(owner, short_name)
            .await?
            .ok_or_else(|| DomainError::not_found("dataset").into())
    }

    /// Look a dataset up by its numeric id.
    pub async fn get_dataset_by_id(&self, id: u64) -> Result<DatasetRecord, ResourceError> {
        self.datasets
            .find_dataset_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("dataset").into())
    }

    pub async fn update_dataset(
        &self,
        owner: &str,
        short_name: &str,
        body: Value,
        mode: UpdateMode,
    ) -> Result<DatasetRecord, ResourceError> {
        let dataset = self.get_dataset(owner, short_name).await?;
        let data = data_blob(body)?;
        Ok(self.datasets.update_dataset(dataset.id, data, mode).await?)
    }

    pub async fn delete_dataset(&self, owner: &str, short_name: &str) -> Result<(), ResourceError> {
        let dataset = self.get_dataset(owner, short_name).await?;
        self.datasets.delete_dataset(dataset.id).await?;
        info!(dataset_id = dataset.id, "dataset deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Places
    // ------------------------------------------------------------------

    /// Places of the given dataset, or every place when `scope` is `None`.
    pub async fn list_places(
        &self,
        scope: Option<(&str, &str)>,
    ) -> Result<Vec<PlaceEntry>, ResourceError> {
        match scope {
            Some((owner, short_name)) => {
                let dataset = self.get_dataset(owner, short_name).await?;
                let places = self.places.list_places(Some(dataset.id)).await?;
                let reference = dataset.reference();
                Ok(places
                    .into_iter()
                    .map(|place| PlaceEntry {
                        place,
                        dataset: Some(reference.clone()),
                    })
                    .collect())
            }
            None => {
                let references: HashMap<u64, DatasetRef> = self
                    .datasets
                    .list_datasets()
                    .await?
                    .into_iter()
                    .map(|dataset| (dataset.id, dataset.reference()))
                    .collect();
                let places = self.places.list_places(None).await?;
                Ok(places
                    .into_iter()
                    .map(|place| {
                        let dataset = place
                            .dataset_id
                            .and_then(|id| references.get(&id).cloned());
                        PlaceEntry { place, dataset }
                    })
                    .collect())
            }
        }
    }

    pub async fn create_place(
        &self,
        scope: Option<(&str, &str)>,
        body: Value,
    ) -> Result<PlaceEntry, ResourceError> {
        let data = data_blob(body)?;
        let dataset = match scope {
            Some((owner, short_name)) => Some(self.get_dataset(owner, short_name).await?),
            None => None,
        };

        let place = self
            .places
            .create_place(dataset.as_ref().map(|d| d.id), data)
            .await?;
        let entry = PlaceEntry {
            place,
            dataset: dataset.map(|d| d.reference()),
        };
        self.record_place_activity(ActivityAction::Create, &entry).await;
        Ok(entry)
    }

    pub async fn get_place(&self, id: u64) -> Result<PlaceEntry, ResourceError> {
        let place = self
            .places
            .find_place(id)
            .await?
            .ok_or_else(|| DomainError::not_found("place"))?;
        self.place_entry(place).await
    }

    pub async fn update_place(
        &self,
        id: u64,
        body: Value,
        mode: UpdateMode,
    ) -> Result<PlaceEntry, ResourceError> {
        let data = data_blob(body)?;
        self.get_place(id).await?;
        let place = self.places.update_place(id, data, mode).await?;
        let entry = self.place_entry(place).await?;
        self.record_place_activity(ActivityAction::Update, &entry).await;
        Ok(entry)
    }

    pub async fn delete_place(&self, id: u64) -> Result<(), ResourceError> {
        self.get_place(id).await?;
        let place = self.places.delete_place(id).await?;
        let entry = self.place_entry(place).await?;
        self.record_place_activity(ActivityAction::Delete, &entry).await;
        Ok(())
    }

    async fn place_entry(&self, place: PlaceRecord) -> Result<PlaceEntry, ResourceError> {
        let dataset = match place.dataset_id {
            Some(id) => self
                .datasets
                .find_dataset_by_id(id)
                .await?
                .map(|dataset| dataset.reference()),
            None => None,
        };
        Ok(PlaceEntry { place, dataset })
    }

    // ------------------------------------------------------------------
    // Submissions
    // ------------------------------------------------------------------

    pub async fn list_submissions(
        &self,
        place_id: u64,
        submission_type: &str,
    ) -> Result<Vec<SubmissionRecord>, ResourceError> {
        self.get_place(place_id).await?;
        Ok(self
            .submissions
            .list_submissions(place_id, submission_type)
            .await?)
    }

    pub async fn create_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        body: Value,
    ) -> Result<SubmissionRecord, ResourceError> {
        let submission_type = path_segment("submission_type", submission_type)?;
        let data = data_blob(body)?;
        let place = self.get_place(place_id).await?;
        let submission = self
            .submissions
            .create_submission(place_id, &submission_type, data)
            .await?;
        self.record_submission_activity(ActivityAction::Create, &place, &submission)
            .await;
        Ok(submission)
    }

    pub async fn get_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        id: u64,
    ) -> Result<SubmissionRecord, ResourceError> {
        self.submissions
            .find_submission(place_id, submission_type, id)
            .await?
            .ok_or_else(|| DomainError::not_found("submission").into())
    }

    pub async fn update_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        id: u64,
        body: Value,
        mode: UpdateMode,
    ) -> Result<SubmissionRecord, ResourceError> {
        let data = data_blob(body)?;
        self.get_submission(place_id, submission_type, id).await?;
        let place = self.get_place(place_id).await?;
        let submission = self.submissions.update_submission(id, data, mode).await?;
        self.record_submission_activity(ActivityAction::Update, &place, &submission)
            .await;
        Ok(submission)
    }

    pub async fn delete_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        id: u64,
    ) -> Result<(), ResourceError> {
        self.get_submission(place_id, submission_type, id).await?;
        let place = self.get_place(place_id).await?;
        let submission = self.submissions.delete_submission(id).await?;
        self.record_submission_activity(ActivityAction::Delete, &place, &submission)
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Activity
    // ------------------------------------------------------------------

    async fn record_place_activity(&self, action: ActivityAction, entry: &PlaceEntry) {
        self.record(ActivityPayload {
            action,
            dataset: entry.dataset.clone(),
            place_id: entry.place.id,
            submission_type: None,
            submission_id: None,
            data: entry.place.data.clone(),
        })
        .await;
    }

    async fn record_submission_activity(
        &self,
        action: ActivityAction,
        place: &PlaceEntry,
        submission: &SubmissionRecord,
    ) {
        self.record(ActivityPayload {
            action,
            dataset: place.dataset.clone(),
            place_id: place.place.id,
            submission_type: Some(submission.submission_type.clone()),
            submission_id: Some(submission.id),
            data: submission.data.clone(),
        })
        .await;
    }

    async fn record(&self, payload: ActivityPayload) {
        let action = payload.action;
        let place_id = payload.place_id;
        if let Err(err) = self.activity.append(payload).await {
            error!(
                ?action,
                place_id,
                error = %err,
                "failed to append activity record"
            );
        }
    }
}
