use async_trait::async_trait;

use crate::{
    application::repos::{DatasetsRepo, NewDataset, RepoError, UpdateMode},
    domain::entities::{DataBlob, DatasetRecord},
};

use super::{MemoryRepositories, apply_update, next_id, now};

const DATASET_NATURAL_KEY: &str = "datasets_owner_short_name_key";

#[async_trait]
impl DatasetsRepo for MemoryRepositories {
    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.datasets.values().cloned().collect())
    }

    async fn create_dataset(&self, dataset: NewDataset) -> Result<DatasetRecord, RepoError> {
        let mut state = self.state.write().await;
        let taken = state.datasets.values().any(|existing| {
            existing.owner == dataset.owner && existing.short_name == dataset.short_name
        });
        if taken {
            return Err(RepoError::Duplicate {
                constraint: DATASET_NATURAL_KEY.to_string(),
            });
        }

        let id = next_id(&mut state.next_dataset_id);
        let timestamp = now();
        let record = DatasetRecord {
            id,
            owner: dataset.owner,
            short_name: dataset.short_name,
            data: dataset.data,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.datasets.insert(id, record.clone());
        Ok(record)
    }

    async fn find_dataset(
        &self,
        owner: &str,
        short_name: &str,
    ) -> Result<Option<DatasetRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .datasets
            .values()
            .find(|dataset| dataset.owner == owner && dataset.short_name == short_name)
            .cloned())
    }

    async fn find_dataset_by_id(&self, id: u64) -> Result<Option<DatasetRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.datasets.get(&id).cloned())
    }

    async fn update_dataset(
        &self,
        id: u64,
        data: DataBlob,
        mode: UpdateMode,
    ) -> Result<DatasetRecord, RepoError> {
        let mut state = self.state.write().await;
        let dataset = state.datasets.get_mut(&id).ok_or(RepoError::NotFound)?;
        apply_update(&mut dataset.data, data, mode);
        dataset.updated_at = now();
        Ok(dataset.clone())
    }

    async fn delete_dataset(&self, id: u64) -> Result<DatasetRecord, RepoError> {
        let mut state = self.state.write().await;
        let dataset = state.datasets.remove(&id).ok_or(RepoError::NotFound)?;
        let place_ids: Vec<u64> = state
            .places
            .values()
            .filter(|place| place.dataset_id == Some(id))
            .map(|place| place.id)
            .collect();
        for place_id in place_ids {
            state.remove_place_cascade(place_id);
        }
        Ok(dataset)
    }
}
