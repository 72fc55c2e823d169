use async_trait::async_trait;

use crate::{
    application::repos::{PlacesRepo, RepoError, UpdateMode},
    domain::entities::{DataBlob, PlaceRecord},
};

use super::{MemoryRepositories, apply_update, next_id, now};

#[async_trait]
impl PlacesRepo for MemoryRepositories {
    async fn list_places(&self, dataset_id: Option<u64>) -> Result<Vec<PlaceRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .places
            .values()
            .filter(|place| dataset_id.is_none() || place.dataset_id == dataset_id)
            .cloned()
            .collect())
    }

    async fn create_place(
        &self,
        dataset_id: Option<u64>,
        data: DataBlob,
    ) -> Result<PlaceRecord, RepoError> {
        let mut state = self.state.write().await;
        if let Some(dataset_id) = dataset_id
            && !state.datasets.contains_key(&dataset_id)
        {
            return Err(RepoError::NotFound);
        }

        let id = next_id(&mut state.next_place_id);
        let timestamp = now();
        let record = PlaceRecord {
            id,
            dataset_id,
            data,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.places.insert(id, record.clone());
        Ok(record)
    }

    async fn find_place(&self, id: u64) -> Result<Option<PlaceRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.places.get(&id).cloned())
    }

    async fn update_place(
        &self,
        id: u64,
        data: DataBlob,
        mode: UpdateMode,
    ) -> Result<PlaceRecord, RepoError> {
        let mut state = self.state.write().await;
        let place = state.places.get_mut(&id).ok_or(RepoError::NotFound)?;
        apply_update(&mut place.data, data, mode);
        place.updated_at = now();
        Ok(place.clone())
    }

    async fn delete_place(&self, id: u64) -> Result<PlaceRecord, RepoError> {
        let mut state = self.state.write().await;
        state.remove_place_cascade(id).ok_or(RepoError::NotFound)
    }
}
