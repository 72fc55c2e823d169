use async_trait::async_trait;

use crate::{
    application::repos::{RepoError, SubmissionsRepo, UpdateMode},
    domain::entities::{DataBlob, SubmissionRecord},
};

use super::{MemoryRepositories, apply_update, next_id, now};

#[async_trait]
impl SubmissionsRepo for MemoryRepositories {
    async fn list_submissions(
        &self,
        place_id: u64,
        submission_type: &str,
    ) -> Result<Vec<SubmissionRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .submissions
            .values()
            .filter(|submission| {
                submission.place_id == place_id && submission.submission_type == submission_type
            })
            .cloned()
            .collect())
    }

    async fn create_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        data: DataBlob,
    ) -> Result<SubmissionRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.places.contains_key(&place_id) {
            return Err(RepoError::NotFound);
        }

        let id = next_id(&mut state.next_submission_id);
        let timestamp = now();
        let record = SubmissionRecord {
            id,
            place_id,
            submission_type: submission_type.to_string(),
            data,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.submissions.insert(id, record.clone());
        Ok(record)
    }

    async fn find_submission(
        &self,
        place_id: u64,
        submission_type: &str,
        id: u64,
    ) -> Result<Option<SubmissionRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .submissions
            .get(&id)
            .filter(|submission| {
                submission.place_id == place_id && submission.submission_type == submission_type
            })
            .cloned())
    }

    async fn update_submission(
        &self,
        id: u64,
        data: DataBlob,
        mode: UpdateMode,
    ) -> Result<SubmissionRecord, RepoError> {
        let mut state = self.state.write().await;
        let submission = state.submissions.get_mut(&id).ok_or(RepoError::NotFound)?;
        apply_update(&mut submission.data, data, mode);
        submission.updated_at = now();
        Ok(submission.clone())
    }

    async fn delete_submission(&self, id: u64) -> Result<SubmissionRecord, RepoError> {
        let mut state = self.state.write().await;
        state.submissions.remove(&id).ok_or(RepoError::NotFound)
    }
}
