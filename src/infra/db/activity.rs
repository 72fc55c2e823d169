use async_trait::async_trait;

use crate::{
    application::repos::{ActivityLog, RepoError},
    domain::entities::{ActivityPayload, ActivityRecord},
};

use super::{MemoryRepositories, now};

#[async_trait]
impl ActivityLog for MemoryRepositories {
    async fn append(&self, payload: ActivityPayload) -> Result<i64, RepoError> {
        let mut state = self.state.write().await;
        state.next_activity_id += 1;
        let id = state.next_activity_id;
        state.activity.push(ActivityRecord {
            id,
            created_at: now(),
            payload,
        });
        Ok(id)
    }

    async fn scan(&self) -> Result<Vec<ActivityRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.activity.clone())
    }
}
