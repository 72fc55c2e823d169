//! In-memory repository implementations.
//!
//! One lock guards every table so cascading deletes and id assignment are
//! atomic with respect to readers.

mod activity;
mod datasets;
mod places;
mod submissions;

use std::collections::BTreeMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::UpdateMode;
use crate::domain::entities::{
    ActivityRecord, DataBlob, DatasetRecord, PlaceRecord, SubmissionRecord,
};

#[derive(Clone, Default)]
pub struct MemoryRepositories {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct MemoryState {
    datasets: BTreeMap<u64, DatasetRecord>,
    places: BTreeMap<u64, PlaceRecord>,
    submissions: BTreeMap<u64, SubmissionRecord>,
    activity: Vec<ActivityRecord>,
    next_dataset_id: u64,
    next_place_id: u64,
    next_submission_id: u64,
    next_activity_id: i64,
}

impl MemoryState {
    fn remove_place_cascade(&mut self, place_id: u64) -> Option<PlaceRecord> {
        let place = self.places.remove(&place_id)?;
        self.submissions
            .retain(|_, submission| submission.place_id != place_id);
        Some(place)
    }
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn apply_update(stored: &mut DataBlob, data: DataBlob, mode: UpdateMode) {
    match mode {
        UpdateMode::Replace => *stored = data,
        UpdateMode::Merge => stored.extend(data),
    }
}
