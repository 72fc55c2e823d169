//! Activity feed: cursor-bounded reads of the append-only activity log.
//!
//! `before` and `after` are record ids, not positions, so a client polling
//! with `after=<largest id seen>` receives every later record exactly once no
//! matter how many appends happen between polls.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{ActivityLog, RepoError};
use crate::domain::entities::{ActivityRecord, DatasetRef};

/// Raw query parameters, validated by [`ActivityQuery::parse`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityParams {
    pub before: Option<String>,
    pub after: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivityQueryError {
    #[error("`{param}` must be an integer activity id, got `{value}`")]
    InvalidCursor { param: &'static str, value: String },
    #[error("`limit` must be a non-negative integer, got `{value}`")]
    InvalidLimit { value: String },
}

/// Validated cursor bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    /// Inclusive upper bound on id.
    pub before: Option<i64>,
    /// Exclusive lower bound on id.
    pub after: Option<i64>,
    /// Maximum number of records, most recent first.
    pub limit: Option<usize>,
}

impl ActivityQuery {
    pub fn parse(params: &ActivityParams) -> Result<Self, ActivityQueryError> {
        Ok(Self {
            before: parse_cursor("before", params.before.as_deref())?,
            after: parse_cursor("after", params.after.as_deref())?,
            limit: parse_limit(params.limit.as_deref())?,
        })
    }

    fn admits(&self, id: i64) -> bool {
        self.after.is_none_or(|after| id > after) && self.before.is_none_or(|before| id <= before)
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_cursor(param: &'static str, raw: Option<&str>) -> Result<Option<i64>, ActivityQueryError> {
    present(raw)
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| ActivityQueryError::InvalidCursor {
                    param,
                    value: value.to_string(),
                })
        })
        .transpose()
}

fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, ActivityQueryError> {
    present(raw)
        .map(|value| {
            value
                .parse::<usize>()
                .map_err(|_| ActivityQueryError::InvalidLimit {
                    value: value.to_string(),
                })
        })
        .transpose()
}

/// Apply `query` to records given in ascending id order; returns them most
/// recent first.
pub fn select(records: Vec<ActivityRecord>, query: &ActivityQuery) -> Vec<ActivityRecord> {
    let matching = records
        .into_iter()
        .rev()
        .filter(|record| query.admits(record.id));

    match query.limit {
        Some(limit) => matching.take(limit).collect(),
        None => matching.collect(),
    }
}

/// Read the log and apply `query`, keeping only records of `scope` when set.
/// The scope filter runs before the cursor bounds and the limit.
pub async fn run(
    log: &dyn ActivityLog,
    query: &ActivityQuery,
    scope: Option<&DatasetRef>,
) -> Result<Vec<ActivityRecord>, RepoError> {
    let mut records = log.scan().await?;
    if let Some(scope) = scope {
        records.retain(|record| record.payload.dataset.as_ref() == Some(scope));
    }
    Ok(select(records, query))
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error(transparent)]
    Query(#[from] ActivityQueryError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ActivityService {
    log: Arc<dyn ActivityLog>,
}

impl ActivityService {
    pub fn new(log: Arc<dyn ActivityLog>) -> Self {
        Self { log }
    }

    /// Recent activity across all datasets, or of one dataset when `scope`
    /// is set. Parameters are validated before the log is read.
    pub async fn recent(
        &self,
        params: &ActivityParams,
        scope: Option<&DatasetRef>,
    ) -> Result<Vec<ActivityRecord>, ActivityError> {
        let query = ActivityQuery::parse(params)?;
        let selected = run(self.log.as_ref(), &query, scope).await?;
        debug!(
            before = ?query.before,
            after = ?query.after,
            limit = ?query.limit,
            returned = selected.len(),
            "activity query"
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::entities::{ActivityAction, ActivityPayload, DataBlob};
    use crate::infra::db::MemoryRepositories;

    fn record(id: i64) -> ActivityRecord {
        ActivityRecord {
            id,
            created_at: OffsetDateTime::UNIX_EPOCH,
            payload: ActivityPayload {
                action: ActivityAction::Create,
                dataset: None,
                place_id: id as u64,
                submission_type: None,
                submission_id: None,
                data: DataBlob::new(),
            },
        }
    }

    fn ids(records: &[ActivityRecord]) -> Vec<i64> {
        records.iter().map(|record| record.id).collect()
    }

    fn log() -> Vec<ActivityRecord> {
        (1..=5).map(record).collect()
    }

    fn query(before: Option<i64>, after: Option<i64>, limit: Option<usize>) -> ActivityQuery {
        ActivityQuery {
            before,
            after,
            limit,
        }
    }

    #[test]
    fn unbounded_query_returns_everything_most_recent_first() {
        assert_eq!(ids(&select(log(), &ActivityQuery::default())), [5, 4, 3, 2, 1]);
    }

    #[test]
    fn after_is_exclusive_and_before_inclusive() {
        let selected = select(log(), &query(Some(4), Some(2), None));
        assert_eq!(ids(&selected), [4, 3]);
    }

    #[test]
    fn limit_keeps_most_recent() {
        assert_eq!(ids(&select(log(), &query(None, None, Some(2)))), [5, 4]);
        assert!(select(log(), &query(None, None, Some(0))).is_empty());
    }

    #[test]
    fn limit_applies_after_bounds() {
        let selected = select(log(), &query(Some(4), None, Some(2)));
        assert_eq!(ids(&selected), [4, 3]);
    }

    #[test]
    fn empty_results_are_not_errors() {
        assert!(select(log(), &query(None, Some(5), None)).is_empty());
        assert!(select(Vec::new(), &ActivityQuery::default()).is_empty());
        assert!(select(log(), &query(Some(2), Some(3), None)).is_empty());
    }

    #[test]
    fn parse_accepts_integers_and_ignores_blank_values() {
        let params = ActivityParams {
            before: Some("10".into()),
            after: Some(" ".into()),
            limit: Some("3".into()),
        };
        assert_eq!(
            ActivityQuery::parse(&params).expect("valid"),
            query(Some(10), None, Some(3))
        );
    }

    #[test]
    fn parse_rejects_non_integer_cursors() {
        let params = ActivityParams {
            after: Some("2024-01-01".into()),
            ..Default::default()
        };
        assert_eq!(
            ActivityQuery::parse(&params),
            Err(ActivityQueryError::InvalidCursor {
                param: "after",
                value: "2024-01-01".into()
            })
        );
    }

    #[test]
    fn parse_rejects_negative_limit() {
        let params = ActivityParams {
            limit: Some("-1".into()),
            ..Default::default()
        };
        assert!(matches!(
            ActivityQuery::parse(&params),
            Err(ActivityQueryError::InvalidLimit { .. })
        ));
    }

    fn payload(dataset: &str, place_id: u64) -> ActivityPayload {
        ActivityPayload {
            action: ActivityAction::Create,
            dataset: Some(DatasetRef {
                owner: "alice".into(),
                short_name: dataset.into(),
            }),
            place_id,
            submission_type: None,
            submission_id: None,
            data: DataBlob::new(),
        }
    }

    #[tokio::test]
    async fn run_reads_appended_records_through_the_log() {
        let repos = MemoryRepositories::new();
        for place_id in 1..=5 {
            repos.append(payload("trees", place_id)).await.expect("append");
        }

        let selected = run(&repos, &query(Some(4), Some(2), None), None)
            .await
            .expect("run");
        assert_eq!(ids(&selected), [4, 3]);

        let everything = run(&repos, &ActivityQuery::default(), None)
            .await
            .expect("run");
        assert_eq!(ids(&everything), [5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn run_scopes_before_applying_the_limit() {
        let repos = MemoryRepositories::new();
        for (place_id, dataset) in ["trees", "bikes", "trees", "bikes", "bikes"]
            .into_iter()
            .enumerate()
        {
            repos
                .append(payload(dataset, place_id as u64 + 1))
                .await
                .expect("append");
        }
        let trees = DatasetRef {
            owner: "alice".into(),
            short_name: "trees".into(),
        };

        let selected = run(&repos, &query(None, None, Some(1)), Some(&trees))
            .await
            .expect("run");
        assert_eq!(ids(&selected), [3]);

        let service = ActivityService::new(Arc::new(repos));
        let recent = service
            .recent(&ActivityParams::default(), Some(&trees))
            .await
            .expect("recent");
        assert_eq!(ids(&recent), [3, 1]);
    }

    #[test]
    fn polling_with_after_sees_every_record_once() {
        let mut appended = Vec::new();
        let mut seen = Vec::new();
        let mut last_seen = 0;
        let mut next_id = 1;

        for burst in [3, 0, 1, 4, 2] {
            for _ in 0..burst {
                appended.push(record(next_id));
                next_id += 1;
            }
            let page = select(appended.clone(), &query(None, Some(last_seen), None));
            let page_ids = ids(&page);
            let mut deduped = page_ids.clone();
            deduped.dedup();
            assert_eq!(deduped, page_ids);
            if let Some(max) = page_ids.first() {
                last_seen = *max;
            }
            seen.extend(page_ids);
        }

        seen.sort_unstable();
        assert_eq!(seen, (1..next_id).collect::<Vec<_>>());
    }
}
