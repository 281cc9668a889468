//! Human feedback on task invocations.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use homefix_core::{ActorId, FeedbackId, JobId};

use super::invocation::StoreError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Up => "up",
            Rating::Down => "down",
        }
    }
}

impl FromStr for Rating {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Rating::Up),
            "down" => Ok(Rating::Down),
            _ => Err(format!("rating must be \"up\" or \"down\", got {s:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: FeedbackId,
    pub job_id: JobId,
    pub actor: ActorId,
    pub rating: Rating,
    pub reason_code: Option<String>,
    pub comment: Option<String>,
    /// What the user was shown, e.g. which copy variant they picked.
    pub context_snapshot: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Up/down tally for one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub up: u64,
    pub down: u64,
}

impl FeedbackSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FeedbackRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, r| {
            match r.rating {
                Rating::Up => acc.up += 1,
                Rating::Down => acc.down += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> u64 {
        self.up + self.down
    }
}

/// Append-only feedback store. Records are never updated or merged.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackId, StoreError>;

    /// All feedback for `job_id`, oldest first.
    async fn list_for_job(&self, job_id: JobId) -> Result<Vec<FeedbackRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    inner: RwLock<HashMap<JobId, Vec<FeedbackRecord>>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("feedback map lock poisoned".to_string())
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackId, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = record.feedback_id;
        map.entry(record.job_id).or_default().push(record);
        Ok(id)
    }

    async fn list_for_job(&self, job_id: JobId) -> Result<Vec<FeedbackRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&job_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl<S: FeedbackStore + ?Sized> FeedbackStore for Arc<S> {
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackId, StoreError> {
        (**self).insert(record).await
    }

    async fn list_for_job(&self, job_id: JobId) -> Result<Vec<FeedbackRecord>, StoreError> {
        (**self).list_for_job(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_parse_is_case_insensitive() {
        assert_eq!("UP".parse::<Rating>(), Ok(Rating::Up));
        assert_eq!(" Down ".parse::<Rating>(), Ok(Rating::Down));
        assert!("meh".parse::<Rating>().is_err());
    }

    #[test]
    fn rating_error_echoes_raw_input() {
        let err = " Meh ".parse::<Rating>().unwrap_err();
        assert!(err.ends_with(r#"got " Meh ""#), "{err}");
    }

    #[test]
    fn summary_counts_ratings() {
        let record = |rating| FeedbackRecord {
            feedback_id: FeedbackId::new(),
            job_id: JobId::new(),
            actor: ActorId::system(),
            rating,
            reason_code: None,
            comment: None,
            context_snapshot: None,
            created_at: Utc::now(),
        };
        let records = [record(Rating::Up), record(Rating::Down), record(Rating::Up)];
        let summary = FeedbackSummary::from_records(&records);
        assert_eq!(summary, FeedbackSummary { up: 2, down: 1 });
        assert_eq!(summary.total(), 3);
    }
}
