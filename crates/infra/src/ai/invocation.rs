//! Task invocation records and their storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use homefix_ai::{TaskEnvelope, TaskType};
use homefix_core::{ActorId, CorrelationId, EntityRef, EntityType, JobId};

pub const DEFAULT_QUERY_LIMIT: usize = 20;
pub const MAX_QUERY_LIMIT: usize = 100;

/// One persisted execution of an AI task. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub job_id: JobId,
    pub task_type: TaskType,
    pub actor: ActorId,
    #[serde(flatten)]
    pub entity: EntityRef,
    pub input: JsonValue,
    pub output: JsonValue,
    pub used_fallback: bool,
    pub success: bool,
    /// Fallback reason kind (`flag_disabled`, `timeout`, ...), if any.
    pub fallback_reason: Option<String>,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl TaskInvocation {
    /// Build the audit row for a finished envelope. Mints a fresh job id.
    pub fn from_envelope<O: Serialize>(
        actor: ActorId,
        entity: EntityRef,
        input: JsonValue,
        envelope: &TaskEnvelope<O>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            job_id: JobId::new(),
            task_type: envelope.task_type,
            actor,
            entity,
            input,
            output: serde_json::to_value(&envelope.output)?,
            used_fallback: envelope.used_fallback,
            success: envelope.success,
            fallback_reason: envelope
                .fallback_reason
                .as_ref()
                .map(|r| r.kind().to_string()),
            correlation_id: envelope.correlation_id,
            created_at: envelope.started_at,
            completed_at: envelope.completed_at,
        })
    }
}

/// Filter over invocations; every dimension is optional and independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub task_type: Option<TaskType>,
    pub limit: Option<usize>,
}

impl InvocationQuery {
    pub fn for_entity(entity: &EntityRef) -> Self {
        Self {
            entity_type: Some(entity.entity_type),
            entity_id: Some(entity.entity_id.clone()),
            ..Self::default()
        }
    }

    pub fn with_task_type(mut self, task_type: Option<TaskType>) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective limit, clamped to `1..=MAX_QUERY_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT)
    }

    pub fn matches(&self, inv: &TaskInvocation) -> bool {
        self.entity_type.is_none_or(|t| inv.entity.entity_type == t)
            && self
                .entity_id
                .as_deref()
                .is_none_or(|id| inv.entity.entity_id == id)
            && self.task_type.is_none_or(|t| inv.task_type == t)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Append-only store of task invocations.
#[async_trait]
pub trait TaskInvocationStore: Send + Sync {
    async fn insert(&self, invocation: TaskInvocation) -> Result<JobId, StoreError>;

    async fn get(&self, job_id: JobId) -> Result<Option<TaskInvocation>, StoreError>;

    /// Matching invocations, newest first, at most `query.effective_limit()`.
    async fn query(&self, query: &InvocationQuery) -> Result<Vec<TaskInvocation>, StoreError>;
}

/// In-memory invocation store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTaskInvocationStore {
    inner: RwLock<HashMap<JobId, TaskInvocation>>,
}

impl InMemoryTaskInvocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("invocation map lock poisoned".to_string())
}

#[async_trait]
impl TaskInvocationStore for InMemoryTaskInvocationStore {
    async fn insert(&self, invocation: TaskInvocation) -> Result<JobId, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&invocation.job_id) {
            return Err(StoreError::AlreadyExists(invocation.job_id.to_string()));
        }
        let id = invocation.job_id;
        map.insert(id, invocation);
        Ok(id)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<TaskInvocation>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&job_id).cloned())
    }

    async fn query(&self, query: &InvocationQuery) -> Result<Vec<TaskInvocation>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut result: Vec<_> = map.values().filter(|i| query.matches(i)).cloned().collect();

        // job ids are v7 so they break ties in creation order
        result.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.job_id.cmp(&a.job_id))
        });
        result.truncate(query.effective_limit());
        Ok(result)
    }
}

#[async_trait]
impl<S: TaskInvocationStore + ?Sized> TaskInvocationStore for Arc<S> {
    async fn insert(&self, invocation: TaskInvocation) -> Result<JobId, StoreError> {
        (**self).insert(invocation).await
    }

    async fn get(&self, job_id: JobId) -> Result<Option<TaskInvocation>, StoreError> {
        (**self).get(job_id).await
    }

    async fn query(&self, query: &InvocationQuery) -> Result<Vec<TaskInvocation>, StoreError> {
        (**self).query(query).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn invocation(entity: EntityRef, task_type: TaskType, age_secs: i64) -> TaskInvocation {
        let completed_at = Utc::now() - Duration::seconds(age_secs);
        TaskInvocation {
            job_id: JobId::new(),
            task_type,
            actor: ActorId::system(),
            entity,
            input: serde_json::json!({}),
            output: serde_json::json!({"ok": true}),
            used_fallback: true,
            success: true,
            fallback_reason: Some("flag_disabled".to_string()),
            correlation_id: CorrelationId::new(),
            created_at: completed_at,
            completed_at,
        }
    }

    #[tokio::test]
    async fn query_is_newest_first_and_filtered() {
        let store = InMemoryTaskInvocationStore::new();
        let p1 = EntityRef::provider("p_1").unwrap();
        let p2 = EntityRef::provider("p_2").unwrap();

        let old = store
            .insert(invocation(p1.clone(), TaskType::ProviderQualitySummary, 300))
            .await
            .unwrap();
        let new = store
            .insert(invocation(p1.clone(), TaskType::ProviderQualitySummary, 10))
            .await
            .unwrap();
        store
            .insert(invocation(p1.clone(), TaskType::ProviderBriefGenerate, 5))
            .await
            .unwrap();
        store
            .insert(invocation(p2, TaskType::ProviderQualitySummary, 1))
            .await
            .unwrap();

        let q = InvocationQuery::for_entity(&p1).with_task_type(Some(TaskType::ProviderQualitySummary));
        let ids: Vec<_> = store.query(&q).await.unwrap().into_iter().map(|i| i.job_id).collect();
        assert_eq!(ids, vec![new, old]);

        let by_task = InvocationQuery {
            task_type: Some(TaskType::ProviderQualitySummary),
            ..InvocationQuery::default()
        };
        assert_eq!(store.query(&by_task).await.unwrap().len(), 3);

        let by_type = InvocationQuery {
            entity_type: Some(EntityType::Provider),
            limit: Some(2),
            ..InvocationQuery::default()
        };
        assert_eq!(store.query(&by_type).await.unwrap().len(), 2);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(InvocationQuery::default().effective_limit(), DEFAULT_QUERY_LIMIT);
        assert_eq!(InvocationQuery::default().with_limit(0).effective_limit(), 1);
        assert_eq!(InvocationQuery::default().with_limit(10_000).effective_limit(), MAX_QUERY_LIMIT);
    }

    #[tokio::test]
    async fn duplicate_job_id_is_rejected() {
        let store = InMemoryTaskInvocationStore::new();
        let inv = invocation(EntityRef::customer("c_1").unwrap(), TaskType::CrmNextBestAction, 0);
        store.insert(inv.clone()).await.unwrap();
        assert!(matches!(store.insert(inv).await, Err(StoreError::AlreadyExists(_))));
    }
}
