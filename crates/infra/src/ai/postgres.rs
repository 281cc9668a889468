//! Postgres-backed invocation and feedback stores.
//!
//! Schema: `migrations/0001_ai_tasks.sql`. Optional filters are bound as typed
//! NULLs (`$n::text IS NULL OR col = $n`) so each query is a single statement.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use homefix_ai::TaskType;
use homefix_core::{ActorId, CorrelationId, EntityRef, EntityType, FeedbackId, JobId};

use super::feedback::{FeedbackRecord, FeedbackStore, Rating};
use super::invocation::{InvocationQuery, StoreError, TaskInvocation, TaskInvocationStore};

/// Map SQLx errors to [`StoreError`]; unique violations become `AlreadyExists`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists(msg),
                _ => StoreError::Storage(msg),
            }
        }
        other => StoreError::Storage(format!("{operation}: {other}")),
    }
}

fn decode_error(column: &str, detail: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: detail.to_string().into(),
    }
}

struct InvocationRow(TaskInvocation);

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for InvocationRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let task_type: String = row.try_get("task_type")?;
        let entity_type: String = row.try_get("entity_type")?;
        let entity_id: String = row.try_get("entity_id")?;
        let actor: String = row.try_get("actor_id")?;

        let task_type: TaskType = task_type.parse().map_err(|e| decode_error("task_type", e))?;
        let entity_type: EntityType = entity_type
            .parse()
            .map_err(|e| decode_error("entity_type", e))?;
        let entity = EntityRef::new(entity_type, entity_id).map_err(|e| decode_error("entity_id", e))?;
        let actor = ActorId::new(actor).map_err(|e| decode_error("actor_id", e))?;

        Ok(InvocationRow(TaskInvocation {
            job_id: JobId::from_uuid(row.try_get("job_id")?),
            task_type,
            actor,
            entity,
            input: row.try_get("input_json")?,
            output: row.try_get("output_json")?,
            used_fallback: row.try_get("used_fallback")?,
            success: row.try_get("success")?,
            fallback_reason: row.try_get("fallback_reason")?,
            correlation_id: CorrelationId::from_uuid(row.try_get("correlation_id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            completed_at: row.try_get::<DateTime<Utc>, _>("completed_at")?,
        }))
    }
}

const INVOCATION_COLUMNS: &str = "job_id, task_type, actor_id, entity_type, entity_id, input_json, \
     output_json, used_fallback, success, fallback_reason, correlation_id, created_at, completed_at";

#[derive(Debug, Clone)]
pub struct PostgresTaskInvocationStore {
    pool: Arc<PgPool>,
}

impl PostgresTaskInvocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl TaskInvocationStore for PostgresTaskInvocationStore {
    #[instrument(skip_all, fields(job_id = %invocation.job_id, task_type = %invocation.task_type), err)]
    async fn insert(&self, invocation: TaskInvocation) -> Result<JobId, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ai_task_invocations (
                job_id, task_type, actor_id, entity_type, entity_id, input_json, output_json,
                used_fallback, success, fallback_reason, correlation_id, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(invocation.job_id.as_uuid())
        .bind(invocation.task_type.as_str())
        .bind(invocation.actor.as_str())
        .bind(invocation.entity.entity_type.as_str())
        .bind(&invocation.entity.entity_id)
        .bind(&invocation.input)
        .bind(&invocation.output)
        .bind(invocation.used_fallback)
        .bind(invocation.success)
        .bind(invocation.fallback_reason.as_deref())
        .bind(invocation.correlation_id.as_uuid())
        .bind(invocation.created_at)
        .bind(invocation.completed_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_invocation", e))?;

        Ok(invocation.job_id)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<TaskInvocation>, StoreError> {
        let sql = format!("SELECT {INVOCATION_COLUMNS} FROM ai_task_invocations WHERE job_id = $1");
        let row = sqlx::query(&sql)
            .bind(job_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_invocation", e))?;

        row.map(|r| InvocationRow::from_row(&r).map(|r| r.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_invocation", e))
    }

    #[instrument(skip(self), err)]
    async fn query(&self, query: &InvocationQuery) -> Result<Vec<TaskInvocation>, StoreError> {
        let sql = format!(
            r#"
            SELECT {INVOCATION_COLUMNS}
            FROM ai_task_invocations
            WHERE ($1::text IS NULL OR entity_type = $1)
                AND ($2::text IS NULL OR entity_id = $2)
                AND ($3::text IS NULL OR task_type = $3)
            ORDER BY completed_at DESC, job_id DESC
            LIMIT $4
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(query.entity_type.map(|t| t.as_str()))
            .bind(query.entity_id.as_deref())
            .bind(query.task_type.map(|t| t.as_str()))
            .bind(query.effective_limit() as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_invocations", e))?;

        rows.iter()
            .map(|r| InvocationRow::from_row(r).map(|r| r.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_invocation", e))
    }
}

struct FeedbackRow(FeedbackRecord);

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for FeedbackRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let rating: String = row.try_get("rating")?;
        let actor: String = row.try_get("actor_id")?;
        Ok(FeedbackRow(FeedbackRecord {
            feedback_id: FeedbackId::from_uuid(row.try_get("feedback_id")?),
            job_id: JobId::from_uuid(row.try_get("job_id")?),
            actor: ActorId::new(actor).map_err(|e| decode_error("actor_id", e))?,
            rating: rating.parse::<Rating>().map_err(|e| decode_error("rating", e))?,
            reason_code: row.try_get("reason_code")?,
            comment: row.try_get("comment")?,
            context_snapshot: row.try_get("context_snapshot")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresFeedbackStore {
    pool: Arc<PgPool>,
}

impl PostgresFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl FeedbackStore for PostgresFeedbackStore {
    #[instrument(skip_all, fields(job_id = %record.job_id), err)]
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackId, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ai_feedback (
                feedback_id, job_id, actor_id, rating, reason_code, comment, context_snapshot, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.feedback_id.as_uuid())
        .bind(record.job_id.as_uuid())
        .bind(record.actor.as_str())
        .bind(record.rating.as_str())
        .bind(record.reason_code.as_deref())
        .bind(record.comment.as_deref())
        .bind(record.context_snapshot.as_ref())
        .bind(record.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_feedback", e))?;

        Ok(record.feedback_id)
    }

    async fn list_for_job(&self, job_id: JobId) -> Result<Vec<FeedbackRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT feedback_id, job_id, actor_id, rating, reason_code, comment, context_snapshot, created_at
            FROM ai_feedback
            WHERE job_id = $1
            ORDER BY created_at ASC, feedback_id ASC
            "#,
        )
        .bind(job_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_feedback", e))?;

        rows.iter()
            .map(|r| FeedbackRow::from_row(r).map(|r| r.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_feedback", e))
    }
}

const SCHEMA: &str = include_str!("../../migrations/0001_ai_tasks.sql");

/// Apply the bundled schema. Every statement is `IF NOT EXISTS`, so reruns are harmless.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("run_migrations", e))?;
    Ok(())
}
