//! `feature_flags` table as a [`FlagSource`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use homefix_ai::flags::validate_flag_key;
use homefix_ai::{FeatureFlag, FlagSource, FlagSourceError};
use homefix_core::ActorId;

#[derive(Debug, Clone)]
pub struct PostgresFlagSource {
    pool: Arc<PgPool>,
}

impl PostgresFlagSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn unavailable(operation: &str, err: sqlx::Error) -> FlagSourceError {
    FlagSourceError::Unavailable(format!("{operation}: {err}"))
}

fn to_flag(row: &sqlx::postgres::PgRow) -> Result<FeatureFlag, sqlx::Error> {
    Ok(FeatureFlag {
        flag_key: row.try_get("flag_key")?,
        enabled: row.try_get("enabled")?,
        updated_by: row.try_get("updated_by")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl FlagSource for PostgresFlagSource {
    async fn fetch(&self, flag_key: &str) -> Result<Option<FeatureFlag>, FlagSourceError> {
        let row = sqlx::query(
            "SELECT flag_key, enabled, updated_by, updated_at FROM feature_flags WHERE flag_key = $1",
        )
        .bind(flag_key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| unavailable("fetch_flag", e))?;

        row.as_ref()
            .map(to_flag)
            .transpose()
            .map_err(|e| unavailable("decode_flag", e))
    }

    async fn upsert(
        &self,
        flag_key: &str,
        enabled: bool,
        updated_by: &ActorId,
    ) -> Result<FeatureFlag, FlagSourceError> {
        validate_flag_key(flag_key)?;
        let row = sqlx::query(
            r#"
            INSERT INTO feature_flags (flag_key, enabled, updated_by, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (flag_key)
            DO UPDATE SET
                enabled = EXCLUDED.enabled,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            RETURNING flag_key, enabled, updated_by, updated_at
            "#,
        )
        .bind(flag_key)
        .bind(enabled)
        .bind(updated_by.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| unavailable("upsert_flag", e))?;

        to_flag(&row).map_err(|e| unavailable("decode_flag", e))
    }

    async fn list(&self) -> Result<Vec<FeatureFlag>, FlagSourceError> {
        let rows = sqlx::query(
            "SELECT flag_key, enabled, updated_by, updated_at FROM feature_flags ORDER BY flag_key",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| unavailable("list_flags", e))?;

        rows.iter()
            .map(to_flag)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| unavailable("decode_flag", e))
    }
}
