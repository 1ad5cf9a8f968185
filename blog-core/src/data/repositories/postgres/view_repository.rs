use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{is_foreign_key_violation, map_db_error};
use crate::data::view_repository::{NewView, ViewRepository};
use crate::domain::error::DomainError;
use crate::domain::view::View;

#[derive(Debug, Clone)]
pub struct PostgresViewRepository {
    pool: PgPool,
}

impl PostgresViewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    id: i64,
    post_id: i64,
    viewer_id: i64,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl ViewRepository for PostgresViewRepository {
    async fn create_view(&self, input: NewView) -> Result<View, DomainError> {
        let row = sqlx::query_as::<_, ViewRow>(
            r#"
            INSERT INTO views (post_id, viewer_id)
            VALUES ($1, $2)
            RETURNING id, post_id, viewer_id, created_at
            "#,
        )
        .bind(input.post_id)
        .bind(input.viewer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                DomainError::UserNotFound(format!("viewer id: {}", input.viewer_id))
            } else {
                map_db_error(err)
            }
        })?;

        Ok(View {
            id: row.id,
            post_id: row.post_id,
            viewer_id: row.viewer_id,
            created_at: row.created_at,
        })
    }

    async fn total_views(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM views"#)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM views")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}
