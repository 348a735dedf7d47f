use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Adventure {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAdventure {
    pub title: String,
    pub description: Option<String>,
}

impl Adventure {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateAdventure,
        adventure_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Adventure>(
            r#"INSERT INTO adventures (id, title, description)
               VALUES ($1, $2, $3)
               RETURNING id, title, description, created_at, updated_at"#,
        )
        .bind(adventure_id)
        .bind(&data.title)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Adventure>(
            r#"SELECT id, title, description, created_at, updated_at
               FROM adventures
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Adventure>(
            r#"SELECT id, title, description, created_at, updated_at
               FROM adventures
               ORDER BY created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        title: String,
        description: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Adventure>(
            r#"UPDATE adventures
               SET title = $2, description = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, title, description, created_at, updated_at"#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    /// Deleting an adventure cascades to everything it owns, mention links included.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM adventures WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
