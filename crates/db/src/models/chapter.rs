use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A kanban column grouping notes
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Chapter {
    pub id: Uuid,
    pub adventure_id: Uuid,
    pub title: String,
    pub order_index: i64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    /// Appends the chapter after the adventure's existing ones
    pub async fn create(
        pool: &SqlitePool,
        adventure_id: Uuid,
        title: &str,
        chapter_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Chapter>(
            r#"INSERT INTO chapters (id, adventure_id, title, order_index)
               VALUES ($1, $2, $3, (SELECT COUNT(*) FROM chapters WHERE adventure_id = $2))
               RETURNING id, adventure_id, title, order_index, is_completed, created_at, updated_at"#,
        )
        .bind(chapter_id)
        .bind(adventure_id)
        .bind(title)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Chapter>(
            r#"SELECT id, adventure_id, title, order_index, is_completed, created_at, updated_at
               FROM chapters
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_adventure_id(
        pool: &SqlitePool,
        adventure_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Chapter>(
            r#"SELECT id, adventure_id, title, order_index, is_completed, created_at, updated_at
               FROM chapters
               WHERE adventure_id = $1
               ORDER BY order_index ASC"#,
        )
        .bind(adventure_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_title(
        pool: &SqlitePool,
        id: Uuid,
        title: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Chapter>(
            r#"UPDATE chapters
               SET title = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, title, order_index, is_completed, created_at, updated_at"#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(pool)
        .await
    }

    pub async fn mark_completed(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Chapter>(
            r#"UPDATE chapters
               SET is_completed = 1, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, title, order_index, is_completed, created_at, updated_at"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Notes still in the chapter survive with `chapter_id` cleared (FK is ON DELETE SET NULL)
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Close the gap left by a deleted chapter at `removed_index`
    pub async fn compact_after<'e, E>(
        executor: E,
        adventure_id: Uuid,
        removed_index: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE chapters
               SET order_index = order_index - 1
               WHERE adventure_id = $1 AND order_index > $2"#,
        )
        .bind(adventure_id)
        .bind(removed_index)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
