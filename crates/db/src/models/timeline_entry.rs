use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// One moment in an adventure's session log. Entries form a dense sequence
/// `0..n` by `order_index` within an adventure.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub adventure_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTimelineEntry {
    pub adventure_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateTimelineEntry {
    pub title: String,
    pub description: Option<String>,
}

impl TimelineEntry {
    pub fn body(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Appends at `order_index = <current entry count>`
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateTimelineEntry,
        entry_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TimelineEntry>(
            r#"INSERT INTO timeline_entries (id, adventure_id, title, description, order_index)
               VALUES ($1, $2, $3, $4,
                       (SELECT COUNT(*) FROM timeline_entries WHERE adventure_id = $2))
               RETURNING id, adventure_id, title, description, order_index, created_at, updated_at"#,
        )
        .bind(entry_id)
        .bind(data.adventure_id)
        .bind(&data.title)
        .bind(&data.description)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TimelineEntry>(
            r#"SELECT id, adventure_id, title, description, order_index, created_at, updated_at
               FROM timeline_entries
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
        sqlx::query_as::<_, TimelineEntry>(
            r#"SELECT id, adventure_id, title, description, order_index, created_at, updated_at
               FROM timeline_entries
               WHERE adventure_id = $1
               ORDER BY order_index ASC"#,
        )
        .bind(adventure_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_order_index<'e, E>(
        executor: E,
        adventure_id: Uuid,
        order_index: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TimelineEntry>(
            r#"SELECT id, adventure_id, title, description, order_index, created_at, updated_at
               FROM timeline_entries
               WHERE adventure_id = $1 AND order_index = $2
               LIMIT 1"#,
        )
        .bind(adventure_id)
        .bind(order_index)
        .fetch_optional(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateTimelineEntry,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TimelineEntry>(
            r#"UPDATE timeline_entries
               SET title = $2, description = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, title, description, order_index, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_order_index<'e, E>(
        executor: E,
        id: Uuid,
        order_index: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE timeline_entries SET order_index = $2 WHERE id = $1")
            .bind(id)
            .bind(order_index)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Shift every entry after `removed_index` one slot up
    pub async fn compact_after<'e, E>(
        executor: E,
        adventure_id: Uuid,
        removed_index: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE timeline_entries
               SET order_index = order_index - 1
               WHERE adventure_id = $1 AND order_index > $2"#,
        )
        .bind(adventure_id)
        .bind(removed_index)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_adventure_id<'e, E>(
        executor: E,
        adventure_id: Uuid,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM timeline_entries WHERE adventure_id = $1")
            .bind(adventure_id)
            .fetch_one(executor)
            .await
    }

    /// Mention links of the entry are removed by the `timeline_entries_drop_mentions` trigger
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM timeline_entries WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
