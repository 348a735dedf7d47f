use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A kanban card. The content body is an authored text whose mentions are linked.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Note {
    pub id: Uuid,
    pub adventure_id: Uuid,
    pub chapter_id: Option<Uuid>, // None when unassigned or its chapter was deleted
    pub title: String,
    pub content: Option<String>,
    pub order_index: i64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateNote {
    pub adventure_id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateNote {
    pub title: String,
    pub content: Option<String>,
    pub chapter_id: Option<Uuid>,
}

impl Note {
    pub fn body(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Appends the note after the last one of its chapter (or of the unassigned
    /// pile). Indexes are not repacked on delete, so gaps are expected.
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateNote,
        note_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Note>(
            r#"INSERT INTO notes (id, adventure_id, chapter_id, title, content, order_index)
               VALUES ($1, $2, $3, $4, $5,
                       (SELECT COALESCE(MAX(order_index) + 1, 0) FROM notes
                        WHERE adventure_id = $2 AND chapter_id IS $3))
               RETURNING id, adventure_id, chapter_id, title, content, order_index, completed, created_at, updated_at"#,
        )
        .bind(note_id)
        .bind(data.adventure_id)
        .bind(data.chapter_id)
        .bind(&data.title)
        .bind(&data.content)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Note>(
            r#"SELECT id, adventure_id, chapter_id, title, content, order_index, completed, created_at, updated_at
               FROM notes
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_chapter_id(
        pool: &SqlitePool,
        chapter_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"SELECT id, adventure_id, chapter_id, title, content, order_index, completed, created_at, updated_at
               FROM notes
               WHERE chapter_id = $1
               ORDER BY order_index ASC, created_at ASC"#,
        )
        .bind(chapter_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_unassigned(
        pool: &SqlitePool,
        adventure_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"SELECT id, adventure_id, chapter_id, title, content, order_index, completed, created_at, updated_at
               FROM notes
               WHERE adventure_id = $1 AND chapter_id IS NULL
               ORDER BY order_index ASC, created_at ASC"#,
        )
        .bind(adventure_id)
        .fetch_all(pool)
        .await
    }

    /// A note moved to another chapter goes to the end of it
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateNote,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Note>(
            r#"UPDATE notes
               SET title = $2,
                   content = $3,
                   order_index = CASE
                       WHEN chapter_id IS $4 THEN order_index
                       ELSE (SELECT COALESCE(MAX(n.order_index) + 1, 0) FROM notes AS n
                             WHERE n.adventure_id = notes.adventure_id AND n.chapter_id IS $4)
                   END,
                   chapter_id = $4,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, chapter_id, title, content, order_index, completed, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(data.chapter_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_completed(
        pool: &SqlitePool,
        id: Uuid,
        completed: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"UPDATE notes
               SET completed = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, chapter_id, title, content, order_index, completed, created_at, updated_at"#,
        )
        .bind(id)
        .bind(completed)
        .fetch_optional(pool)
        .await
    }

    /// Move every note of a chapter to the end of the unassigned pile, keeping
    /// their relative order. Run before deleting the chapter.
    pub async fn unassign_chapter(
        conn: &mut SqliteConnection,
        adventure_id: Uuid,
        chapter_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let base = sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(MAX(order_index) + 1, 0) FROM notes
               WHERE adventure_id = $1 AND chapter_id IS NULL"#,
        )
        .bind(adventure_id)
        .fetch_one(&mut *conn)
        .await?;

        let result = sqlx::query(
            r#"UPDATE notes
               SET chapter_id = NULL,
                   order_index = order_index + $2,
                   updated_at = datetime('now', 'subsec')
               WHERE chapter_id = $1"#,
        )
        .bind(chapter_id)
        .bind(base)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mention links of the note are removed by the `notes_drop_mentions` trigger
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
