use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Kind of authored text a link belongs to
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "mention_source_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    TimelineEntry,
    Note,
}

/// Kind of catalog entity a link points at
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "mention_entity_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Character,
    Region,
    Subregion,
}

/// A resolved `@name` / `#name` token inside an authored text.
///
/// Rows are only ever written as a whole set per source: the previous set is
/// deleted and the new one inserted in the same transaction.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MentionLink {
    pub id: Uuid,
    pub source_kind: SourceKind,
    pub source_id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub raw_token: String,   // as typed, prefix included, case preserved
    pub token_offset: i64,   // byte offset of the prefix in the source text
    pub catalog_digest: String, // fingerprint of the catalog the token was resolved against
    pub input_digest: String,   // fingerprint of the scanned text and ambiguity policy
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMentionLink {
    pub source_kind: SourceKind,
    pub source_id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub raw_token: String,
    pub token_offset: i64,
    pub catalog_digest: String,
    pub input_digest: String,
}

impl MentionLink {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateMentionLink,
        link_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, MentionLink>(
            r#"INSERT INTO mention_links (id, source_kind, source_id, entity_kind, entity_id, raw_token, token_offset, catalog_digest, input_digest)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id, source_kind, source_id, entity_kind, entity_id, raw_token, token_offset, catalog_digest, input_digest, created_at"#,
        )
        .bind(link_id)
        .bind(data.source_kind)
        .bind(data.source_id)
        .bind(data.entity_kind)
        .bind(data.entity_id)
        .bind(&data.raw_token)
        .bind(data.token_offset)
        .bind(&data.catalog_digest)
        .bind(&data.input_digest)
        .fetch_one(executor)
        .await
    }

    /// Links of one authored text, in token order
    pub async fn find_by_source<'e, E>(
        executor: E,
        source_kind: SourceKind,
        source_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, MentionLink>(
            r#"SELECT id, source_kind, source_id, entity_kind, entity_id, raw_token, token_offset, catalog_digest, input_digest, created_at
               FROM mention_links
               WHERE source_kind = $1 AND source_id = $2
               ORDER BY token_offset ASC, rowid ASC"#,
        )
        .bind(source_kind)
        .bind(source_id)
        .fetch_all(executor)
        .await
    }

    /// Every link pointing at an entity, newest first
    pub async fn find_by_entity(
        pool: &SqlitePool,
        entity_kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MentionLink>(
            r#"SELECT id, source_kind, source_id, entity_kind, entity_id, raw_token, token_offset, catalog_digest, input_digest, created_at
               FROM mention_links
               WHERE entity_kind = $1 AND entity_id = $2
               ORDER BY created_at DESC, rowid DESC"#,
        )
        .bind(entity_kind)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete_by_source<'e, E>(
        executor: E,
        source_kind: SourceKind,
        source_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("DELETE FROM mention_links WHERE source_kind = $1 AND source_id = $2")
                .bind(source_kind)
                .bind(source_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }
}
