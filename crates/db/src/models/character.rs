use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Which roster a character belongs to
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "character_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CharacterKind {
    Npc,
    Player,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Character {
    pub id: Uuid,
    pub adventure_id: Uuid,
    pub name: String,
    pub kind: CharacterKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateCharacter {
    pub adventure_id: Uuid,
    pub name: String,
    pub kind: CharacterKind,
    pub description: Option<String>,
}

impl CreateCharacter {
    pub fn npc(adventure_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            adventure_id,
            name: name.into(),
            kind: CharacterKind::Npc,
            description: None,
        }
    }

    pub fn player(adventure_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            adventure_id,
            name: name.into(),
            kind: CharacterKind::Player,
            description: None,
        }
    }
}

impl Character {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateCharacter,
        character_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Character>(
            r#"INSERT INTO characters (id, adventure_id, name, kind, description)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, adventure_id, name, kind, description, created_at, updated_at"#,
        )
        .bind(character_id)
        .bind(data.adventure_id)
        .bind(data.name.trim())
        .bind(data.kind)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Character>(
            r#"SELECT id, adventure_id, name, kind, description, created_at, updated_at
               FROM characters
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Both rosters, NPCs first, each in creation order
    pub async fn find_by_adventure_id<'e, E>(
        executor: E,
        adventure_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Character>(
            r#"SELECT id, adventure_id, name, kind, description, created_at, updated_at
               FROM characters
               WHERE adventure_id = $1
               ORDER BY CASE kind WHEN 'npc' THEN 0 ELSE 1 END, created_at ASC, rowid ASC"#,
        )
        .bind(adventure_id)
        .fetch_all(executor)
        .await
    }

    /// Renaming does not touch existing mention links; they stay keyed by id.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Character>(
            r#"UPDATE characters
               SET name = $2, description = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, name, kind, description, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(description)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
