use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Region {
    pub id: Uuid,
    pub adventure_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub history: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Subregion {
    pub id: Uuid,
    pub region_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateRegion {
    pub adventure_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub history: Option<String>,
}

impl CreateRegion {
    pub fn named(adventure_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            adventure_id,
            name: name.into(),
            description: None,
            history: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateSubregion {
    pub name: String,
    pub description: Option<String>,
}

impl Region {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateRegion,
        region_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"INSERT INTO regions (id, adventure_id, name, description, history)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, adventure_id, name, description, history, created_at, updated_at"#,
        )
        .bind(region_id)
        .bind(data.adventure_id)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(&data.history)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"SELECT id, adventure_id, name, description, history, created_at, updated_at
               FROM regions
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_adventure_id<'e, E>(
        executor: E,
        adventure_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Region>(
            r#"SELECT id, adventure_id, name, description, history, created_at, updated_at
               FROM regions
               WHERE adventure_id = $1
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(adventure_id)
        .fetch_all(executor)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: String,
        description: Option<String>,
        history: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"UPDATE regions
               SET name = $2, description = $3, history = $4, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, adventure_id, name, description, history, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(description)
        .bind(history)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM regions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Subregion {
    pub async fn create<'e, E>(
        executor: E,
        region_id: Uuid,
        data: &CreateSubregion,
        subregion_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Subregion>(
            r#"INSERT INTO subregions (id, region_id, name, description)
               VALUES ($1, $2, $3, $4)
               RETURNING id, region_id, name, description, created_at"#,
        )
        .bind(subregion_id)
        .bind(region_id)
        .bind(data.name.trim())
        .bind(&data.description)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_region_id<'e, E>(
        executor: E,
        region_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Subregion>(
            r#"SELECT id, region_id, name, description, created_at
               FROM subregions
               WHERE region_id = $1
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(region_id)
        .fetch_all(executor)
        .await
    }

    /// Subregions of every region in the adventure, grouped by region creation order
    pub async fn find_by_adventure_id<'e, E>(
        executor: E,
        adventure_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Subregion>(
            r#"SELECT s.id, s.region_id, s.name, s.description, s.created_at
               FROM subregions s
               JOIN regions r ON r.id = s.region_id
               WHERE r.adventure_id = $1
               ORDER BY r.created_at ASC, r.rowid ASC, s.created_at ASC, s.rowid ASC"#,
        )
        .bind(adventure_id)
        .fetch_all(executor)
        .await
    }

    /// Make the region's subregions equal to `keep_ids` plus `new_subregions`.
    ///
    /// Subregions not listed in `keep_ids` are deleted (their mention links go
    /// with them). Runs on the caller's connection; wrap it in a transaction.
    pub async fn sync_for_region(
        conn: &mut SqliteConnection,
        region_id: Uuid,
        keep_ids: &[Uuid],
        new_subregions: &[CreateSubregion],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let existing = Self::find_by_region_id(&mut *conn, region_id).await?;
        for subregion in existing.iter().filter(|s| !keep_ids.contains(&s.id)) {
            sqlx::query("DELETE FROM subregions WHERE id = $1")
                .bind(subregion.id)
                .execute(&mut *conn)
                .await?;
        }

        for data in new_subregions {
            Self::create(&mut *conn, region_id, data, Uuid::new_v4()).await?;
        }

        Self::find_by_region_id(&mut *conn, region_id).await
    }
}
