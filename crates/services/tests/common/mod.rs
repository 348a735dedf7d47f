#![allow(dead_code)]

use db::{
    DBService,
    models::{
        adventure::{Adventure, CreateAdventure},
        character::{Character, CreateCharacter},
        region::{CreateRegion, CreateSubregion, Region, Subregion},
    },
};
use services::services::{
    campaign::Campaign,
    config::{AmbiguityPolicy, Config, MentionConfig},
};
use sqlx::SqlitePool;
use uuid::Uuid;

/// A migrated in-memory campaign with one adventure
pub struct Fixture {
    pub campaign: Campaign,
    pub adventure_id: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_policy(AmbiguityPolicy::Reject).await
    }

    pub async fn with_policy(ambiguity: AmbiguityPolicy) -> Self {
        utils::logging::init_test_tracing();

        let db = DBService::new_in_memory()
            .await
            .expect("in-memory database");
        let config = Config {
            database_url: None,
            mentions: MentionConfig { ambiguity },
        };
        let campaign = Campaign::with_db(db, &config);
        let adventure_id = add_adventure(&campaign.db.pool, "Curse of Strahd").await;

        Self {
            campaign,
            adventure_id,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.campaign.db.pool
    }

    pub async fn npc(&self, name: &str) -> Character {
        Character::create(
            self.pool(),
            &CreateCharacter::npc(self.adventure_id, name),
            Uuid::new_v4(),
        )
        .await
        .expect("create npc")
    }

    pub async fn player(&self, name: &str) -> Character {
        Character::create(
            self.pool(),
            &CreateCharacter::player(self.adventure_id, name),
            Uuid::new_v4(),
        )
        .await
        .expect("create player")
    }

    pub async fn region(&self, name: &str) -> Region {
        Region::create(
            self.pool(),
            &CreateRegion::named(self.adventure_id, name),
            Uuid::new_v4(),
        )
        .await
        .expect("create region")
    }

    pub async fn subregion(&self, region_id: Uuid, name: &str) -> Subregion {
        Subregion::create(
            self.pool(),
            region_id,
            &CreateSubregion {
                name: name.to_string(),
                description: None,
            },
            Uuid::new_v4(),
        )
        .await
        .expect("create subregion")
    }
}

pub async fn add_adventure(pool: &SqlitePool, title: &str) -> Uuid {
    let adventure = Adventure::create(
        pool,
        &CreateAdventure {
            title: title.to_string(),
            description: None,
        },
        Uuid::new_v4(),
    )
    .await
    .expect("create adventure");
    adventure.id
}
