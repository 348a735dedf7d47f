//! Snapshot of everything a mention can point at within one adventure.

use db::models::{
    character::{Character, CharacterKind},
    mention_link::EntityKind,
    region::{Region, Subregion},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use ts_rs::TS;
use uuid::Uuid;

use super::mention_tokenizer::MentionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEntity {
    Character {
        id: Uuid,
        name: String,
        kind: CharacterKind,
    },
    Region {
        id: Uuid,
        name: String,
    },
    Subregion {
        id: Uuid,
        name: String,
        region_id: Uuid,
    },
}

impl CatalogEntity {
    pub fn id(&self) -> Uuid {
        match self {
            CatalogEntity::Character { id, .. }
            | CatalogEntity::Region { id, .. }
            | CatalogEntity::Subregion { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogEntity::Character { name, .. }
            | CatalogEntity::Region { name, .. }
            | CatalogEntity::Subregion { name, .. } => name,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            CatalogEntity::Character { .. } => EntityKind::Character,
            CatalogEntity::Region { .. } => EntityKind::Region,
            CatalogEntity::Subregion { .. } => EntityKind::Subregion,
        }
    }

    /// The token family that can reach this entity
    pub fn mention_kind(&self) -> MentionKind {
        match self {
            CatalogEntity::Character { .. } => MentionKind::Character,
            CatalogEntity::Region { .. } | CatalogEntity::Subregion { .. } => MentionKind::Region,
        }
    }
}

impl From<Character> for CatalogEntity {
    fn from(character: Character) -> Self {
        CatalogEntity::Character {
            id: character.id,
            name: character.name,
            kind: character.kind,
        }
    }
}

impl From<Region> for CatalogEntity {
    fn from(region: Region) -> Self {
        CatalogEntity::Region {
            id: region.id,
            name: region.name,
        }
    }
}

impl From<Subregion> for CatalogEntity {
    fn from(subregion: Subregion) -> Self {
        CatalogEntity::Subregion {
            id: subregion.id,
            name: subregion.name,
            region_id: subregion.region_id,
        }
    }
}

/// Case-folded form used for every name comparison
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// All characters, regions and subregions of an adventure, in catalog order:
/// NPCs, players, regions, subregions.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    adventure_id: Uuid,
    entities: Vec<CatalogEntity>,
}

impl EntityCatalog {
    pub fn new(adventure_id: Uuid, entities: Vec<CatalogEntity>) -> Self {
        Self {
            adventure_id,
            entities,
        }
    }

    /// Read the catalog fresh from storage. Pass a transaction to resolve and
    /// write against the same snapshot.
    pub async fn fetch(
        conn: &mut SqliteConnection,
        adventure_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let characters = Character::find_by_adventure_id(&mut *conn, adventure_id).await?;
        let regions = Region::find_by_adventure_id(&mut *conn, adventure_id).await?;
        let subregions = Subregion::find_by_adventure_id(&mut *conn, adventure_id).await?;

        let entities = characters
            .into_iter()
            .map(CatalogEntity::from)
            .chain(regions.into_iter().map(CatalogEntity::from))
            .chain(subregions.into_iter().map(CatalogEntity::from))
            .collect();

        Ok(Self::new(adventure_id, entities))
    }

    pub fn adventure_id(&self) -> Uuid {
        self.adventure_id
    }

    pub fn entities(&self) -> &[CatalogEntity] {
        &self.entities
    }

    /// SHA-256 over kind, id and folded name of every entry, in order.
    /// Two catalogs with the same digest resolve every token identically.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for entity in &self.entities {
            hasher.update(entity.entity_kind().to_string().as_bytes());
            hasher.update(b":");
            hasher.update(entity.id().as_bytes());
            hasher.update(b":");
            hasher.update(fold_name(entity.name()).as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc(name: &str) -> CatalogEntity {
        CatalogEntity::Character {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: CharacterKind::Npc,
        }
    }

    #[test]
    fn test_fold_name_trims_and_lowercases() {
        assert_eq!(fold_name("  Strahd Von ZAROVICH "), "strahd von zarovich");
        assert_eq!(fold_name("Ölaf"), "ölaf");
    }

    #[test]
    fn test_digest_is_stable_for_same_entries() {
        let entities = vec![npc("Strahd"), npc("Ireena")];
        let a = EntityCatalog::new(Uuid::nil(), entities.clone());
        let b = EntityCatalog::new(Uuid::nil(), entities);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_digest_ignores_case_but_not_renames() {
        let id = Uuid::new_v4();
        let named = |name: &str| {
            EntityCatalog::new(
                Uuid::nil(),
                vec![CatalogEntity::Region {
                    id,
                    name: name.to_string(),
                }],
            )
        };
        assert_eq!(named("Barovia").digest(), named("BAROVIA").digest());
        assert_ne!(named("Barovia").digest(), named("Vallaki").digest());
    }

    #[test]
    fn test_mention_kind_of_entities() {
        let region = CatalogEntity::Region {
            id: Uuid::new_v4(),
            name: "Barovia".into(),
        };
        let subregion = CatalogEntity::Subregion {
            id: Uuid::new_v4(),
            name: "Old Bonegrinder".into(),
            region_id: region.id(),
        };
        assert_eq!(npc("Strahd").mention_kind(), MentionKind::Character);
        assert_eq!(region.mention_kind(), MentionKind::Region);
        assert_eq!(subregion.mention_kind(), MentionKind::Region);
        assert_eq!(subregion.entity_kind(), EntityKind::Subregion);
    }
}
