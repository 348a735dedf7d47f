//! Keeps the mention links of an authored text in step with its body.

use db::models::{
    mention_link::{CreateMentionLink, EntityKind, MentionLink, SourceKind},
    note::Note,
    timeline_entry::TimelineEntry,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    config::{AmbiguityPolicy, MentionConfig},
    mention_catalog::{CatalogEntity, EntityCatalog, fold_name},
    mention_resolver::{EntityResolver, ResolutionPass},
    mention_tokenizer::{MentionKind, RawToken, tokenize},
};

const SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum MentionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{kind} {id} not found")]
    SourceNotFound { kind: SourceKind, id: Uuid },
    #[error("mention {token} matches {candidates} entities with the same name")]
    AmbiguousMention { token: String, candidates: usize },
}

/// The authored text owning a set of links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub struct MentionSource {
    pub kind: SourceKind,
    pub id: Uuid,
}

impl MentionSource {
    pub fn timeline_entry(id: Uuid) -> Self {
        Self {
            kind: SourceKind::TimelineEntry,
            id,
        }
    }

    pub fn note(id: Uuid) -> Self {
        Self {
            kind: SourceKind::Note,
            id,
        }
    }
}

/// What a save wrote, and what it could not link
#[derive(Debug, Clone, Serialize, TS)]
pub struct MentionSaveReport {
    pub source: MentionSource,
    pub links: Vec<MentionLink>,
    pub unresolved: Vec<RawToken>,
    pub catalog_digest: String,
}

/// An authored text together with the links its last save produced
#[derive(Debug, Clone, Serialize)]
pub struct WithMentions<T> {
    #[serde(flatten)]
    pub item: T,
    pub mentions: MentionSaveReport,
}

impl<T> std::ops::Deref for WithMentions<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

#[derive(Debug, Clone)]
pub struct MentionService {
    pool: SqlitePool,
    config: MentionConfig,
}

impl MentionService {
    pub fn new(pool: SqlitePool, config: MentionConfig) -> Self {
        Self { pool, config }
    }

    /// Entities of `kind` whose name contains `query`, ignoring case, in catalog
    /// order. Feeds the picker shown while a `@`/`#` token is being typed.
    pub async fn suggest(
        &self,
        adventure_id: Uuid,
        kind: MentionKind,
        query: &str,
    ) -> Result<Vec<CatalogEntity>, MentionError> {
        let mut conn = self.pool.acquire().await?;
        let catalog = EntityCatalog::fetch(&mut conn, adventure_id).await?;
        let needle = fold_name(query);

        let suggestions: Vec<CatalogEntity> = catalog
            .entities()
            .iter()
            .filter(|entity| entity.mention_kind() == kind)
            .filter(|entity| entity.name().to_lowercase().contains(&needle))
            .take(SUGGESTION_LIMIT)
            .cloned()
            .collect();

        debug!(
            adventure_id = %catalog.adventure_id(),
            kind = %kind,
            query,
            found = suggestions.len(),
            "Mention suggestions"
        );
        Ok(suggestions)
    }

    /// Names of the entities that `text` mentions with tokens of `kind`,
    /// resolved against the current catalog. Lets a caller check a text
    /// before saving it.
    pub async fn extract_mentions(
        &self,
        adventure_id: Uuid,
        text: &str,
        kind: MentionKind,
    ) -> Result<Vec<String>, MentionError> {
        let mut conn = self.pool.acquire().await?;
        let catalog = EntityCatalog::fetch(&mut conn, adventure_id).await?;
        let pass = EntityResolver::new(&catalog, self.config.ambiguity)
            .resolve_all(tokenize(text, kind));
        reject_ambiguous(&pass)?;
        Ok(pass.entity_names())
    }

    /// Replace the links of `source` with those resolved from `text`, atomically.
    pub async fn save_mentions(
        &self,
        source: MentionSource,
        text: &str,
    ) -> Result<MentionSaveReport, MentionError> {
        let mut tx = self.pool.begin().await?;
        let (adventure_id, _) = load_source(&mut tx, source).await?;
        let report = self
            .save_mentions_in(&mut tx, adventure_id, source, text)
            .await?;
        tx.commit().await?;
        Ok(report)
    }

    /// The save cycle on a caller's connection: fetch catalog, resolve, delete
    /// old links, insert new ones. Run it inside the transaction that writes
    /// the text so both commit or neither does.
    pub async fn save_mentions_in(
        &self,
        conn: &mut SqliteConnection,
        adventure_id: Uuid,
        source: MentionSource,
        text: &str,
    ) -> Result<MentionSaveReport, MentionError> {
        let catalog = EntityCatalog::fetch(conn, adventure_id).await?;
        let pass = self.resolve_text(&catalog, text);
        reject_ambiguous(&pass)?;

        let catalog_digest = catalog.digest();
        let input_digest = fingerprint_input(text, self.config.ambiguity);
        let removed = MentionLink::delete_by_source(&mut *conn, source.kind, source.id).await?;

        let mut links = Vec::with_capacity(pass.resolved.len());
        for mention in &pass.resolved {
            let data = CreateMentionLink {
                source_kind: source.kind,
                source_id: source.id,
                entity_kind: mention.entity.entity_kind(),
                entity_id: mention.entity.id(),
                raw_token: mention.token.raw(),
                token_offset: mention.token.offset as i64,
                catalog_digest: catalog_digest.clone(),
                input_digest: input_digest.clone(),
            };
            links.push(MentionLink::create(&mut *conn, &data, Uuid::new_v4()).await?);
        }

        info!(
            source_kind = %source.kind,
            source_id = %source.id,
            removed,
            linked = links.len(),
            unresolved = pass.unresolved.len(),
            "Saved mention links"
        );

        Ok(MentionSaveReport {
            source,
            links,
            unresolved: pass.unresolved,
            catalog_digest,
        })
    }

    pub async fn links_for_source(
        &self,
        source: MentionSource,
    ) -> Result<Vec<MentionLink>, MentionError> {
        Ok(MentionLink::find_by_source(&self.pool, source.kind, source.id).await?)
    }

    /// Every link pointing at an entity, e.g. to list where an NPC appears
    pub async fn sources_mentioning(
        &self,
        entity_kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<MentionLink>, MentionError> {
        Ok(MentionLink::find_by_entity(&self.pool, entity_kind, entity_id).await?)
    }

    /// True when saving the source's current text now would produce different
    /// links than the stored ones, e.g. after an entity was renamed or added.
    ///
    /// Links written from this exact body, catalog and policy are fresh as is;
    /// anything else is settled by resolving the body again.
    pub async fn is_stale(&self, source: MentionSource) -> Result<bool, MentionError> {
        let mut conn = self.pool.acquire().await?;
        let (adventure_id, body) = load_source(&mut conn, source).await?;
        let stored = MentionLink::find_by_source(&mut *conn, source.kind, source.id).await?;
        let catalog = EntityCatalog::fetch(&mut conn, adventure_id).await?;
        let catalog_digest = catalog.digest();
        let input_digest = fingerprint_input(&body, self.config.ambiguity);

        if !stored.is_empty()
            && stored.iter().all(|link| {
                link.catalog_digest == catalog_digest && link.input_digest == input_digest
            })
        {
            return Ok(false);
        }

        let pass = self.resolve_text(&catalog, &body);
        if !pass.ambiguous.is_empty() {
            return Ok(true);
        }

        let fresh: Vec<(Uuid, i64)> = pass
            .resolved
            .iter()
            .map(|m| (m.entity.id(), m.token.offset as i64))
            .collect();
        let current: Vec<(Uuid, i64)> = stored
            .iter()
            .map(|link| (link.entity_id, link.token_offset))
            .collect();
        Ok(fresh != current)
    }

    /// Both token families of `text`, resolved in text order
    fn resolve_text(&self, catalog: &EntityCatalog, text: &str) -> ResolutionPass {
        let mut tokens: Vec<RawToken> = MentionKind::ALL
            .into_iter()
            .flat_map(|kind| tokenize(text, kind))
            .collect();
        tokens.sort_by_key(|token| token.offset);
        EntityResolver::new(catalog, self.config.ambiguity).resolve_all(tokens)
    }
}

/// SHA-256 over the policy and the scanned text
fn fingerprint_input(text: &str, policy: AmbiguityPolicy) -> String {
    let mut hasher = Sha256::new();
    hasher.update(policy.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn reject_ambiguous(pass: &ResolutionPass) -> Result<(), MentionError> {
    match pass.ambiguous.first() {
        Some(ambiguous) => {
            let token = ambiguous.token.raw();
            warn!(
                token = %token,
                candidates = ambiguous.candidates.len(),
                "Refusing ambiguous mention"
            );
            Err(MentionError::AmbiguousMention {
                token,
                candidates: ambiguous.candidates.len(),
            })
        }
        None => Ok(()),
    }
}

/// Adventure and body text of an authored text
async fn load_source(
    conn: &mut SqliteConnection,
    source: MentionSource,
) -> Result<(Uuid, String), MentionError> {
    let found = match source.kind {
        SourceKind::TimelineEntry => TimelineEntry::find_by_id(&mut *conn, source.id)
            .await?
            .map(|entry| (entry.adventure_id, entry.body().to_string())),
        SourceKind::Note => Note::find_by_id(&mut *conn, source.id)
            .await?
            .map(|note| (note.adventure_id, note.body().to_string())),
    };

    found.ok_or(MentionError::SourceNotFound {
        kind: source.kind,
        id: source.id,
    })
}
