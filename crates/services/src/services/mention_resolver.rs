//! Matching raw tokens against an entity catalog.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};
use ts_rs::TS;

use super::{
    config::AmbiguityPolicy,
    mention_catalog::{CatalogEntity, EntityCatalog, fold_name},
    mention_tokenizer::{MentionKind, RawToken},
};

/// Outcome of resolving one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved(&'a CatalogEntity),
    Unresolved,
    /// More than one entity carries the name (only under `AmbiguityPolicy::Reject`)
    Ambiguous(Vec<&'a CatalogEntity>),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ResolvedMention {
    pub token: RawToken,
    pub entity: CatalogEntity,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct AmbiguousMention {
    pub token: RawToken,
    pub candidates: Vec<CatalogEntity>,
}

/// Every token of a text sorted into resolved, unresolved and ambiguous
#[derive(Debug, Clone, Default, Serialize, TS)]
pub struct ResolutionPass {
    pub resolved: Vec<ResolvedMention>,
    pub unresolved: Vec<RawToken>,
    pub ambiguous: Vec<AmbiguousMention>,
}

impl ResolutionPass {
    /// Distinct names of the resolved entities, catalog spelling, first occurrence first
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for mention in &self.resolved {
            let name = mention.entity.name();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// Exact, case-insensitive name lookup over one catalog snapshot.
///
/// Candidates are kept in catalog order, so the same folded name always
/// resolves to the same entity within one resolver.
pub struct EntityResolver<'a> {
    index: HashMap<(MentionKind, String), Vec<&'a CatalogEntity>>,
    policy: AmbiguityPolicy,
}

impl<'a> EntityResolver<'a> {
    pub fn new(catalog: &'a EntityCatalog, policy: AmbiguityPolicy) -> Self {
        let mut index: HashMap<(MentionKind, String), Vec<&'a CatalogEntity>> = HashMap::new();
        for entity in catalog.entities() {
            index
                .entry((entity.mention_kind(), fold_name(entity.name())))
                .or_default()
                .push(entity);
        }
        Self { index, policy }
    }

    pub fn resolve(&self, token: &RawToken) -> Resolution<'a> {
        let key = (token.kind, fold_name(&token.text));
        let Some(candidates) = self.index.get(&key) else {
            return Resolution::Unresolved;
        };

        match (candidates.as_slice(), self.policy) {
            ([], _) => Resolution::Unresolved,
            ([only], _) => Resolution::Resolved(*only),
            ([first, ..], AmbiguityPolicy::FirstMatch) => {
                warn!(
                    token = %token.raw(),
                    candidates = candidates.len(),
                    "Mention matches several entities, linking the first"
                );
                Resolution::Resolved(*first)
            }
            (_, AmbiguityPolicy::Reject) => Resolution::Ambiguous(candidates.clone()),
        }
    }

    pub fn resolve_all(&self, tokens: Vec<RawToken>) -> ResolutionPass {
        let mut pass = ResolutionPass::default();
        for token in tokens {
            match self.resolve(&token) {
                Resolution::Resolved(entity) => {
                    debug!(token = %token.raw(), entity_id = %entity.id(), "Resolved mention");
                    pass.resolved.push(ResolvedMention {
                        token,
                        entity: entity.clone(),
                    });
                }
                Resolution::Unresolved => {
                    debug!(token = %token.raw(), "No entity matches mention");
                    pass.unresolved.push(token);
                }
                Resolution::Ambiguous(candidates) => {
                    pass.ambiguous.push(AmbiguousMention {
                        token,
                        candidates: candidates.into_iter().cloned().collect(),
                    });
                }
            }
        }
        pass
    }
}
