mod common;

use common::Fixture;
use db::models::{
    adventure::Adventure,
    character::Character,
    mention_link::EntityKind,
    region::{CreateSubregion, Region, Subregion},
};
use services::services::{
    config::{AmbiguityPolicy, MentionConfig},
    mention_catalog::CatalogEntity,
    mention_tokenizer::MentionKind,
    mentions::{MentionError, MentionService, MentionSource},
    timeline::TimelineError,
};
use sqlx::SqlitePool;
use uuid::Uuid;

#[tokio::test]
async fn comma_ends_a_multi_word_name() {
    let fx = Fixture::new().await;
    let strahd = fx.npc("Strahd von Zarovich").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(
            fx.adventure_id,
            "Arrival",
            Some("Olá @Strahd von Zarovich, bem-vindo"),
        )
        .await
        .unwrap();

    assert_eq!(entry.mentions.links.len(), 1);
    let link = &entry.mentions.links[0];
    assert_eq!(link.entity_kind, EntityKind::Character);
    assert_eq!(link.entity_id, strahd.id);
    assert_eq!(link.raw_token, "@Strahd von Zarovich");
    assert_eq!(link.token_offset, "Olá ".len() as i64);
    assert!(entry.mentions.unresolved.is_empty());
}

#[tokio::test]
async fn double_space_ends_a_token_but_single_space_does_not() {
    let fx = Fixture::new().await;
    fx.npc("Bob").await;

    let split = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Split", Some("@Bob  is here"))
        .await
        .unwrap();
    assert_eq!(split.mentions.links.len(), 1);

    let joined = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Joined", Some("@Bob is here"))
        .await
        .unwrap();
    assert!(joined.mentions.links.is_empty());
    assert_eq!(joined.mentions.unresolved.len(), 1);
    assert_eq!(joined.mentions.unresolved[0].text, "Bob is here");
}

#[tokio::test]
async fn names_match_regardless_of_case() {
    let fx = Fixture::new().await;
    let ireena = fx.npc("Ireena Kolyana").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Rescue", Some("Found @ireena KOLYANA."))
        .await
        .unwrap();

    assert_eq!(entry.mentions.links.len(), 1);
    assert_eq!(entry.mentions.links[0].entity_id, ireena.id);
    assert_eq!(entry.mentions.links[0].raw_token, "@ireena KOLYANA");
}

#[tokio::test]
async fn unknown_names_are_reported_but_not_linked() {
    let fx = Fixture::new().await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Rumours", Some("Someone saw @Nobody."))
        .await
        .unwrap();

    assert!(entry.mentions.links.is_empty());
    assert_eq!(entry.mentions.unresolved[0].raw(), "@Nobody");
    let stored = fx
        .campaign
        .mentions
        .links_for_source(MentionSource::timeline_entry(entry.id))
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn at_tokens_never_match_regions() {
    let fx = Fixture::new().await;
    fx.region("Bob").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Confusion", Some("@Bob."))
        .await
        .unwrap();

    assert!(entry.mentions.links.is_empty());
}

#[tokio::test]
async fn hash_tokens_match_regions_and_subregions() {
    let fx = Fixture::new().await;
    let barovia = fx.region("Barovia").await;
    let village = fx.subregion(barovia.id, "Village of Barovia").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(
            fx.adventure_id,
            "Travel",
            Some("Reached #Village of Barovia. Left #barovia!"),
        )
        .await
        .unwrap();

    let links = &entry.mentions.links;
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].entity_kind, EntityKind::Subregion);
    assert_eq!(links[0].entity_id, village.id);
    assert_eq!(links[1].entity_kind, EntityKind::Region);
    assert_eq!(links[1].entity_id, barovia.id);
    assert!(links[0].token_offset < links[1].token_offset);
}

#[tokio::test]
async fn every_occurrence_gets_its_own_link() {
    let fx = Fixture::new().await;
    let bob = fx.npc("Bob").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Twice", Some("@Bob. Later @bob!"))
        .await
        .unwrap();

    let offsets: Vec<i64> = entry.mentions.links.iter().map(|l| l.token_offset).collect();
    assert_eq!(offsets, vec![0, "@Bob. Later ".len() as i64]);
    assert!(entry.mentions.links.iter().all(|l| l.entity_id == bob.id));
}

#[tokio::test]
async fn saving_twice_gives_the_same_links() {
    let fx = Fixture::new().await;
    fx.npc("Bob").await;
    fx.region("Barovia").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Again", Some("@Bob; then #Barovia."))
        .await
        .unwrap();
    let source = MentionSource::timeline_entry(entry.id);

    let first = fx
        .campaign
        .mentions
        .save_mentions(source, entry.body())
        .await
        .unwrap();
    let second = fx
        .campaign
        .mentions
        .save_mentions(source, entry.body())
        .await
        .unwrap();

    let pairs = |links: &[db::models::mention_link::MentionLink]| {
        links
            .iter()
            .map(|l| (l.entity_id, l.token_offset))
            .collect::<Vec<_>>()
    };
    assert_eq!(pairs(&first.links), pairs(&second.links));
    assert_eq!(first.catalog_digest, second.catalog_digest);

    let stored = fx.campaign.mentions.links_for_source(source).await.unwrap();
    assert_eq!(pairs(&stored), pairs(&second.links));
}

#[tokio::test]
async fn new_and_renamed_entities_make_links_stale() {
    let fx = Fixture::new().await;
    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Before", Some("Waiting for @Bob."))
        .await
        .unwrap();
    let source = MentionSource::timeline_entry(entry.id);
    assert!(entry.mentions.links.is_empty());
    assert!(!fx.campaign.mentions.is_stale(source).await.unwrap());

    let bob = fx.npc("Bob").await;
    assert!(fx.campaign.mentions.is_stale(source).await.unwrap());

    let report = fx
        .campaign
        .mentions
        .save_mentions(source, entry.body())
        .await
        .unwrap();
    assert_eq!(report.links.len(), 1);
    assert_eq!(report.links[0].entity_id, bob.id);
    assert!(!fx.campaign.mentions.is_stale(source).await.unwrap());

    Character::update(fx.pool(), bob.id, "Robert".to_string(), None)
        .await
        .unwrap();
    let renamed = Character::find_by_id(fx.pool(), bob.id).await.unwrap().unwrap();
    assert_eq!(renamed.name, "Robert");
    assert!(fx.campaign.mentions.is_stale(source).await.unwrap());

    // The old link survives until the text is saved again
    let stored = fx.campaign.mentions.links_for_source(source).await.unwrap();
    assert_eq!(stored.len(), 1);

    let report = fx
        .campaign
        .mentions
        .save_mentions(source, entry.body())
        .await
        .unwrap();
    assert!(report.links.is_empty());
}

#[tokio::test]
async fn unrelated_catalog_change_is_not_stale() {
    let fx = Fixture::new().await;
    fx.npc("Bob").await;
    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Meeting", Some("@Bob."))
        .await
        .unwrap();

    fx.npc("Ireena").await;

    let stale = fx
        .campaign
        .mentions
        .is_stale(MentionSource::timeline_entry(entry.id))
        .await
        .unwrap();
    assert!(!stale);
}

#[tokio::test]
async fn extract_mentions_lists_distinct_names() {
    let fx = Fixture::new().await;
    fx.npc("Bob").await;
    fx.npc("Ireena").await;

    let names = fx
        .campaign
        .mentions
        .extract_mentions(
            fx.adventure_id,
            "@bob, @Bob; @IREENA. @Ghost!",
            MentionKind::Character,
        )
        .await
        .unwrap();

    assert_eq!(names, vec!["Bob".to_string(), "Ireena".to_string()]);
}

#[tokio::test]
async fn ambiguous_name_is_rejected_and_nothing_is_written() {
    let fx = Fixture::new().await;
    fx.npc("Bob").await;
    fx.player("Bob").await;

    let err = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Which one", Some("@Bob."))
        .await
        .unwrap_err();

    match err {
        TimelineError::Mention(MentionError::AmbiguousMention { token, candidates }) => {
            assert_eq!(token, "@Bob");
            assert_eq!(candidates, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fx.campaign.timeline.list(fx.adventure_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn first_match_policy_links_the_npc() {
    let fx = Fixture::with_policy(AmbiguityPolicy::FirstMatch).await;
    fx.player("Bob").await;
    let npc = fx.npc("Bob").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Which one", Some("@Bob."))
        .await
        .unwrap();

    assert_eq!(entry.mentions.links.len(), 1);
    assert_eq!(entry.mentions.links[0].entity_id, npc.id);
}

#[tokio::test]
async fn failed_insert_keeps_the_previous_links() {
    let fx = Fixture::new().await;
    let bob = fx.npc("Bob").await;
    fx.npc("Poison").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Stable", Some("@Bob."))
        .await
        .unwrap();
    let source = MentionSource::timeline_entry(entry.id);

    sqlx::query(
        r#"CREATE TRIGGER reject_poison BEFORE INSERT ON mention_links
           WHEN NEW.raw_token = '@Poison'
           BEGIN SELECT RAISE(ABORT, 'poisoned link'); END"#,
    )
    .execute(fx.pool())
    .await
    .unwrap();

    let err = fx
        .campaign
        .timeline
        .update_entry(entry.id, "Changed", Some("Then @Poison. And @Bob."))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TimelineError::Mention(MentionError::Database(_))
    ));

    let err = fx
        .campaign
        .mentions
        .save_mentions(source, "@Poison.")
        .await
        .unwrap_err();
    assert!(matches!(err, MentionError::Database(_)));

    let stored = fx.campaign.mentions.links_for_source(source).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].entity_id, bob.id);
    assert_eq!(stored[0].token_offset, 0);

    let entries = fx.campaign.timeline.list(fx.adventure_id).await.unwrap();
    assert_eq!(entries[0].title, "Stable");
    assert_eq!(entries[0].description.as_deref(), Some("@Bob."));
}

#[tokio::test]
async fn unknown_source_is_an_error() {
    let fx = Fixture::new().await;
    let missing = Uuid::new_v4();

    let err = fx
        .campaign
        .mentions
        .save_mentions(MentionSource::note(missing), "@Bob.")
        .await
        .unwrap_err();

    assert!(matches!(err, MentionError::SourceNotFound { id, .. } if id == missing));
}

#[tokio::test]
async fn sources_mentioning_finds_entries_and_notes() {
    let fx = Fixture::new().await;
    let bob = fx.npc("Bob").await;

    fx.campaign
        .timeline
        .create_entry(fx.adventure_id, "Entry", Some("@Bob."))
        .await
        .unwrap();
    fx.campaign
        .board
        .create_note(fx.adventure_id, None, "Note", Some("Ask @Bob!"))
        .await
        .unwrap();

    let links = fx
        .campaign
        .mentions
        .sources_mentioning(EntityKind::Character, bob.id)
        .await
        .unwrap();
    assert_eq!(links.len(), 2);
}

#[tokio::test]
async fn deleting_either_side_drops_links() {
    let fx = Fixture::new().await;
    let bob = fx.npc("Bob").await;
    let ireena = fx.npc("Ireena").await;
    let barovia = fx.region("Barovia").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "All", Some("@Bob; @Ireena. In #Barovia."))
        .await
        .unwrap();
    let source = MentionSource::timeline_entry(entry.id);
    assert_eq!(entry.mentions.links.len(), 3);

    Character::delete(fx.pool(), bob.id).await.unwrap();
    let stored = fx.campaign.mentions.links_for_source(source).await.unwrap();
    assert_eq!(stored.len(), 2);

    Region::delete(fx.pool(), barovia.id).await.unwrap();
    let stored = fx.campaign.mentions.links_for_source(source).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].entity_id, ireena.id);

    fx.campaign.timeline.delete_entry(entry.id).await.unwrap();
    let remaining = fx
        .campaign
        .mentions
        .sources_mentioning(EntityKind::Character, ireena.id)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn deleting_the_adventure_drops_every_link() {
    let fx = Fixture::new().await;
    fx.npc("Bob").await;
    fx.region("Barovia").await;

    fx.campaign
        .timeline
        .create_entry(fx.adventure_id, "Entry", Some("@Bob; #Barovia."))
        .await
        .unwrap();
    fx.campaign
        .board
        .create_note(fx.adventure_id, None, "Note", Some("Ask @Bob!"))
        .await
        .unwrap();

    assert_eq!(link_count(fx.pool()).await, 3);

    Adventure::delete(fx.pool(), fx.adventure_id).await.unwrap();
    assert_eq!(link_count(fx.pool()).await, 0);
}

async fn link_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mention_links")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn links_saved_from_another_text_are_stale() {
    let fx = Fixture::new().await;
    let bob = fx.npc("Bob").await;
    fx.npc("Ireena").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Meeting", Some("@Bob."))
        .await
        .unwrap();
    let source = MentionSource::timeline_entry(entry.id);

    fx.campaign
        .mentions
        .save_mentions(source, "@Ireena.")
        .await
        .unwrap();
    assert!(fx.campaign.mentions.is_stale(source).await.unwrap());

    let report = fx
        .campaign
        .mentions
        .save_mentions(source, entry.body())
        .await
        .unwrap();
    assert_eq!(report.links[0].entity_id, bob.id);
    assert!(!fx.campaign.mentions.is_stale(source).await.unwrap());
}

#[tokio::test]
async fn switching_to_reject_makes_first_match_links_stale() {
    let fx = Fixture::with_policy(AmbiguityPolicy::FirstMatch).await;
    fx.npc("Bob").await;
    fx.player("Bob").await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "Which one", Some("@Bob."))
        .await
        .unwrap();
    let source = MentionSource::timeline_entry(entry.id);
    assert!(!fx.campaign.mentions.is_stale(source).await.unwrap());

    let strict = MentionService::new(
        fx.pool().clone(),
        MentionConfig {
            ambiguity: AmbiguityPolicy::Reject,
        },
    );
    assert!(strict.is_stale(source).await.unwrap());
}

#[tokio::test]
async fn suggestions_match_substrings_of_one_kind() {
    let fx = Fixture::new().await;
    let strahd = fx.npc("Strahd von Zarovich").await;
    fx.player("Ireena").await;
    let keep = fx.region("Zarovich Keep").await;

    let characters = fx
        .campaign
        .mentions
        .suggest(fx.adventure_id, MentionKind::Character, "ZAR")
        .await
        .unwrap();
    let ids: Vec<_> = characters.iter().map(CatalogEntity::id).collect();
    assert_eq!(ids, vec![strahd.id]);

    let regions = fx
        .campaign
        .mentions
        .suggest(fx.adventure_id, MentionKind::Region, "zar")
        .await
        .unwrap();
    let ids: Vec<_> = regions.iter().map(CatalogEntity::id).collect();
    assert_eq!(ids, vec![keep.id]);

    let everyone = fx
        .campaign
        .mentions
        .suggest(fx.adventure_id, MentionKind::Character, "")
        .await
        .unwrap();
    assert_eq!(everyone.len(), 2);
}

#[tokio::test]
async fn suggestions_are_capped_in_catalog_order() {
    let fx = Fixture::new().await;
    for i in 0..12 {
        fx.npc(&format!("Guard {i}")).await;
    }

    let guards = fx
        .campaign
        .mentions
        .suggest(fx.adventure_id, MentionKind::Character, "guard")
        .await
        .unwrap();

    assert_eq!(guards.len(), 10);
    assert_eq!(guards[0].name(), "Guard 0");
    assert_eq!(guards[9].name(), "Guard 9");
}

#[tokio::test]
async fn syncing_subregions_drops_links_to_removed_ones() {
    let fx = Fixture::new().await;
    let barovia = fx.region("Barovia").await;
    let village = fx.subregion(barovia.id, "Village").await;
    let castle = fx.subregion(barovia.id, "Castle").await;

    fx.campaign
        .timeline
        .create_entry(fx.adventure_id, "Tour", Some("#Village; #Castle."))
        .await
        .unwrap();

    let mut tx = fx.pool().begin().await.unwrap();
    let subregions = Subregion::sync_for_region(
        &mut tx,
        barovia.id,
        &[castle.id],
        &[CreateSubregion {
            name: "Tser Pool".to_string(),
            description: None,
        }],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let names: Vec<&str> = subregions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Castle", "Tser Pool"]);

    let village_links = fx
        .campaign
        .mentions
        .sources_mentioning(EntityKind::Subregion, village.id)
        .await
        .unwrap();
    assert!(village_links.is_empty());
    let castle_links = fx
        .campaign
        .mentions
        .sources_mentioning(EntityKind::Subregion, castle.id)
        .await
        .unwrap();
    assert_eq!(castle_links.len(), 1);
}
