mod common;

use db::DBService;
use services::services::{
    campaign::Campaign,
    config::Config,
    database_validator::{CAMPAIGN_TABLES, DatabaseValidationError, DatabaseValidator},
};
use sqlx::SqlitePool;

#[tokio::test]
async fn migrated_database_is_valid() {
    let db = DBService::new_in_memory().await.unwrap();
    let result = DatabaseValidator::new(db.pool.clone())
        .validate()
        .await
        .unwrap();

    assert!(result.is_ok(), "{}", result.summary());
    assert_eq!(result.migrations_applied, 1);
    assert_eq!(result.latest_migration.as_deref(), Some("init"));
}

#[tokio::test]
async fn empty_database_is_not_initialized() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let validator = DatabaseValidator::new(pool);

    let result = validator.validate().await.unwrap();
    assert!(!result.is_initialized);
    assert_eq!(result.missing_tables.len(), CAMPAIGN_TABLES.len());

    let err = validator.ensure_ready().await.unwrap_err();
    assert!(matches!(err, DatabaseValidationError::NotInitialized));
}

#[tokio::test]
async fn campaign_opens_a_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("campaign.sqlite");
    let config = Config::from_lookup(|var| match var {
        "CAMPAIGN_DATABASE_URL" => Some(format!("sqlite://{}", path.display())),
        _ => None,
    })
    .unwrap();

    let campaign = Campaign::open(&config).await.unwrap();
    let adventure_id = common::add_adventure(&campaign.db.pool, "Curse of Strahd").await;
    campaign
        .timeline
        .create_entry(adventure_id, "Session zero", None)
        .await
        .unwrap();
    campaign.db.pool.close().await;
    assert!(path.exists());

    let reopened = Campaign::open(&config).await.unwrap();
    let entries = reopened.timeline.list(adventure_id).await.unwrap();
    assert_eq!(entries.len(), 1);
}
