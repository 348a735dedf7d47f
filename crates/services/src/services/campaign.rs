//! Wires storage and the authored-text services together from a [`Config`].

use db::DBService;
use thiserror::Error;
use tracing::info;

use super::{
    board::BoardService,
    config::{Config, ConfigError},
    database_validator::{DatabaseValidationError, DatabaseValidator},
    mentions::MentionService,
    timeline::TimelineService,
};

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] DatabaseValidationError),
}

#[derive(Clone)]
pub struct Campaign {
    pub db: DBService,
    pub mentions: MentionService,
    pub timeline: TimelineService,
    pub board: BoardService,
}

impl Campaign {
    pub async fn from_env() -> Result<Self, CampaignError> {
        let config = Config::from_env()?;
        Self::open(&config).await
    }

    /// Open (and migrate) the configured database and check its schema
    pub async fn open(config: &Config) -> Result<Self, CampaignError> {
        let db = config.open_database().await?;
        DatabaseValidator::new(db.pool.clone()).ensure_ready().await?;
        info!(ambiguity = %config.mentions.ambiguity, "Campaign services ready");
        Ok(Self::with_db(db, config))
    }

    pub fn with_db(db: DBService, config: &Config) -> Self {
        let mentions = MentionService::new(db.pool.clone(), config.mentions.clone());
        Self {
            timeline: TimelineService::new(db.pool.clone(), mentions.clone()),
            board: BoardService::new(db.pool.clone(), mentions.clone()),
            mentions,
            db,
        }
    }
}
