//! Runtime configuration, read from the environment.

use std::str::FromStr;

use db::DBService;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

const DATABASE_URL_VAR: &str = "CAMPAIGN_DATABASE_URL";
const AMBIGUITY_VAR: &str = "CAMPAIGN_MENTION_AMBIGUITY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// What to do when a mention matches several entities with the same name
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Refuse the save and name the ambiguous token
    #[default]
    Reject,
    /// Link to whichever entity comes first in catalog order
    FirstMatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MentionConfig {
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// `sqlite://` URL; the local asset directory is used when unset
    pub database_url: Option<String>,
    #[serde(default)]
    pub mentions: MentionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let ambiguity = match read(AMBIGUITY_VAR) {
            Some(value) => AmbiguityPolicy::from_str(value.trim()).map_err(|_| {
                ConfigError::InvalidValue {
                    var: AMBIGUITY_VAR,
                    value,
                }
            })?,
            None => AmbiguityPolicy::default(),
        };

        Ok(Self {
            database_url: read(DATABASE_URL_VAR),
            mentions: MentionConfig { ambiguity },
        })
    }

    pub async fn open_database(&self) -> Result<DBService, sqlx::Error> {
        match &self.database_url {
            Some(url) => DBService::new_with_url(url).await,
            None => DBService::new().await,
        }
    }
}
