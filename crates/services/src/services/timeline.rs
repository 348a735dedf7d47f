//! The adventure's session log: an ordered list of entries whose descriptions
//! carry mentions.

use db::models::timeline_entry::{CreateTimelineEntry, TimelineEntry, UpdateTimelineEntry};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    authored_text::{clean_body, clean_title},
    mentions::{MentionError, MentionService, MentionSource, WithMentions},
};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Mention(#[from] MentionError),
    #[error("timeline entry title is required")]
    TitleRequired,
    #[error("timeline entry {0} not found")]
    NotFound(Uuid),
    #[error("no timeline entry at order index {order_index}")]
    NeighbourMissing { order_index: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct TimelineService {
    pool: SqlitePool,
    mentions: MentionService,
}

impl TimelineService {
    pub fn new(pool: SqlitePool, mentions: MentionService) -> Self {
        Self { pool, mentions }
    }

    pub async fn list(&self, adventure_id: Uuid) -> Result<Vec<TimelineEntry>, TimelineError> {
        Ok(TimelineEntry::find_by_adventure_id(&self.pool, adventure_id).await?)
    }

    /// Append an entry to the end of the timeline and link its mentions
    pub async fn create_entry(
        &self,
        adventure_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<WithMentions<TimelineEntry>, TimelineError> {
        let data = CreateTimelineEntry {
            adventure_id,
            title: clean_title(title).ok_or(TimelineError::TitleRequired)?,
            description: clean_body(description),
        };

        let mut tx = self.pool.begin().await?;
        let entry = TimelineEntry::create(&mut *tx, &data, Uuid::new_v4()).await?;
        let mentions = self
            .mentions
            .save_mentions_in(
                &mut tx,
                adventure_id,
                MentionSource::timeline_entry(entry.id),
                entry.body(),
            )
            .await?;
        tx.commit().await?;

        info!(
            adventure_id = %adventure_id,
            entry_id = %entry.id,
            order_index = entry.order_index,
            "Created timeline entry"
        );
        Ok(WithMentions {
            item: entry,
            mentions,
        })
    }

    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<WithMentions<TimelineEntry>, TimelineError> {
        let data = UpdateTimelineEntry {
            title: clean_title(title).ok_or(TimelineError::TitleRequired)?,
            description: clean_body(description),
        };

        let mut tx = self.pool.begin().await?;
        let entry = TimelineEntry::update(&mut *tx, entry_id, &data)
            .await?
            .ok_or(TimelineError::NotFound(entry_id))?;
        let mentions = self
            .mentions
            .save_mentions_in(
                &mut tx,
                entry.adventure_id,
                MentionSource::timeline_entry(entry.id),
                entry.body(),
            )
            .await?;
        tx.commit().await?;

        debug!(entry_id = %entry.id, links = mentions.links.len(), "Updated timeline entry");
        Ok(WithMentions {
            item: entry,
            mentions,
        })
    }

    /// Remove an entry and close the gap it leaves in the ordering
    pub async fn delete_entry(&self, entry_id: Uuid) -> Result<(), TimelineError> {
        let mut tx = self.pool.begin().await?;
        let entry = TimelineEntry::find_by_id(&mut *tx, entry_id)
            .await?
            .ok_or(TimelineError::NotFound(entry_id))?;
        TimelineEntry::delete(&mut *tx, entry.id).await?;
        let shifted =
            TimelineEntry::compact_after(&mut *tx, entry.adventure_id, entry.order_index).await?;
        tx.commit().await?;

        info!(
            adventure_id = %entry.adventure_id,
            entry_id = %entry.id,
            shifted,
            "Deleted timeline entry"
        );
        Ok(())
    }

    /// Swap with the previous entry. The first entry stays where it is.
    pub async fn move_up(&self, entry_id: Uuid) -> Result<TimelineEntry, TimelineError> {
        self.shift(entry_id, Direction::Up).await
    }

    /// Swap with the next entry. The last entry stays where it is.
    pub async fn move_down(&self, entry_id: Uuid) -> Result<TimelineEntry, TimelineError> {
        self.shift(entry_id, Direction::Down).await
    }

    async fn shift(
        &self,
        entry_id: Uuid,
        direction: Direction,
    ) -> Result<TimelineEntry, TimelineError> {
        let mut tx = self.pool.begin().await?;
        let mut entry = TimelineEntry::find_by_id(&mut *tx, entry_id)
            .await?
            .ok_or(TimelineError::NotFound(entry_id))?;

        let target = match direction {
            Direction::Up if entry.order_index == 0 => return Ok(entry),
            Direction::Up => entry.order_index - 1,
            Direction::Down => {
                let count = TimelineEntry::count_by_adventure_id(&mut *tx, entry.adventure_id).await?;
                if entry.order_index + 1 >= count {
                    return Ok(entry);
                }
                entry.order_index + 1
            }
        };

        let neighbour = TimelineEntry::find_by_order_index(&mut *tx, entry.adventure_id, target)
            .await?
            .ok_or(TimelineError::NeighbourMissing {
                order_index: target,
            })?;

        TimelineEntry::set_order_index(&mut *tx, neighbour.id, entry.order_index).await?;
        TimelineEntry::set_order_index(&mut *tx, entry.id, target).await?;
        tx.commit().await?;

        debug!(
            entry_id = %entry.id,
            from = entry.order_index,
            to = target,
            "Moved timeline entry"
        );
        entry.order_index = target;
        Ok(entry)
    }
}
