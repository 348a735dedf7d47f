//! The adventure's kanban board: chapters as columns, notes as cards.

use db::models::{
    chapter::Chapter,
    note::{CreateNote, Note, UpdateNote},
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    authored_text::{clean_body, clean_title},
    mentions::{MentionError, MentionService, MentionSource, WithMentions},
};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Mention(#[from] MentionError),
    #[error("title is required")]
    TitleRequired,
    #[error("chapter {0} not found")]
    ChapterNotFound(Uuid),
    #[error("note {0} not found")]
    NoteNotFound(Uuid),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterColumn {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub notes: Vec<Note>,
}

/// Chapters in order with their notes, plus the notes not in any chapter
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub chapters: Vec<ChapterColumn>,
    pub unassigned: Vec<Note>,
}

#[derive(Debug, Clone)]
pub struct BoardService {
    pool: SqlitePool,
    mentions: MentionService,
}

impl BoardService {
    pub fn new(pool: SqlitePool, mentions: MentionService) -> Self {
        Self { pool, mentions }
    }

    pub async fn board(&self, adventure_id: Uuid) -> Result<Board, BoardError> {
        let mut chapters = Vec::new();
        for chapter in Chapter::find_by_adventure_id(&self.pool, adventure_id).await? {
            let notes = Note::find_by_chapter_id(&self.pool, chapter.id).await?;
            chapters.push(ChapterColumn { chapter, notes });
        }
        let unassigned = Note::find_unassigned(&self.pool, adventure_id).await?;
        Ok(Board {
            chapters,
            unassigned,
        })
    }

    pub async fn create_chapter(
        &self,
        adventure_id: Uuid,
        title: &str,
    ) -> Result<Chapter, BoardError> {
        let title = clean_title(title).ok_or(BoardError::TitleRequired)?;
        let chapter = Chapter::create(&self.pool, adventure_id, &title, Uuid::new_v4()).await?;
        info!(
            adventure_id = %adventure_id,
            chapter_id = %chapter.id,
            order_index = chapter.order_index,
            "Created chapter"
        );
        Ok(chapter)
    }

    pub async fn rename_chapter(&self, chapter_id: Uuid, title: &str) -> Result<Chapter, BoardError> {
        let title = clean_title(title).ok_or(BoardError::TitleRequired)?;
        Chapter::update_title(&self.pool, chapter_id, &title)
            .await?
            .ok_or(BoardError::ChapterNotFound(chapter_id))
    }

    pub async fn complete_chapter(&self, chapter_id: Uuid) -> Result<Chapter, BoardError> {
        let chapter = Chapter::mark_completed(&self.pool, chapter_id)
            .await?
            .ok_or(BoardError::ChapterNotFound(chapter_id))?;
        info!(chapter_id = %chapter.id, "Completed chapter");
        Ok(chapter)
    }

    /// Delete a chapter. Its notes stay on the board, unassigned.
    pub async fn delete_chapter(&self, chapter_id: Uuid) -> Result<(), BoardError> {
        let mut tx = self.pool.begin().await?;
        let chapter = Chapter::find_by_id(&mut *tx, chapter_id)
            .await?
            .ok_or(BoardError::ChapterNotFound(chapter_id))?;
        let unassigned = Note::unassign_chapter(&mut tx, chapter.adventure_id, chapter.id).await?;
        Chapter::delete(&mut *tx, chapter.id).await?;
        Chapter::compact_after(&mut *tx, chapter.adventure_id, chapter.order_index).await?;
        tx.commit().await?;

        info!(
            adventure_id = %chapter.adventure_id,
            chapter_id = %chapter.id,
            unassigned,
            "Deleted chapter"
        );
        Ok(())
    }

    pub async fn create_note(
        &self,
        adventure_id: Uuid,
        chapter_id: Option<Uuid>,
        title: &str,
        content: Option<&str>,
    ) -> Result<WithMentions<Note>, BoardError> {
        let data = CreateNote {
            adventure_id,
            chapter_id,
            title: clean_title(title).ok_or(BoardError::TitleRequired)?,
            content: clean_body(content),
        };

        let mut tx = self.pool.begin().await?;
        ensure_chapter(&mut tx, adventure_id, chapter_id).await?;
        let note = Note::create(&mut *tx, &data, Uuid::new_v4()).await?;
        let mentions = self
            .mentions
            .save_mentions_in(&mut tx, adventure_id, MentionSource::note(note.id), note.body())
            .await?;
        tx.commit().await?;

        info!(
            adventure_id = %adventure_id,
            note_id = %note.id,
            chapter_id = ?note.chapter_id,
            "Created note"
        );
        Ok(WithMentions {
            item: note,
            mentions,
        })
    }

    /// Rewrite a note's title, content and chapter, relinking its mentions
    pub async fn update_note(
        &self,
        note_id: Uuid,
        title: &str,
        content: Option<&str>,
        chapter_id: Option<Uuid>,
    ) -> Result<WithMentions<Note>, BoardError> {
        let data = UpdateNote {
            title: clean_title(title).ok_or(BoardError::TitleRequired)?,
            content: clean_body(content),
            chapter_id,
        };

        let mut tx = self.pool.begin().await?;
        let existing = Note::find_by_id(&mut *tx, note_id)
            .await?
            .ok_or(BoardError::NoteNotFound(note_id))?;
        ensure_chapter(&mut tx, existing.adventure_id, chapter_id).await?;
        let note = Note::update(&mut *tx, note_id, &data)
            .await?
            .ok_or(BoardError::NoteNotFound(note_id))?;
        let mentions = self
            .mentions
            .save_mentions_in(
                &mut tx,
                note.adventure_id,
                MentionSource::note(note.id),
                note.body(),
            )
            .await?;
        tx.commit().await?;

        debug!(note_id = %note.id, links = mentions.links.len(), "Updated note");
        Ok(WithMentions {
            item: note,
            mentions,
        })
    }

    pub async fn set_note_completed(
        &self,
        note_id: Uuid,
        completed: bool,
    ) -> Result<Note, BoardError> {
        Note::set_completed(&self.pool, note_id, completed)
            .await?
            .ok_or(BoardError::NoteNotFound(note_id))
    }

    pub async fn delete_note(&self, note_id: Uuid) -> Result<(), BoardError> {
        let rows = Note::delete(&self.pool, note_id).await?;
        if rows == 0 {
            return Err(BoardError::NoteNotFound(note_id));
        }
        info!(note_id = %note_id, "Deleted note");
        Ok(())
    }
}

/// A note may only be filed under a chapter of its own adventure
async fn ensure_chapter(
    conn: &mut SqliteConnection,
    adventure_id: Uuid,
    chapter_id: Option<Uuid>,
) -> Result<(), BoardError> {
    let Some(chapter_id) = chapter_id else {
        return Ok(());
    };
    match Chapter::find_by_id(&mut *conn, chapter_id).await? {
        Some(chapter) if chapter.adventure_id == adventure_id => Ok(()),
        _ => Err(BoardError::ChapterNotFound(chapter_id)),
    }
}
