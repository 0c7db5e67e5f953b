/*!
 * Repository layer for database operations.
 *
 * High-level, type-safe access to content records on top of
 * `DatabaseConnection`. Writes run inside a transaction so a record and its
 * derived prompts are created together, and a status update is checked
 * against the stored status before it is written.
 */

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::connection::DatabaseConnection;
use super::models::{format_timestamp, ContentRow, CONTENT_COLUMNS};
use super::ContentStore;
use crate::content::{ContentId, ContentRecord, ContentUpdate, NewContent};
use crate::errors::PersistenceError;

/// SQLite backed content store
#[derive(Debug, Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> anyhow::Result<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Create a repository with an in-memory database
    pub fn new_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn get_sync(conn: &Connection, id: ContentId) -> Result<Option<ContentRecord>, PersistenceError> {
        let sql = format!("SELECT {} FROM contents WHERE id = ?1", CONTENT_COLUMNS);
        let row = conn
            .query_row(&sql, [id], ContentRow::from_row)
            .optional()?;

        match row {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    fn insert_sync(conn: &Connection, content: &NewContent) -> Result<ContentId, PersistenceError> {
        let now = format_timestamp(Utc::now());

        conn.execute(
            r#"
            INSERT INTO contents (
                title, video_subject, status, progress, script_json,
                general_options_json, content_options_json, visual_prompt_options_json,
                stage_failures_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '[]', ?9, ?9)
            "#,
            params![
                content.title,
                content.video_subject,
                content.status.to_string(),
                content.progress,
                to_json(&content.script)?,
                to_json(&content.general_options)?,
                to_json(&content.content_options)?,
                to_json(&content.visual_prompt_options)?,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();

        {
            let mut stmt = conn.prepare(
                "INSERT INTO scenes (content_id, position, scene_type, description) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, scene) in content.scenes.iter().enumerate() {
                stmt.execute(params![id, position as i64, scene.scene_type, scene.description])?;
            }
        }

        {
            let mut stmt = conn.prepare(
                "INSERT INTO audio_prompts (content_id, prompt_type, scene_number, description) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for prompt in &content.audio_prompts {
                stmt.execute(params![id, prompt.prompt_type, prompt.scene_number, prompt.description])?;
            }
        }

        {
            let mut stmt = conn.prepare(
                "INSERT INTO visual_prompts (content_id, prompt_type, scene_number, description) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for prompt in &content.visual_prompts {
                stmt.execute(params![id, prompt.prompt_type, prompt.scene_number, prompt.description])?;
            }
        }

        conn.execute(
            "INSERT INTO music_prompts (content_id, description) VALUES (?1, ?2)",
            params![id, content.music_prompt.description],
        )?;

        Ok(id)
    }

    fn write_sync(conn: &Connection, record: &ContentRecord) -> Result<(), PersistenceError> {
        let stage_failures = to_json(&record.stage_failures)?;

        conn.execute(
            r#"
            UPDATE contents SET
                status = ?2, progress = ?3, current_step = ?4,
                generated_picture = ?5, generated_voice = ?6,
                generated_music = ?7, generated_video = ?8,
                error_message = ?9, stage_failures_json = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.status.to_string(),
                record.progress,
                record.current_step,
                record.generated_picture,
                record.generated_voice,
                record.generated_music,
                record.generated_video,
                record.error_message,
                stage_failures,
                format_timestamp(record.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Number of derived rows stored for a record: (scenes, audio, visual, music)
    pub async fn derived_counts(&self, id: ContentId) -> anyhow::Result<(i64, i64, i64, i64)> {
        self.db
            .execute_async(move |conn| {
                let count = |table: &str| -> rusqlite::Result<i64> {
                    conn.query_row(
                        &format!("SELECT COUNT(*) FROM {} WHERE content_id = ?1", table),
                        [id],
                        |row| row.get(0),
                    )
                };
                Ok((
                    count("scenes")?,
                    count("audio_prompts")?,
                    count("visual_prompts")?,
                    count("music_prompts")?,
                ))
            })
            .await
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|e| PersistenceError::Database(e.to_string()))
}

#[async_trait]
impl ContentStore for Repository {
    async fn create(&self, content: &NewContent) -> Result<ContentId, PersistenceError> {
        let content = content.clone();

        let id = self
            .db
            .transaction_async(move |tx| Self::insert_sync(tx, &content))
            .await?;

        debug!("Created content {}", id);
        Ok(id)
    }

    async fn update(&self, id: ContentId, update: &ContentUpdate) -> Result<(), PersistenceError> {
        let update = update.clone();

        self.db
            .transaction_async(move |tx| {
                let mut record = Self::get_sync(tx, id)?.ok_or(PersistenceError::NotFound(id))?;
                record.apply(&update, Utc::now())?;
                Self::write_sync(tx, &record)
            })
            .await
    }

    async fn get(&self, id: ContentId) -> Result<Option<ContentRecord>, PersistenceError> {
        self.db
            .execute_async(move |conn| Self::get_sync(conn, id).map_err(anyhow::Error::from))
            .await
            .map_err(PersistenceError::from)
    }
}
