/*!
 * Row mappings for the `contents` table.
 *
 * Nested request and script data is stored as JSON text columns; the derived
 * prompts live in their own tables and are written by the repository.
 */

use chrono::{DateTime, Utc};
use rusqlite::Row;

use crate::content::{ContentId, ContentRecord, ContentStatus, GeneratedScript, StageFailure};

/// Columns selected for a content row, in `ContentRow::from_row` order
pub const CONTENT_COLUMNS: &str = "id, title, video_subject, status, progress, current_step, \
    script_json, generated_picture, generated_voice, generated_music, generated_video, \
    error_message, stage_failures_json, created_at, updated_at";

/// A `contents` row as stored
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: ContentId,
    pub title: String,
    pub video_subject: String,
    pub status: String,
    pub progress: f64,
    pub current_step: Option<String>,
    pub script_json: String,
    pub generated_picture: Option<String>,
    pub generated_voice: Option<String>,
    pub generated_music: Option<String>,
    pub generated_video: Option<String>,
    pub error_message: Option<String>,
    pub stage_failures_json: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ContentRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            video_subject: row.get(2)?,
            status: row.get(3)?,
            progress: row.get(4)?,
            current_step: row.get(5)?,
            script_json: row.get(6)?,
            generated_picture: row.get(7)?,
            generated_voice: row.get(8)?,
            generated_music: row.get(9)?,
            generated_video: row.get(10)?,
            error_message: row.get(11)?,
            stage_failures_json: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    /// Decode the JSON and text columns into a record
    pub fn into_record(self) -> anyhow::Result<ContentRecord> {
        let status: ContentStatus = self
            .status
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid status in content {}: {}", self.id, e))?;
        let script: GeneratedScript = serde_json::from_str(&self.script_json)?;
        let stage_failures: Vec<StageFailure> = serde_json::from_str(&self.stage_failures_json)?;

        Ok(ContentRecord {
            id: self.id,
            title: self.title,
            video_subject: self.video_subject,
            status,
            progress: self.progress,
            current_step: self.current_step,
            script,
            generated_picture: self.generated_picture,
            generated_voice: self.generated_voice,
            generated_music: self.generated_music,
            generated_video: self.generated_video,
            error_message: self.error_message,
            stage_failures,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Timestamps are stored as RFC 3339 text
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub fn parse_timestamp(text: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}
