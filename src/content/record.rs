/*!
 * Persisted content aggregate.
 *
 * A `ContentRecord` is created once per request after its script has been
 * generated, then updated by the stage executor as optional artifacts arrive.
 * Status only ever moves forward.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::request::{ContentOptions, ContentRequest, GeneralOptions, ServiceKind, VisualPromptOptions};
use super::script::GeneratedScript;
use super::StageKind;
use crate::errors::PersistenceError;

/// Identity assigned by the content store
pub type ContentId = i64;

/// Lifecycle of a content record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// Record created, generation not started
    Pending,
    /// Optional stages running
    InProgress,
    /// Mandatory stages succeeded
    Completed,
    /// Processing abandoned
    Failed,
}

impl ContentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle forward-only.
    ///
    /// `pending -> in_progress -> {completed, failed}`, plus `pending -> failed`
    /// for records abandoned before their stages started. Re-asserting a
    /// non-terminal status is allowed; terminal states are final.
    pub fn can_transition_to(self, next: ContentStatus) -> bool {
        use ContentStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, InProgress)
                | (Pending, Failed)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentStatus::Pending => write!(f, "pending"),
            ContentStatus::InProgress => write!(f, "in_progress"),
            ContentStatus::Completed => write!(f, "completed"),
            ContentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ContentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ContentStatus::Pending),
            "in_progress" => Ok(ContentStatus::InProgress),
            "completed" => Ok(ContentStatus::Completed),
            "failed" => Ok(ContentStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid content status: {}", s)),
        }
    }
}

/// Scene row derived from the script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    #[serde(rename = "type")]
    pub scene_type: String,
    pub description: String,
}

/// Narration prompt for one scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPrompt {
    #[serde(rename = "type")]
    pub prompt_type: String,
    pub scene_number: u32,
    pub description: String,
}

/// Visual prompt for one scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualPrompt {
    #[serde(rename = "type")]
    pub prompt_type: String,
    pub scene_number: u32,
    pub description: String,
}

/// Background music prompt for the whole video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicPrompt {
    pub description: String,
}

/// An optional stage that failed without failing the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: StageKind,
    pub message: String,
}

/// Fields for the first write of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContent {
    pub title: String,
    pub video_subject: String,
    pub status: ContentStatus,
    pub progress: f64,
    pub script: GeneratedScript,
    pub general_options: GeneralOptions,
    pub content_options: ContentOptions,
    pub visual_prompt_options: VisualPromptOptions,
    pub scenes: Vec<SceneRecord>,
    pub audio_prompts: Vec<AudioPrompt>,
    pub visual_prompts: Vec<VisualPrompt>,
    pub music_prompt: MusicPrompt,
}

impl NewContent {
    /// Build the pending record for a request and its generated script
    pub fn from_script(request: &ContentRequest, script: &GeneratedScript) -> Self {
        let scenes = script
            .scenes
            .iter()
            .map(|scene| SceneRecord {
                scene_type: "main".to_string(),
                description: scene.narration.clone(),
            })
            .collect();

        let audio_prompts = script
            .scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| AudioPrompt {
                prompt_type: "narration".to_string(),
                scene_number: i as u32 + 1,
                description: scene.narration.clone(),
            })
            .collect();

        let visual_prompts = script
            .scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| VisualPrompt {
                prompt_type: "scene".to_string(),
                scene_number: i as u32 + 1,
                description: scene.visual_prompt.clone(),
            })
            .collect();

        Self {
            title: script.title.clone(),
            video_subject: request.video_subject.clone(),
            status: ContentStatus::Pending,
            progress: 0.0,
            script: script.clone(),
            general_options: request.general_options.clone(),
            content_options: request.content_options.clone(),
            visual_prompt_options: request.visual_prompt_options.clone(),
            scenes,
            audio_prompts,
            visual_prompts,
            music_prompt: MusicPrompt {
                description: request.music_prompt(),
            },
        }
    }
}

/// Partial update of a record; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub status: Option<ContentStatus>,
    pub progress: Option<f64>,
    pub current_step: Option<String>,
    pub generated_picture: Option<String>,
    pub generated_voice: Option<String>,
    pub generated_music: Option<String>,
    pub generated_video: Option<String>,
    pub error_message: Option<String>,
    pub stage_failures: Option<Vec<StageFailure>>,
}

impl ContentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ContentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress.clamp(0.0, 100.0));
        self
    }

    pub fn current_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    /// Set the URL field matching a service
    pub fn media_url(mut self, kind: ServiceKind, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match kind {
            ServiceKind::Image => self.generated_picture = url,
            ServiceKind::Voice => self.generated_voice = url,
            ServiceKind::Music => self.generated_music = url,
            ServiceKind::Video => self.generated_video = url,
        }
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn stage_failures(mut self, failures: Vec<StageFailure>) -> Self {
        self.stage_failures = Some(failures);
        self
    }
}

/// The persisted content aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ContentId,
    pub title: String,
    pub video_subject: String,
    pub status: ContentStatus,
    pub progress: f64,
    pub current_step: Option<String>,
    pub script: GeneratedScript,
    pub generated_picture: Option<String>,
    pub generated_voice: Option<String>,
    pub generated_music: Option<String>,
    pub generated_video: Option<String>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub stage_failures: Vec<StageFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Record as it exists right after its first write
    pub fn from_new(id: ContentId, new: &NewContent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title.clone(),
            video_subject: new.video_subject.clone(),
            status: new.status,
            progress: new.progress,
            current_step: None,
            script: new.script.clone(),
            generated_picture: None,
            generated_voice: None,
            generated_music: None,
            generated_video: None,
            error_message: None,
            stage_failures: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update, rejecting backward status transitions
    pub fn apply(&mut self, update: &ContentUpdate, now: DateTime<Utc>) -> Result<(), PersistenceError> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(PersistenceError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            self.status = next;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(step) = &update.current_step {
            self.current_step = Some(step.clone());
        }
        if let Some(url) = &update.generated_picture {
            self.generated_picture = Some(url.clone());
        }
        if let Some(url) = &update.generated_voice {
            self.generated_voice = Some(url.clone());
        }
        if let Some(url) = &update.generated_music {
            self.generated_music = Some(url.clone());
        }
        if let Some(url) = &update.generated_video {
            self.generated_video = Some(url.clone());
        }
        if let Some(message) = &update.error_message {
            self.error_message = Some(message.clone());
        }
        if let Some(failures) = &update.stage_failures {
            self.stage_failures = failures.clone();
        }
        self.updated_at = now;
        Ok(())
    }

    /// URL produced by a service, if any
    pub fn media_url(&self, kind: ServiceKind) -> Option<&str> {
        match kind {
            ServiceKind::Image => self.generated_picture.as_deref(),
            ServiceKind::Voice => self.generated_voice.as_deref(),
            ServiceKind::Music => self.generated_music.as_deref(),
            ServiceKind::Video => self.generated_video.as_deref(),
        }
    }
}
