/*!
 * Per-request stage execution.
 *
 * A request walks through render, script, persist, the enabled optional
 * media stages and finalize. The first three stages are mandatory: a failure
 * there ends the request. Optional stage failures are logged, recorded on the
 * content record and skipped over.
 *
 * Each request owns `STEPS_PER_REQUEST` consecutive progress slots and ticks
 * every one of them exactly once, whatever happens.
 */

use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::progress::{ProgressTracker, StepRecord};
use crate::content::{
    ContentId, ContentRecord, ContentRequest, ContentStatus, ContentUpdate, GeneratedScript,
    NewContent, ServiceKind, StageFailure, StageKind,
};
use crate::database::ContentStore;
use crate::errors::{GenerationError, StageError};
use crate::prompts::TemplateSet;
use crate::providers::{MediaGenerator, ScriptGenerator, VideoInput};

/// Progress slots per request: render, script, persist, image, voice, music, video
pub const STEPS_PER_REQUEST: usize = 7;

/// What a request needs to count as completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    /// Mandatory stages only; optional failures are recorded
    #[default]
    Permissive,
    /// Any failed optional stage marks the record failed
    Strict,
}

/// Progress slots owned by one request
#[derive(Clone)]
pub struct RequestProgress {
    tracker: Arc<ProgressTracker>,
    base: usize,
    ticked: Arc<AtomicUsize>,
    subject: String,
    title: Arc<Mutex<Option<String>>>,
}

impl RequestProgress {
    /// Slots of the request at `index` in the batch
    pub fn new(tracker: Arc<ProgressTracker>, index: usize, subject: impl Into<String>) -> Self {
        Self {
            tracker,
            base: index * STEPS_PER_REQUEST,
            ticked: Arc::new(AtomicUsize::new(0)),
            subject: subject.into(),
            title: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_title(&self, title: &str) {
        *self.title.lock() = Some(title.to_string());
    }

    /// Tick the next slot; does nothing once all slots are used
    pub fn tick(&self, status: impl Into<String>) {
        let Ok(slot) = self
            .ticked
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < STEPS_PER_REQUEST).then_some(n + 1)
            })
        else {
            return;
        };

        let record = StepRecord::new(self.base + slot + 1, status, self.subject.clone())
            .with_title(self.title.lock().clone());
        self.tracker.update(record);
    }

    pub fn remaining(&self) -> usize {
        STEPS_PER_REQUEST.saturating_sub(self.ticked.load(Ordering::SeqCst))
    }

    /// Tick every unused slot as aborted
    pub fn abort_remaining(&self) {
        while self.remaining() > 0 {
            self.tick("aborted");
        }
    }
}

/// Runs the stages of a single request
#[derive(Clone)]
pub struct StageExecutor {
    templates: Arc<RwLock<TemplateSet>>,
    template_name: String,
    script_generator: Arc<dyn ScriptGenerator>,
    media: Arc<dyn MediaGenerator>,
    store: Arc<dyn ContentStore>,
    policy: CompletionPolicy,
    stage_timeout: Option<Duration>,
}

impl StageExecutor {
    pub fn new(
        templates: Arc<RwLock<TemplateSet>>,
        template_name: impl Into<String>,
        script_generator: Arc<dyn ScriptGenerator>,
        media: Arc<dyn MediaGenerator>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            templates,
            template_name: template_name.into(),
            script_generator,
            media,
            store,
            policy: CompletionPolicy::default(),
            stage_timeout: None,
        }
    }

    pub fn with_template_name(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = template_name.into();
        self
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound every collaborator call by `timeout`
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Process one request through all its stages.
    ///
    /// On error every progress slot the request did not reach is ticked as
    /// aborted before returning.
    pub async fn execute(
        &self,
        request: &ContentRequest,
        progress: &RequestProgress,
    ) -> Result<ContentRecord, StageError> {
        let result = self.run(request, progress).await;
        if let Err(e) = &result {
            error!(
                "Request '{}' failed at {}: {}",
                request.video_subject,
                e.stage(),
                e
            );
            progress.abort_remaining();
        }
        result
    }

    async fn run(
        &self,
        request: &ContentRequest,
        progress: &RequestProgress,
    ) -> Result<ContentRecord, StageError> {
        // Render
        let prompt = self
            .templates
            .read()
            .render_validated(&self.template_name, &request.template_variables())?;
        progress.tick("prompt rendered");

        // Script
        let script = self
            .with_timeout(StageKind::Script, self.script_generator.generate_script(&prompt))
            .await
            .map_err(|source| StageError::Generation {
                stage: StageKind::Script,
                source,
            })?;
        progress.set_title(&script.title);
        progress.tick("script generated");
        info!("Generated script '{}' for '{}'", script.title, request.video_subject);

        // Persist
        let new_content = NewContent::from_script(request, &script);
        let id = self
            .store
            .create(&new_content)
            .await
            .map_err(|source| StageError::Persistence {
                stage: StageKind::Persist,
                source,
            })?;
        let mut record = ContentRecord::from_new(id, &new_content, Utc::now());

        let started = ContentUpdate::new()
            .status(ContentStatus::InProgress)
            .progress(3.0 / STEPS_PER_REQUEST as f64 * 100.0)
            .current_step(StageKind::Persist.as_str());
        if let Err(source) = self.store.update(id, &started).await {
            self.mark_failed(id, &source.to_string()).await;
            return Err(StageError::Persistence {
                stage: StageKind::Persist,
                source,
            });
        }
        apply_local(&mut record, &started);
        progress.tick("record persisted");

        // Optional stages
        let mut failures = Vec::new();
        for kind in ServiceKind::ALL {
            if !request.is_enabled(kind) {
                progress.tick(format!("{} skipped", kind));
                continue;
            }

            match self.run_media_stage(kind, request, &script, &record).await {
                Ok(url) => {
                    let update = ContentUpdate::new()
                        .media_url(kind, url)
                        .progress(progress_after_slot(kind))
                        .current_step(kind.as_str());
                    match self.store.update(id, &update).await {
                        Ok(()) => {
                            apply_local(&mut record, &update);
                            progress.tick(format!("{} generated", kind));
                        }
                        Err(e) => {
                            warn!("Could not store {} url for content {}: {}", kind, id, e);
                            failures.push(StageFailure {
                                stage: kind.stage(),
                                message: e.to_string(),
                            });
                            progress.tick(format!("{} failed", kind));
                        }
                    }
                }
                Err(e) => {
                    warn!("{} stage failed for content {}: {}", kind, id, e);
                    failures.push(StageFailure {
                        stage: kind.stage(),
                        message: e.to_string(),
                    });
                    progress.tick(format!("{} failed", kind));
                }
            }
        }

        // Finalize
        let finalize = self.final_update(&failures);
        if let Err(source) = self.store.update(id, &finalize).await {
            self.mark_failed(id, &source.to_string()).await;
            return Err(StageError::Persistence {
                stage: StageKind::Finalize,
                source,
            });
        }
        apply_local(&mut record, &finalize);
        debug!(
            "Content {} finished as {} ({} of {} slots)",
            id,
            record.status,
            STEPS_PER_REQUEST - progress.remaining(),
            STEPS_PER_REQUEST
        );

        Ok(record)
    }

    async fn run_media_stage(
        &self,
        kind: ServiceKind,
        request: &ContentRequest,
        script: &GeneratedScript,
        record: &ContentRecord,
    ) -> Result<String, GenerationError> {
        let stage = kind.stage();
        match kind {
            ServiceKind::Image => {
                let description = if script.description.trim().is_empty() {
                    script.title.as_str()
                } else {
                    script.description.as_str()
                };
                self.with_timeout(stage, self.media.generate_image(description)).await
            }
            ServiceKind::Voice => {
                let narration = script.narration();
                self.with_timeout(stage, self.media.generate_voice(&narration)).await
            }
            ServiceKind::Music => {
                let prompt = request.music_prompt();
                self.with_timeout(stage, self.media.generate_music(&prompt)).await
            }
            ServiceKind::Video => {
                let input = VideoInput {
                    content_id: record.id,
                    script: script.narration(),
                    image_url: record.generated_picture.clone(),
                    voice_url: record.generated_voice.clone(),
                    music_url: record.generated_music.clone(),
                };
                self.with_timeout(stage, self.media.generate_video(&input)).await
            }
        }
    }

    fn final_update(&self, failures: &[StageFailure]) -> ContentUpdate {
        let update = ContentUpdate::new().stage_failures(failures.to_vec());

        if self.policy == CompletionPolicy::Strict && !failures.is_empty() {
            let stages: Vec<&str> = failures.iter().map(|f| f.stage.as_str()).collect();
            return update
                .status(ContentStatus::Failed)
                .current_step(StageKind::Finalize.as_str())
                .error_message(format!("Optional stages failed: {}", stages.join(", ")));
        }

        update
            .status(ContentStatus::Completed)
            .progress(100.0)
            .current_step("completed")
    }

    /// Best-effort attempt to leave an abandoned record in `failed`
    async fn mark_failed(&self, id: ContentId, message: &str) {
        let update = ContentUpdate::new()
            .status(ContentStatus::Failed)
            .error_message(message);
        if let Err(e) = self.store.update(id, &update).await {
            warn!("Could not mark content {} as failed: {}", id, e);
        }
    }

    async fn with_timeout<T, F>(&self, stage: StageKind, call: F) -> Result<T, GenerationError>
    where
        F: Future<Output = Result<T, GenerationError>>,
    {
        match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenerationError::Timeout {
                    stage,
                    millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })?,
            None => call.await,
        }
    }
}

/// Record progress once the slot of an optional stage is done
fn progress_after_slot(kind: ServiceKind) -> f64 {
    let slot = match kind {
        ServiceKind::Image => 4,
        ServiceKind::Voice => 5,
        ServiceKind::Music => 6,
        ServiceKind::Video => 7,
    };
    slot as f64 / STEPS_PER_REQUEST as f64 * 100.0
}

/// Mirror an update the store already accepted onto the local copy
fn apply_local(record: &mut ContentRecord, update: &ContentUpdate) {
    if let Err(e) = record.apply(update, Utc::now()) {
        warn!("Local copy of content {} diverged from the store: {}", record.id, e);
    }
}
