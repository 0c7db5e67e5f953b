/*!
 * Batch orchestration.
 *
 * `ContentPipeline::process_batch` runs every request of a batch on its own
 * task, bounded by the worker pool size, and returns one entry per request
 * in submission order. A request that fails, or whose task panics, becomes an
 * error entry without affecting its siblings.
 */

use futures::stream::{self, StreamExt};
use log::{error, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::executor::{CompletionPolicy, RequestProgress, StageExecutor, STEPS_PER_REQUEST};
use super::progress::{ProgressObserver, ProgressSnapshot, ProgressTracker, StepRecord};
use crate::content::{ContentRecord, ContentRequest, ContentStatus, StageKind};
use crate::database::ContentStore;
use crate::errors::StageError;
use crate::prompts::TemplateSet;
use crate::providers::{MediaGenerator, ScriptGenerator};

/// Default worker pool size when none is configured
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Why a request produced no content record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Position of the request in the batch
    pub index: usize,
    pub subject: String,
    /// Stage that failed; `None` when the task itself died
    pub stage: Option<StageKind>,
    pub message: String,
}

impl ErrorRecord {
    fn from_stage_error(index: usize, subject: String, error: &StageError) -> Self {
        Self {
            index,
            subject,
            stage: Some(error.stage()),
            message: error.to_string(),
        }
    }
}

/// Outcome of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchEntry {
    Content(ContentRecord),
    Error(ErrorRecord),
}

impl BatchEntry {
    pub fn record(&self) -> Option<&ContentRecord> {
        match self {
            Self::Content(record) => Some(record),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Content(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

/// Counts over a batch report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub requests: usize,
    pub completed: usize,
    /// Records that exist but ended as failed
    pub failed: usize,
    /// Requests that produced no record, or whose task died
    pub errors: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests: {} completed, {} failed, {} errors",
            self.requests, self.completed, self.failed, self.errors
        )
    }
}

/// Result of `process_batch`
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One entry per request, in submission order
    pub entries: Vec<BatchEntry>,
    pub progress: ProgressSnapshot,
    pub steps: Vec<StepRecord>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            requests: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            match entry {
                BatchEntry::Content(record) if record.status == ContentStatus::Completed => {
                    summary.completed += 1
                }
                BatchEntry::Content(_) => summary.failed += 1,
                BatchEntry::Error(_) => summary.errors += 1,
            }
        }
        summary
    }

    pub fn records(&self) -> impl Iterator<Item = &ContentRecord> {
        self.entries.iter().filter_map(BatchEntry::record)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.entries.iter().filter_map(BatchEntry::error)
    }
}

/// Batch content generation pipeline
pub struct ContentPipeline {
    templates: Arc<RwLock<TemplateSet>>,
    executor: StageExecutor,
    max_concurrent_requests: usize,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ContentPipeline {
    pub fn new(
        templates: TemplateSet,
        script_generator: Arc<dyn ScriptGenerator>,
        media: Arc<dyn MediaGenerator>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let templates = Arc::new(RwLock::new(templates));
        let executor = StageExecutor::new(
            templates.clone(),
            "video_content",
            script_generator,
            media,
            store,
        );
        Self {
            templates,
            executor,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            observer: None,
        }
    }

    pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
        self.executor = self.executor.with_template_name(name);
        self
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.executor = self.executor.with_policy(policy);
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.executor = self.executor.with_stage_timeout(timeout);
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Shared template set; edits apply to the next rendered prompt
    pub fn templates(&self) -> Arc<RwLock<TemplateSet>> {
        self.templates.clone()
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Process every request and return one entry per request, in order
    pub async fn process_batch(&self, requests: Vec<ContentRequest>) -> BatchReport {
        let total_requests = requests.len();
        let mut tracker = ProgressTracker::new(total_requests * STEPS_PER_REQUEST);
        if let Some(observer) = &self.observer {
            tracker = tracker.with_observer(observer.clone());
        }
        let tracker = Arc::new(tracker);

        // Create a semaphore to limit concurrent requests
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let started = Instant::now();

        info!(
            "Processing {} requests with template '{}' ({} workers)",
            total_requests,
            self.executor.template_name(),
            self.max_concurrent_requests
        );

        let mut results = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                let executor = self.executor.clone();
                let semaphore = semaphore.clone();
                let subject = request.video_subject.clone();
                let progress = RequestProgress::new(tracker.clone(), index, subject.clone());

                async move {
                    let task_progress = progress.clone();
                    let handle = tokio::spawn(async move {
                        let _permit = semaphore.acquire_owned().await.ok();
                        executor.execute(&request, &task_progress).await
                    });

                    let entry = match handle.await {
                        Ok(Ok(record)) => BatchEntry::Content(record),
                        Ok(Err(e)) => BatchEntry::Error(ErrorRecord::from_stage_error(index, subject, &e)),
                        Err(join_error) => {
                            let message = if join_error.is_panic() {
                                format!("request task panicked: {}", panic_message(join_error.into_panic()))
                            } else {
                                format!("request task was cancelled: {}", join_error)
                            };
                            error!("Request {} ('{}'): {}", index + 1, subject, message);
                            progress.abort_remaining();
                            BatchEntry::Error(ErrorRecord {
                                index,
                                subject,
                                stage: None,
                                message,
                            })
                        }
                    };
                    (index, entry)
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        // Sort results by request index to restore submission order
        results.sort_by_key(|(index, _)| *index);

        let report = BatchReport {
            entries: results.into_iter().map(|(_, entry)| entry).collect(),
            progress: tracker.snapshot(),
            steps: tracker.steps(),
        };
        info!("Batch finished in {:.2?}: {}", started.elapsed(), report.summary());
        report
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
