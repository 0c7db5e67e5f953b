use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, MediaMode, ScriptProvider};
use crate::content::{ContentRequest, ServiceKind};
use crate::database::{ContentStore, DatabaseConnection, MemoryStore, Repository};
use crate::errors::AppError;
use crate::pipeline::{
    BatchReport, ContentPipeline, ProgressObserver, ProgressSnapshot, StepRecord, WorkerPoolProfile,
};
use crate::prompts::TemplateSet;
use crate::providers::anthropic::Anthropic;
use crate::providers::openai::OpenAI;
use crate::providers::{
    HttpMediaClient, LlmScriptWriter, MediaGenerator, PlaceholderMedia, ScriptGenerator,
};

// @module: Application controller for batch content generation

/// Requests file: a JSON array of requests, or a single request object
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestsFile {
    Many(Vec<ContentRequest>),
    One(Box<ContentRequest>),
}

/// Progress bar fed by the batch progress tracker
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new(total_steps: u64) -> Self {
        let bar = ProgressBar::new(total_steps);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_progress(&self, record: &StepRecord, snapshot: &ProgressSnapshot) {
        self.bar.set_position(snapshot.current_step as u64);
        let label = record.title.as_deref().unwrap_or(&record.subject);
        self.bar.set_message(format!("{}: {}", label, record.status));
    }
}

/// Main application controller for batch generation
pub struct Controller {
    config: Config,
}

impl Controller {
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the configured template set, or the built-in one
    pub fn load_templates(&self) -> Result<TemplateSet, AppError> {
        let templates = match &self.config.pipeline.templates_path {
            Some(path) => TemplateSet::from_file(path)?,
            None => TemplateSet::builtin()?,
        };
        if !templates.contains(&self.config.pipeline.template_name) {
            return Err(AppError::Config(format!(
                "template '{}' is not defined (available: {})",
                self.config.pipeline.template_name,
                templates.names().join(", ")
            )));
        }
        Ok(templates)
    }

    fn script_generator(&self) -> Arc<dyn ScriptGenerator> {
        let script = &self.config.script;
        match script.provider {
            ScriptProvider::OpenAI => {
                let client = OpenAI::new(
                    script.get_api_key(),
                    script.get_endpoint(),
                    script.get_model(),
                    script.timeout_secs,
                )
                .with_sampling(script.temperature, script.max_tokens);
                Arc::new(LlmScriptWriter::new(client).with_system_prompt(&script.system_prompt))
            }
            ScriptProvider::Anthropic => {
                let client = Anthropic::new(
                    script.get_api_key(),
                    script.get_endpoint(),
                    script.get_model(),
                    script.timeout_secs,
                )
                .with_sampling(script.temperature, script.max_tokens);
                Arc::new(LlmScriptWriter::new(client).with_system_prompt(&script.system_prompt))
            }
        }
    }

    fn media_generator(&self, dry_run: bool) -> Result<Arc<dyn MediaGenerator>> {
        let media = &self.config.media;
        if dry_run || media.mode == MediaMode::Placeholder {
            return Ok(Arc::new(PlaceholderMedia));
        }

        let api_key = (!media.api_key.is_empty()).then(|| media.api_key.clone());
        let mut client = HttpMediaClient::new(api_key, media.timeout_secs);
        for kind in ServiceKind::ALL {
            match media.endpoint(kind) {
                Some(endpoint) => {
                    client = client
                        .with_endpoint(kind, endpoint)
                        .with_context(|| format!("Invalid {} endpoint: {}", kind, endpoint))?;
                }
                None => warn!("No {} endpoint configured; requests enabling it will record a failure", kind),
            }
        }
        Ok(Arc::new(client))
    }

    fn content_store(&self, dry_run: bool) -> Result<Arc<dyn ContentStore>> {
        let database = &self.config.database;
        if dry_run || database.in_memory {
            return Ok(Arc::new(MemoryStore::new()));
        }

        let connection = match &database.path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        debug!("Content database: {}", connection.stats()?);
        Ok(Arc::new(Repository::new(connection)))
    }

    /// Assemble the pipeline from the configuration
    pub fn build_pipeline(&self, dry_run: bool) -> Result<ContentPipeline> {
        let pipeline_config = &self.config.pipeline;
        let workers = WorkerPoolProfile::for_provider(self.config.script.provider)
            .effective_concurrent_requests(pipeline_config.max_concurrent_requests);

        let pipeline = ContentPipeline::new(
            self.load_templates()?,
            self.script_generator(),
            self.media_generator(dry_run)?,
            self.content_store(dry_run)?,
        )
        .with_template_name(&pipeline_config.template_name)
        .with_policy(pipeline_config.completion_policy)
        .with_stage_timeout(pipeline_config.stage_timeout_secs.map(Duration::from_secs))
        .with_max_concurrent_requests(workers);

        Ok(pipeline)
    }

    /// Read a requests file
    pub fn load_requests(path: &Path) -> Result<Vec<ContentRequest>, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::File(format!("Failed to read {:?}: {}", path, e)))?;
        let parsed: RequestsFile = serde_json::from_str(&content)
            .map_err(|e| AppError::File(format!("Invalid requests file {:?}: {}", path, e)))?;

        Ok(match parsed {
            RequestsFile::Many(requests) => requests,
            RequestsFile::One(request) => vec![*request],
        })
    }

    /// Write a batch report as pretty JSON
    pub fn write_results(path: &Path, report: &BatchReport) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| AppError::Unknown(format!("Failed to serialize results: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Default results path: `<requests stem>.results.json` next to the input
    pub fn default_output_path(requests_path: &Path) -> PathBuf {
        let stem = requests_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "requests".to_string());
        requests_path.with_file_name(format!("{}.results.json", stem))
    }

    /// Run a batch with a prepared pipeline and write its results
    pub async fn run_batch(
        &self,
        pipeline: ContentPipeline,
        requests_path: &Path,
        output_path: &Path,
    ) -> Result<BatchReport> {
        let requests = Self::load_requests(requests_path)?;
        if requests.is_empty() {
            warn!("No requests found in {:?}", requests_path);
        }

        let start_time = std::time::Instant::now();
        let total_steps = (requests.len() * crate::pipeline::STEPS_PER_REQUEST) as u64;
        let observer = Arc::new(ProgressBarObserver::new(total_steps));
        let pipeline = pipeline.with_observer(observer.clone());

        let report = pipeline.process_batch(requests).await;
        observer.finish();

        Self::write_results(output_path, &report)
            .with_context(|| format!("Failed to write results to {:?}", output_path))?;

        info!(
            "{} in {}. Results written to {:?}",
            report.summary(),
            Self::format_duration(start_time.elapsed()),
            output_path
        );
        for error in report.errors() {
            warn!("Request {} ('{}') failed: {}", error.index + 1, error.subject, error.message);
        }

        Ok(report)
    }

    /// Build the pipeline from the configuration and run a batch
    pub async fn run(
        &self,
        requests_path: &Path,
        output_path: Option<PathBuf>,
        dry_run: bool,
    ) -> Result<BatchReport> {
        if !requests_path.exists() {
            return Err(anyhow!("Requests file does not exist: {:?}", requests_path));
        }
        let output_path = output_path.unwrap_or_else(|| Self::default_output_path(requests_path));
        if dry_run {
            info!("Dry run: placeholder media and in-memory store");
        }

        let pipeline = self.build_pipeline(dry_run)?;
        self.run_batch(pipeline, requests_path, &output_path).await
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
