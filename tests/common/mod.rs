/*!
 * Common test utilities for the reelsmith test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use reelsmith::content::{ContentRequest, ServiceKind};
use reelsmith::database::ContentStore;
use reelsmith::pipeline::{ContentPipeline, ProgressObserver, ProgressSnapshot, StepRecord};
use reelsmith::providers::mock::{MockMedia, MockProvider};
use reelsmith::providers::LlmScriptWriter;
use reelsmith::prompts::TemplateSet;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a requests file holding the given requests
pub fn create_requests_file(dir: &Path, filename: &str, requests: &[ContentRequest]) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(requests)?;
    create_test_file(dir, filename, &json)
}

/// A request with every optional service enabled
pub fn full_request(subject: &str) -> ContentRequest {
    ContentRequest::new(subject).with_services(ServiceKind::ALL)
}

/// Pipeline over mock collaborators and the built-in templates
pub fn mock_pipeline(
    provider: MockProvider,
    media: MockMedia,
    store: Arc<dyn ContentStore>,
) -> ContentPipeline {
    ContentPipeline::new(
        TemplateSet::builtin().expect("built-in templates should load"),
        Arc::new(LlmScriptWriter::new(provider)),
        Arc::new(media),
        store,
    )
}

/// Observer that keeps every notification it receives
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(StepRecord, ProgressSnapshot)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(StepRecord, ProgressSnapshot)> {
        self.events.lock().clone()
    }

    pub fn percentages(&self) -> Vec<f64> {
        self.events.lock().iter().map(|(_, s)| s.percentage).collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, record: &StepRecord, snapshot: &ProgressSnapshot) {
        self.events.lock().push((record.clone(), snapshot.clone()));
    }
}
