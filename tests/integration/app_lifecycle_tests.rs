/*!
 * Integration tests for the application controller
 */

use anyhow::Result;
use std::sync::Arc;

use reelsmith::app_config::{Config, ScriptProvider};
use reelsmith::app_controller::Controller;
use reelsmith::content::{ContentRequest, ServiceKind};
use reelsmith::database::MemoryStore;
use reelsmith::errors::AppError;
use reelsmith::providers::mock::{MockMedia, MockProvider};

use crate::common;

fn test_config() -> Config {
    let mut config = Config::default();
    config.script.api_key = "test-key".to_string();
    config.database.in_memory = true;
    config
}

/// Test a full run: requests file in, results file out
#[tokio::test]
async fn test_runBatch_withRequestsFile_shouldWriteResults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let requests_path = common::create_requests_file(
        temp_dir.path(),
        "batch.json",
        &[
            ContentRequest::new("Jellyfish").with_services([ServiceKind::Image]),
            ContentRequest::new("Volcano"),
        ],
    )?;
    let output_path = Controller::default_output_path(&requests_path);

    let controller = Controller::with_config(test_config());
    let pipeline = common::mock_pipeline(
        MockProvider::fail_when_prompt_contains("Volcano"),
        MockMedia::new(),
        Arc::new(MemoryStore::new()),
    );
    let report = controller.run_batch(pipeline, &requests_path, &output_path).await?;

    assert_eq!(report.summary().completed, 1);
    assert_eq!(report.summary().errors, 1);

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output_path)?)?;
    let entries = written["entries"].as_array().expect("entries should be an array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], "content");
    assert_eq!(entries[0]["status"], "completed");
    assert_eq!(entries[1]["kind"], "error");
    assert_eq!(entries[1]["stage"], "script");
    assert_eq!(written["progress"]["percentage"], 100.0);
    Ok(())
}

/// Test that a single request object is accepted
#[test]
fn test_loadRequests_withSingleObject_shouldReturnOneRequest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "one.json",
        r#"{
            "videoSubject": "Owls",
            "generalOptions": {
                "style": "calm",
                "sceneAmount": 2,
                "duration": 30,
                "tone": "soft",
                "vocabulary": "simple",
                "targetAudience": "kids",
                "services": ["voice"]
            }
        }"#,
    )?;

    let requests = Controller::load_requests(&path)?;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].video_subject, "Owls");
    assert!(requests[0].is_enabled(ServiceKind::Voice));
    Ok(())
}

/// Test that a malformed requests file is a file error
#[test]
fn test_loadRequests_withMalformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "bad.json", "[{\"videoSubject\": 1}]")?;

    let result = Controller::load_requests(&path);
    assert!(matches!(result, Err(AppError::File(_))));
    Ok(())
}

/// Test that run refuses a missing requests file
#[test]
fn test_run_withMissingRequestsFile_shouldFail() {
    let controller = Controller::with_config(test_config());
    let result = tokio_test::block_on(async {
        controller
            .run(std::path::Path::new("/nonexistent/requests.json"), None, true)
            .await
    });
    assert!(result.is_err());
}

/// Test that the pipeline is sized from the provider profile
#[test]
fn test_buildPipeline_shouldUseProviderProfileUnlessOverridden() -> Result<()> {
    let mut config = test_config();
    config.script.provider = ScriptProvider::Anthropic;
    let pipeline = Controller::with_config(config.clone()).build_pipeline(true)?;
    assert_eq!(pipeline.max_concurrent_requests(), 5);

    config.pipeline.max_concurrent_requests = Some(2);
    let pipeline = Controller::with_config(config).build_pipeline(true)?;
    assert_eq!(pipeline.max_concurrent_requests(), 2);
    Ok(())
}

/// Test that a custom template file is used when configured
#[test]
fn test_loadTemplates_withCustomFile_shouldUseIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "templates.yaml",
        "teaser:\n  template: \"Teaser for {videoSubject}\"\n",
    )?;

    let mut config = test_config();
    config.pipeline.templates_path = Some(path.to_string_lossy().to_string());
    config.pipeline.template_name = "teaser".to_string();

    let templates = Controller::with_config(config).load_templates()?;
    assert_eq!(templates.names(), vec!["teaser"]);
    Ok(())
}
