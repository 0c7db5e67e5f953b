/*!
 * Tests for configuration files on disk
 */

use anyhow::Result;
use reelsmith::app_config::{Config, LogLevel, MediaMode, ScriptProvider};
use reelsmith::content::ServiceKind;
use reelsmith::pipeline::CompletionPolicy;

use crate::common;

/// Test loading a full configuration file
#[test]
fn test_loadOrCreate_withFullFile_shouldReadEverySection() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "script": {
                "provider": "anthropic",
                "model": "claude-3-5-sonnet",
                "api_key": "key",
                "temperature": 0.2
            },
            "media": {
                "mode": "http",
                "image_endpoint": "http://localhost:9000/image",
                "video_endpoint": "http://localhost:9000/video"
            },
            "pipeline": {
                "template_name": "short_summary",
                "max_concurrent_requests": 2,
                "stage_timeout_secs": 30,
                "completion_policy": "strict"
            },
            "database": { "in_memory": true },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.script.provider, ScriptProvider::Anthropic);
    assert_eq!(config.script.get_model(), "claude-3-5-sonnet");
    assert_eq!(config.script.temperature, 0.2);
    assert_eq!(config.script.max_tokens, 1000);
    assert_eq!(config.media.mode, MediaMode::Http);
    assert_eq!(config.media.endpoint(ServiceKind::Image), Some("http://localhost:9000/image"));
    assert_eq!(config.media.endpoint(ServiceKind::Voice), None);
    assert_eq!(config.pipeline.template_name, "short_summary");
    assert_eq!(config.pipeline.max_concurrent_requests, Some(2));
    assert_eq!(config.pipeline.completion_policy, CompletionPolicy::Strict);
    assert!(config.database.in_memory);
    assert_eq!(config.log_level, LogLevel::Debug);
    config.validate()?;
    Ok(())
}

/// Test that a missing file is created and can be read back
#[test]
fn test_loadOrCreate_withMissingFile_shouldPersistDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(created, reloaded);
    assert_eq!(reloaded.pipeline.template_name, "video_content");
    Ok(())
}

/// Test that an invalid media endpoint is reported
#[test]
fn test_validate_withInvalidMediaEndpoint_shouldFail() {
    let mut config = Config::default();
    config.script.api_key = "key".to_string();
    config.media.mode = MediaMode::Http;
    config.media.voice_endpoint = "not a url".to_string();

    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("voice"));
}

/// Test that placeholder media needs no endpoints
#[test]
fn test_validate_withPlaceholderMedia_shouldIgnoreEndpoints() {
    let mut config = Config::default();
    config.script.api_key = "key".to_string();
    config.media.voice_endpoint = "not a url".to_string();

    assert!(config.validate().is_ok());
}
