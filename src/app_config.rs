use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::content::ServiceKind;
use crate::pipeline::CompletionPolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Script generation (chat model) settings
    #[serde(default)]
    pub script: ScriptConfig,

    /// Media service settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Batch pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Content store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Chat model provider used for script generation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptProvider {
    #[default]
    OpenAI,
    Anthropic,
}

impl ScriptProvider {
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding the API key when the config has none
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for ScriptProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ScriptProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid script provider: {}", s)),
        }
    }
}

/// Script generation settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScriptConfig {
    #[serde(default)]
    pub provider: ScriptProvider,

    /// Model name; empty selects the provider default
    #[serde(default = "String::new")]
    pub model: String,

    /// API key; empty falls back to the provider's environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    /// API endpoint; empty selects the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    #[serde(default = "default_script_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            provider: ScriptProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_script_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl ScriptConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        match self.provider {
            ScriptProvider::OpenAI => default_openai_model(),
            ScriptProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider {
            ScriptProvider::OpenAI => default_openai_endpoint(),
            ScriptProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the API key, falling back to the provider's environment variable
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(self.provider.api_key_env_var()).unwrap_or_default()
    }
}

/// How media stages are served
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    /// Fixed example URLs, no network
    #[default]
    Placeholder,
    /// JSON over HTTP to the configured endpoints
    Http,
}

/// Media service settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MediaConfig {
    #[serde(default)]
    pub mode: MediaMode,

    #[serde(default = "String::new")]
    pub image_endpoint: String,

    #[serde(default = "String::new")]
    pub voice_endpoint: String,

    #[serde(default = "String::new")]
    pub music_endpoint: String,

    #[serde(default = "String::new")]
    pub video_endpoint: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mode: MediaMode::default(),
            image_endpoint: String::new(),
            voice_endpoint: String::new(),
            music_endpoint: String::new(),
            video_endpoint: String::new(),
            api_key: String::new(),
            timeout_secs: default_media_timeout_secs(),
        }
    }
}

impl MediaConfig {
    /// Configured endpoint for a service kind, if any
    pub fn endpoint(&self, kind: ServiceKind) -> Option<&str> {
        let endpoint = match kind {
            ServiceKind::Image => &self.image_endpoint,
            ServiceKind::Voice => &self.voice_endpoint,
            ServiceKind::Music => &self.music_endpoint,
            ServiceKind::Video => &self.video_endpoint,
        };
        (!endpoint.is_empty()).then_some(endpoint.as_str())
    }
}

/// Batch pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Template rendered for every request
    #[serde(default = "default_template_name")]
    pub template_name: String,

    /// YAML or JSON template file; the built-in set is used when unset
    #[serde(default)]
    pub templates_path: Option<String>,

    /// Worker pool size; the provider profile decides when unset
    #[serde(default)]
    pub max_concurrent_requests: Option<usize>,

    /// Per-call timeout for generation collaborators
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,

    #[serde(default)]
    pub completion_policy: CompletionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            template_name: default_template_name(),
            templates_path: None,
            max_concurrent_requests: None,
            stage_timeout_secs: None,
            completion_policy: CompletionPolicy::default(),
        }
    }
}

/// Content store settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite file; the user data directory is used when unset
    #[serde(default)]
    pub path: Option<String>,

    /// Keep records in memory only
    #[serde(default)]
    pub in_memory: bool,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_script_timeout_secs() -> u64 {
    60
}

fn default_media_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_template_name() -> String {
    "video_content".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_system_prompt() -> String {
    crate::providers::script_writer::DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Config {
    /// Load the configuration file, writing a default one if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.script.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} (set script.api_key or {})",
                self.script.provider.display_name(),
                self.script.provider.api_key_env_var()
            ));
        }

        Url::parse(&self.script.get_endpoint())
            .with_context(|| format!("Invalid script endpoint: {}", self.script.get_endpoint()))?;

        if self.script.timeout_secs == 0 {
            return Err(anyhow!("script.timeout_secs must be greater than 0"));
        }

        if self.media.mode == MediaMode::Http {
            let mut configured = 0;
            for kind in ServiceKind::ALL {
                if let Some(endpoint) = self.media.endpoint(kind) {
                    Url::parse(endpoint)
                        .with_context(|| format!("Invalid {} endpoint: {}", kind, endpoint))?;
                    configured += 1;
                }
            }
            if configured == 0 {
                return Err(anyhow!("media.mode is 'http' but no media endpoint is configured"));
            }
        }

        if self.pipeline.template_name.trim().is_empty() {
            return Err(anyhow!("pipeline.template_name must not be empty"));
        }

        if self.pipeline.max_concurrent_requests == Some(0) {
            return Err(anyhow!("pipeline.max_concurrent_requests must be greater than 0"));
        }

        if self.pipeline.stage_timeout_secs == Some(0) {
            return Err(anyhow!("pipeline.stage_timeout_secs must be greater than 0"));
        }

        Ok(())
    }
}
