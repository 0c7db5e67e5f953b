/*!
 * Generation collaborators used by the pipeline.
 *
 * The pipeline only talks to two narrow traits:
 * - `ScriptGenerator`: turns a prompt into a structured script
 * - `MediaGenerator`: turns stage input into an artifact URL
 *
 * Script generation is backed by a chat model through the `Provider` trait:
 * - OpenAI: chat completions API
 * - Anthropic: messages API
 *
 * Media generation is backed by HTTP services or by placeholder URLs.
 */

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

use crate::content::{ContentId, GeneratedScript};
use crate::errors::{GenerationError, ProviderError};

/// Common trait for all chat model providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the script writer.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Build a request from a system instruction and a user prompt
    fn chat_request(&self, system: &str, prompt: &str) -> Self::Request;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Produces the script for a rendered prompt
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate_script(&self, prompt: &str) -> Result<GeneratedScript, GenerationError>;
}

/// Input of the video stage: the record plus the artifacts produced before it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInput {
    pub content_id: ContentId,
    pub script: String,
    pub image_url: Option<String>,
    pub voice_url: Option<String>,
    pub music_url: Option<String>,
}

/// Produces media artifacts and returns their URLs
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn generate_image(&self, description: &str) -> Result<String, GenerationError>;

    async fn generate_voice(&self, narration: &str) -> Result<String, GenerationError>;

    async fn generate_music(&self, prompt: &str) -> Result<String, GenerationError>;

    async fn generate_video(&self, input: &VideoInput) -> Result<String, GenerationError>;
}

pub mod anthropic;
pub mod media;
pub mod mock;
pub mod openai;
pub mod script_writer;

pub use media::{HttpMediaClient, PlaceholderMedia};
pub use script_writer::LlmScriptWriter;
