use async_trait::async_trait;
use log::debug;

use super::{Provider, ScriptGenerator};
use crate::content::GeneratedScript;
use crate::errors::GenerationError;

/// System instruction sent with every script prompt unless overridden
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a creative content generator for short videos. \
Always reply with a single JSON object.";

/// Script generator backed by a chat model provider
#[derive(Debug)]
pub struct LlmScriptWriter<P: Provider> {
    provider: P,
    system_prompt: String,
}

impl<P: Provider> LlmScriptWriter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the system instruction
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: Provider> ScriptGenerator for LlmScriptWriter<P> {
    async fn generate_script(&self, prompt: &str) -> Result<GeneratedScript, GenerationError> {
        let request = self.provider.chat_request(&self.system_prompt, prompt);
        let response = self.provider.complete(request).await?;
        let text = P::extract_text(&response);

        if text.trim().is_empty() {
            return Err(GenerationError::InvalidScript("model returned an empty reply".to_string()));
        }
        debug!("Script reply received ({} chars)", text.len());

        GeneratedScript::parse(&text)
    }
}
