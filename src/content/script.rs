/*!
 * Generated script model.
 */

use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;

/// One scene of a generated script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Narration spoken over the scene
    #[serde(alias = "scene_description")]
    pub narration: String,

    /// Prompt describing what the scene shows
    #[serde(alias = "visual_description")]
    pub visual_prompt: String,
}

impl Scene {
    pub fn new(narration: impl Into<String>, visual_prompt: impl Into<String>) -> Self {
        Self {
            narration: narration.into(),
            visual_prompt: visual_prompt.into(),
        }
    }
}

/// Output of the script generation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScript {
    #[serde(alias = "video_title")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(alias = "main_scenes")]
    pub scenes: Vec<Scene>,
}

impl GeneratedScript {
    /// Parse a model reply into a script.
    ///
    /// Accepts bare JSON or JSON wrapped in a markdown code fence.
    pub fn parse(reply: &str) -> Result<Self, GenerationError> {
        let body = strip_code_fence(reply);
        let script: GeneratedScript = serde_json::from_str(body)
            .map_err(|e| GenerationError::InvalidScript(format!("reply is not a script object: {}", e)))?;
        script.validate()?;
        Ok(script)
    }

    /// Check the script is usable by the later stages
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.title.trim().is_empty() {
            return Err(GenerationError::InvalidScript("script has no title".to_string()));
        }
        if self.scenes.is_empty() {
            return Err(GenerationError::InvalidScript("script has no scenes".to_string()));
        }
        Ok(())
    }

    /// Scene narrations joined line by line, as sent to the voice service
    pub fn narration(&self) -> String {
        self.scenes
            .iter()
            .map(|scene| scene.narration.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
