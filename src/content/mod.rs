/*!
 * Content model for the generation pipeline.
 *
 * - `request`: batch input (`ContentRequest`) and the enabled service set
 * - `script`: the structured script returned by the script generator
 * - `record`: the persisted aggregate and its derived sub-entities
 */

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod record;
pub mod request;
pub mod script;

pub use record::{
    AudioPrompt, ContentId, ContentRecord, ContentStatus, ContentUpdate, MusicPrompt, NewContent,
    SceneRecord, StageFailure, VisualPrompt,
};
pub use request::{
    ContentOptions, ContentRequest, GeneralOptions, ServiceKind, ServiceSet, VisualPromptOptions,
};
pub use script::{GeneratedScript, Scene};

/// One discrete unit of work for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Render,
    Script,
    Persist,
    Image,
    Voice,
    Music,
    Video,
    Finalize,
}

impl StageKind {
    /// Whether a failure at this stage fails the whole request
    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::Render | Self::Script | Self::Persist | Self::Finalize)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Script => "script",
            Self::Persist => "persist",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Music => "music",
            Self::Video => "video",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
