/*!
 * Batch input model.
 *
 * A `ContentRequest` describes one short video to generate. The wire format
 * is camelCase JSON so request files written for the web frontend can be fed
 * to the pipeline unchanged.
 */

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use super::StageKind;

/// Optional generation service that can be enabled per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    #[serde(alias = "generate_image")]
    Image,
    #[serde(alias = "generate_voice")]
    Voice,
    #[serde(alias = "generate_music")]
    Music,
    #[serde(alias = "generate_video")]
    Video,
}

impl ServiceKind {
    /// All optional services in execution order
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Image,
        ServiceKind::Voice,
        ServiceKind::Music,
        ServiceKind::Video,
    ];

    /// The pipeline stage that runs this service
    pub fn stage(self) -> StageKind {
        match self {
            Self::Image => StageKind::Image,
            Self::Voice => StageKind::Voice,
            Self::Music => StageKind::Music,
            Self::Video => StageKind::Video,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Music => "music",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.strip_prefix("generate_").unwrap_or(&name) {
            "image" => Ok(Self::Image),
            "voice" => Ok(Self::Voice),
            "music" => Ok(Self::Music),
            "video" => Ok(Self::Video),
            _ => Err(anyhow::anyhow!("Invalid service: {}", s)),
        }
    }
}

/// Set of optional services enabled for a request
///
/// Serializes as a list (`["image", "voice"]`). Deserializes from either a
/// list or the flag map used by the web frontend
/// (`{"generate_image": true, "generate_voice": false}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSet(BTreeSet<ServiceKind>);

impl ServiceSet {
    /// No optional service enabled
    pub fn none() -> Self {
        Self::default()
    }

    /// Every optional service enabled
    pub fn all() -> Self {
        ServiceKind::ALL.into_iter().collect()
    }

    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: ServiceKind) -> bool {
        self.0.insert(kind)
    }

    pub fn remove(&mut self, kind: ServiceKind) -> bool {
        self.0.remove(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Enabled services in execution order
    pub fn iter(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ServiceKind> for ServiceSet {
    fn from_iter<I: IntoIterator<Item = ServiceKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ServiceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for ServiceSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<ServiceKind>),
            Flags(BTreeMap<String, bool>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::List(kinds) => Ok(kinds.into_iter().collect()),
            Repr::Flags(flags) => {
                let mut set = ServiceSet::none();
                for (name, enabled) in flags {
                    let kind: ServiceKind = name.parse().map_err(de::Error::custom)?;
                    if enabled {
                        set.insert(kind);
                    }
                }
                Ok(set)
            }
        }
    }
}

/// General video options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralOptions {
    pub style: String,
    #[serde(default)]
    pub description: String,
    pub scene_amount: u32,
    /// Target duration in seconds
    pub duration: u32,
    pub tone: String,
    pub vocabulary: String,
    pub target_audience: String,
    #[serde(default)]
    pub services: ServiceSet,
}

impl Default for GeneralOptions {
    fn default() -> Self {
        Self {
            style: "informative".to_string(),
            description: String::new(),
            scene_amount: 3,
            duration: 60,
            tone: "neutral".to_string(),
            vocabulary: "simple".to_string(),
            target_audience: "general audience".to_string(),
            services: ServiceSet::none(),
        }
    }
}

/// Narrative options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentOptions {
    #[serde(default)]
    pub pacing: String,
    #[serde(default)]
    pub description: String,
}

/// Options for the visual prompts of each scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualPromptOptions {
    #[serde(default)]
    pub picture_description: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub image_details: String,
    #[serde(default)]
    pub shot_details: String,
}

/// One unit of batch input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub video_subject: String,
    pub general_options: GeneralOptions,
    #[serde(default)]
    pub content_options: ContentOptions,
    #[serde(default)]
    pub visual_prompt_options: VisualPromptOptions,
}

impl ContentRequest {
    /// Create a request with default options
    pub fn new(video_subject: impl Into<String>) -> Self {
        Self {
            video_subject: video_subject.into(),
            general_options: GeneralOptions::default(),
            content_options: ContentOptions::default(),
            visual_prompt_options: VisualPromptOptions::default(),
        }
    }

    /// Replace the enabled service set
    pub fn with_services(mut self, services: impl IntoIterator<Item = ServiceKind>) -> Self {
        self.general_options.services = services.into_iter().collect();
        self
    }

    /// Set the video style
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.general_options.style = style.into();
        self
    }

    pub fn services(&self) -> &ServiceSet {
        &self.general_options.services
    }

    pub fn is_enabled(&self, kind: ServiceKind) -> bool {
        self.general_options.services.contains(kind)
    }

    /// Prompt sent to the music service
    pub fn music_prompt(&self) -> String {
        format!(
            "Create {} music for a video about {}",
            self.general_options.style, self.video_subject
        )
    }

    /// Nested variable map used to render the generation prompt
    pub fn template_variables(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
