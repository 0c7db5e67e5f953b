/*!
 * Mock collaborators for testing.
 *
 * `MockProvider` simulates a chat model behind the `Provider` trait:
 * - `MockProvider::working()` - Always replies with a valid script object
 * - `MockProvider::invalid()` - Replies with text that is not a script
 * - `MockProvider::failing()` - Always fails with an error
 *
 * `MockMedia` simulates the media services and records every call.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::content::ServiceKind;
use crate::errors::{GenerationError, ProviderError};
use crate::providers::{MediaGenerator, Provider, VideoInput};

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub system: String,
    pub prompt: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a well formed script
    Working,
    /// Replies with something that does not parse as a script
    Invalid,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Fails only for prompts containing the marker
    FailWhenPromptContains(String),
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// Panics inside the call
    Panicking,
}

/// Mock provider for testing script generation
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn invalid() -> Self {
        Self::new(MockBehavior::Invalid)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn fail_when_prompt_contains(marker: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailWhenPromptContains(marker.into()))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn panicking() -> Self {
        Self::new(MockBehavior::Panicking)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// A valid script reply whose title echoes the first prompt line
    pub fn script_reply(request: &MockRequest) -> String {
        let headline = request.prompt.lines().next().unwrap_or_default();
        serde_json::json!({
            "video_title": format!("Video: {}", headline),
            "description": "Generated by the mock provider",
            "main_scenes": [
                {"scene_description": "Opening narration", "visual_prompt": "Wide establishing shot"},
                {"scene_description": "Closing narration", "visual_prompt": "Slow fade to black"}
            ]
        })
        .to_string()
    }

    fn reply(&self, request: &MockRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => Self::script_reply(request),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    fn chat_request(&self, system: &str, prompt: &str) -> Self::Request {
        MockRequest {
            system: system.to_string(),
            prompt: prompt.to_string(),
        }
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Working => Ok(MockResponse {
                text: self.reply(&request),
            }),

            MockBehavior::Invalid => Ok(MockResponse {
                text: "Here is your script: a video about things.".to_string(),
            }),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(MockResponse {
                        text: self.reply(&request),
                    })
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::FailWhenPromptContains(marker) => {
                if request.prompt.contains(marker.as_str()) {
                    Err(ProviderError::RequestFailed(format!(
                        "Simulated failure for prompt containing '{}'",
                        marker
                    )))
                } else {
                    Ok(MockResponse {
                        text: self.reply(&request),
                    })
                }
            }

            MockBehavior::Empty => Ok(MockResponse {
                text: String::new(),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(MockResponse {
                    text: self.reply(&request),
                })
            }

            MockBehavior::Panicking => panic!("mock provider panicked on request #{}", count + 1),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

/// One recorded media call
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCall {
    pub kind: ServiceKind,
    pub input: String,
}

/// Mock media services returning `mock://` URLs
#[derive(Debug, Clone, Default)]
pub struct MockMedia {
    failing: BTreeSet<ServiceKind>,
    panicking: BTreeSet<ServiceKind>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<MediaCall>>>,
}

impl MockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make one service kind fail on every call
    pub fn failing(mut self, kind: ServiceKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Make one service kind panic on every call
    pub fn panicking(mut self, kind: ServiceKind) -> Self {
        self.panicking.insert(kind);
        self
    }

    /// Delay every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All calls received so far, in arrival order
    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().clone()
    }

    /// Calls received for one service kind
    pub fn calls_for(&self, kind: ServiceKind) -> usize {
        self.calls.lock().iter().filter(|call| call.kind == kind).count()
    }

    async fn serve(&self, kind: ServiceKind, input: String) -> Result<String, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push(MediaCall { kind, input });
            calls.len()
        };

        if self.panicking.contains(&kind) {
            panic!("mock {} service panicked", kind);
        }
        if self.failing.contains(&kind) {
            return Err(GenerationError::service(
                kind.stage(),
                format!("simulated {} outage", kind),
            ));
        }
        Ok(format!("mock://{}/{}", kind, call_number))
    }
}

#[async_trait]
impl MediaGenerator for MockMedia {
    async fn generate_image(&self, description: &str) -> Result<String, GenerationError> {
        self.serve(ServiceKind::Image, description.to_string()).await
    }

    async fn generate_voice(&self, narration: &str) -> Result<String, GenerationError> {
        self.serve(ServiceKind::Voice, narration.to_string()).await
    }

    async fn generate_music(&self, prompt: &str) -> Result<String, GenerationError> {
        self.serve(ServiceKind::Music, prompt.to_string()).await
    }

    async fn generate_video(&self, input: &VideoInput) -> Result<String, GenerationError> {
        let input = serde_json::to_string(input).unwrap_or_default();
        self.serve(ServiceKind::Video, input).await
    }
}
