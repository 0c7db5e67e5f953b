/*!
 * Media generation backends.
 *
 * `HttpMediaClient` posts a JSON body to one endpoint per service kind and
 * reads back `{"url": "..."}`. `PlaceholderMedia` answers every call with a
 * fixed example URL and is used for dry runs.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use super::{MediaGenerator, VideoInput};
use crate::content::ServiceKind;
use crate::errors::GenerationError;

/// Reply body expected from every media endpoint
#[derive(Debug, Deserialize)]
struct MediaResponse {
    url: String,
}

/// HTTP client for the image, voice, music and video services
#[derive(Debug, Clone)]
pub struct HttpMediaClient {
    client: Client,
    api_key: Option<String>,
    endpoints: BTreeMap<ServiceKind, Url>,
}

impl HttpMediaClient {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoints: BTreeMap::new(),
        }
    }

    /// Register the endpoint for one service kind
    pub fn with_endpoint(mut self, kind: ServiceKind, endpoint: &str) -> Result<Self, url::ParseError> {
        self.endpoints.insert(kind, Url::parse(endpoint)?);
        Ok(self)
    }

    pub fn endpoint(&self, kind: ServiceKind) -> Option<&Url> {
        self.endpoints.get(&kind)
    }

    async fn post(&self, kind: ServiceKind, body: serde_json::Value) -> Result<String, GenerationError> {
        let stage = kind.stage();
        let endpoint = self
            .endpoints
            .get(&kind)
            .ok_or_else(|| GenerationError::service(stage, format!("no endpoint configured for {}", kind)))?;

        debug!("POST {} ({})", endpoint, kind);
        let mut builder = self.client.post(endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GenerationError::service(stage, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("{} service error ({}): {}", kind, status, error_text);
            return Err(GenerationError::service(
                stage,
                format!("service responded with {}: {}", status, error_text),
            ));
        }

        let reply = response
            .json::<MediaResponse>()
            .await
            .map_err(|e| GenerationError::service(stage, format!("invalid service reply: {}", e)))?;

        if reply.url.trim().is_empty() {
            return Err(GenerationError::service(stage, "service returned an empty url"));
        }
        Ok(reply.url)
    }
}

#[async_trait]
impl MediaGenerator for HttpMediaClient {
    async fn generate_image(&self, description: &str) -> Result<String, GenerationError> {
        self.post(ServiceKind::Image, json!({ "prompt": description })).await
    }

    async fn generate_voice(&self, narration: &str) -> Result<String, GenerationError> {
        self.post(ServiceKind::Voice, json!({ "text": narration })).await
    }

    async fn generate_music(&self, prompt: &str) -> Result<String, GenerationError> {
        self.post(ServiceKind::Music, json!({ "prompt": prompt })).await
    }

    async fn generate_video(&self, input: &VideoInput) -> Result<String, GenerationError> {
        let body = serde_json::to_value(input)
            .map_err(|e| GenerationError::service(ServiceKind::Video.stage(), e.to_string()))?;
        self.post(ServiceKind::Video, body).await
    }
}

/// Media backend that never leaves the process
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderMedia;

impl PlaceholderMedia {
    pub fn url_for(kind: ServiceKind) -> &'static str {
        match kind {
            ServiceKind::Image => "http://example.com/generated_image.jpg",
            ServiceKind::Voice => "http://example.com/generated_voice.mp3",
            ServiceKind::Music => "http://example.com/generated_music.mp3",
            ServiceKind::Video => "http://example.com/generated_video.mp4",
        }
    }
}

#[async_trait]
impl MediaGenerator for PlaceholderMedia {
    async fn generate_image(&self, _description: &str) -> Result<String, GenerationError> {
        Ok(Self::url_for(ServiceKind::Image).to_string())
    }

    async fn generate_voice(&self, _narration: &str) -> Result<String, GenerationError> {
        Ok(Self::url_for(ServiceKind::Voice).to_string())
    }

    async fn generate_music(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(Self::url_for(ServiceKind::Music).to_string())
    }

    async fn generate_video(&self, _input: &VideoInput) -> Result<String, GenerationError> {
        Ok(Self::url_for(ServiceKind::Video).to_string())
    }
}
