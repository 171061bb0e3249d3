use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::generation::{GenerationOperation, VideoGenerationRequest};
use super::{analysis_response_schema, parse_analysis_text, FrameAnalysis, FrameAnalyzer, ANALYSIS_PROMPT};
use crate::config::AnalysisSettings;
use crate::error::{AnalysisError, GenerationError};
use crate::sampler::SampledFrame;
use crate::secrets::ApiKeyStore;

/// Maximum length of a service error body kept in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const API_KEY_HEADER: &str = "x-goog-api-key";

fn truncate_error_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

impl GenerateContentRequest {
    fn for_frame(frame: &SampledFrame) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: frame.mime_type.to_string(),
                            data: frame.to_base64(),
                        },
                    },
                    RequestPart::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: analysis_response_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Client for the Gemini REST API.
///
/// The key is resolved on every call, so a key selected after startup is
/// picked up without rebuilding the client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    video_model: String,
    keys: Arc<ApiKeyStore>,
    key_override: Option<SecretString>,
}

impl GeminiClient {
    pub fn new(settings: &AnalysisSettings, keys: Arc<ApiKeyStore>) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| AnalysisError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            video_model: settings.video_model.clone(),
            keys,
            key_override: None,
        })
    }

    /// Uses `key` instead of the key store.
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.key_override = Some(key);
        self
    }

    fn api_key(&self) -> Result<SecretString, crate::secrets::SecretError> {
        match &self.key_override {
            Some(key) => Ok(SecretString::from(key.expose_secret().to_string())),
            None => self.keys.resolve(None),
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    #[tracing::instrument(name = "analysis.generate_content", skip_all, fields(model = %self.model))]
    async fn generate_content(&self, frame: &SampledFrame) -> Result<FrameAnalysis, AnalysisError> {
        let key = self.api_key()?;
        let request = GenerateContentRequest::for_frame(frame);

        log::debug!(
            "Requesting frame analysis from {} ({} byte frame)",
            self.model,
            frame.bytes.len()
        );

        let response = self
            .client
            .post(self.model_url(&self.model, "generateContent"))
            .header(API_KEY_HEADER, key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status,
                body: truncate_error_body(&body),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ParseResponse(e.to_string()))?;

        let text = body.first_text().ok_or(AnalysisError::EmptyResponse)?;
        parse_analysis_text(&text)
    }

    /// Starts a video generation seeded with `seed`.
    #[tracing::instrument(name = "generation.start", skip_all, fields(model = %self.video_model))]
    pub async fn start_video_generation(
        &self,
        prompt: &str,
        seed: &SampledFrame,
    ) -> Result<GenerationOperation, GenerationError> {
        let key = self.api_key()?;
        let request = VideoGenerationRequest::new(prompt, seed);

        let response = self
            .client
            .post(self.model_url(&self.video_model, "predictLongRunning"))
            .header(API_KEY_HEADER, key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let operation = Self::read_operation(response).await?;
        log::info!("Started video generation {}", operation.name);
        Ok(operation)
    }

    /// Refreshes the status of a running generation.
    pub async fn check_operation_status(
        &self,
        operation: &GenerationOperation,
    ) -> Result<GenerationOperation, GenerationError> {
        let key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, operation.name))
            .header(API_KEY_HEADER, key.expose_secret())
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        Self::read_operation(response).await
    }

    async fn read_operation(
        response: reqwest::Response,
    ) -> Result<GenerationOperation, GenerationError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status,
                body: truncate_error_body(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::ParseResponse(e.to_string()))
    }
}

#[async_trait]
impl FrameAnalyzer for GeminiClient {
    async fn analyze_frame(&self, frame: &SampledFrame) -> Result<FrameAnalysis, AnalysisError> {
        self.generate_content(frame).await
    }
}
