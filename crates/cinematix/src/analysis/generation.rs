//! Long-running video generation seeded from a sampled frame.
//!
//! Never used by the remaster flow itself; the CLI exposes it directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::GenerationError;
use crate::sampler::SampledFrame;

use super::GeminiClient;

/// Prefix prepended to every user prompt.
pub const REMASTER_PROMPT_PREFIX: &str =
    "Extreme HD Remaster. Crystal clear, no noise, 4K texture, vibrant colors.";

pub const DEFAULT_RESOLUTION: &str = "720p";
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerationRequest {
    pub instances: Vec<GenerationInstance>,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInstance {
    pub prompt: String,
    pub image: SeedImage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    pub sample_count: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl VideoGenerationRequest {
    pub fn new(prompt: &str, seed: &SampledFrame) -> Self {
        let prompt = if prompt.trim().is_empty() {
            REMASTER_PROMPT_PREFIX.to_string()
        } else {
            format!("{} {}", REMASTER_PROMPT_PREFIX, prompt.trim())
        };

        Self {
            instances: vec![GenerationInstance {
                prompt,
                image: SeedImage {
                    bytes_base64_encoded: seed.to_base64(),
                    mime_type: seed.mime_type.to_string(),
                },
            }],
            parameters: GenerationParameters {
                sample_count: 1,
                resolution: DEFAULT_RESOLUTION.to_string(),
                aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            },
        }
    }
}

/// Handle of a long-running generation, as returned by start and poll calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationOperation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationStatusError>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatusError {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: String,
}

impl GenerationOperation {
    /// URIs of generated videos, once the operation is done.
    pub fn video_uris(&self) -> Vec<String> {
        let Some(response) = &self.response else {
            return Vec::new();
        };

        response
            .pointer("/generateVideoResponse/generatedSamples")
            .and_then(|v| v.as_array())
            .map(|samples| {
                samples
                    .iter()
                    .filter_map(|s| s.pointer("/video/uri").and_then(|u| u.as_str()))
                    .map(|u| u.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Polls `operation` until it finishes or `timeout` elapses.
///
/// The last wait is cut short at the deadline.
pub async fn wait_for_video(
    client: &GeminiClient,
    mut operation: GenerationOperation,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<GenerationOperation, GenerationError> {
    let deadline = Instant::now() + timeout;
    let poll_interval = poll_interval.max(Duration::from_secs(1));

    loop {
        if let Some(error) = &operation.error {
            return Err(GenerationError::OperationFailed {
                name: operation.name.clone(),
                message: error.message.clone(),
            });
        }
        if operation.done {
            log::info!("Video generation {} finished", operation.name);
            return Ok(operation);
        }

        log::debug!("Video generation {} still running", operation.name);
        tokio::time::sleep_until((Instant::now() + poll_interval).min(deadline)).await;
        if Instant::now() >= deadline {
            return Err(GenerationError::Timeout(operation.name));
        }
        operation = client.check_operation_status(&operation).await?;
    }
}
