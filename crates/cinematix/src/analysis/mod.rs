//! Remote frame analysis and video generation.
//!
//! The analyzer reports failures as errors; deciding what a failed analysis
//! means for an operation is up to the orchestrator.

pub mod gemini;
pub mod generation;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::sampler::SampledFrame;

pub use gemini::GeminiClient;
pub use generation::{GenerationOperation, VideoGenerationRequest};

/// Fixed instruction sent with every analyzed frame.
pub const ANALYSIS_PROMPT: &str = "Analyze this old film frame. Detect noise levels (0-100), \
grain intensity, and color fading. Return JSON format with fields: noiseLevel, sharpness, \
colorHealth, grainType.";

/// Raw scores returned by the analysis service.
///
/// Scores may be missing or null; display fallbacks live in
/// [`ProcessingStats::from_analysis`](crate::model::ProcessingStats::from_analysis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    #[serde(default)]
    pub noise_level: Option<f64>,
    #[serde(default)]
    pub sharpness: Option<f64>,
    #[serde(default)]
    pub color_health: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grain_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

impl FrameAnalysis {
    /// Scores assumed for a frame that could not be analyzed.
    pub fn conservative_defaults() -> Self {
        Self {
            noise_level: Some(75.0),
            sharpness: Some(45.0),
            color_health: Some(35.0),
            grain_type: None,
            advice: None,
        }
    }
}

/// Response-shape constraint sent alongside [`ANALYSIS_PROMPT`].
pub fn analysis_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "noiseLevel": { "type": "NUMBER" },
            "sharpness": { "type": "NUMBER" },
            "colorHealth": { "type": "NUMBER" },
            "grainType": { "type": "STRING" },
            "advice": { "type": "STRING" }
        },
        "required": ["noiseLevel", "sharpness", "colorHealth"]
    })
}

/// Remote analysis capability.
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    async fn analyze_frame(&self, frame: &SampledFrame) -> Result<FrameAnalysis, AnalysisError>;
}

/// Parses the model's text answer, tolerating a fenced code block.
pub fn parse_analysis_text(text: &str) -> Result<FrameAnalysis, AnalysisError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| AnalysisError::ParseResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessingStats;

    #[test]
    fn test_parse_plain_json() {
        let analysis =
            parse_analysis_text(r#"{"noiseLevel": 92, "sharpness": 30, "colorHealth": 20}"#)
                .unwrap();
        assert_eq!(analysis.noise_level, Some(92.0));
        assert_eq!(analysis.sharpness, Some(30.0));
        assert_eq!(analysis.color_health, Some(20.0));
        assert!(analysis.grain_type.is_none());
    }

    #[test]
    fn test_parse_fenced_json_with_optional_fields() {
        let text = "```json\n{\"noiseLevel\": 12.5, \"sharpness\": 80, \"colorHealth\": 64, \
                    \"grainType\": \"fine\", \"advice\": \"light denoise\"}\n```";
        let analysis = parse_analysis_text(text).unwrap();
        assert_eq!(analysis.noise_level, Some(12.5));
        assert_eq!(analysis.grain_type.as_deref(), Some("fine"));
        assert_eq!(analysis.advice.as_deref(), Some("light denoise"));
    }

    #[test]
    fn test_parse_missing_and_null_scores() {
        let analysis = parse_analysis_text(r#"{"sharpness": 30, "colorHealth": 20}"#).unwrap();
        assert_eq!(analysis.noise_level, None);
        assert_eq!(analysis.sharpness, Some(30.0));

        let analysis =
            parse_analysis_text(r#"{"noiseLevel": null, "sharpness": 30, "colorHealth": null}"#)
                .unwrap();
        assert_eq!(analysis.noise_level, None);
        assert_eq!(analysis.color_health, None);

        let stats = ProcessingStats::from_analysis(&analysis);
        assert_eq!(stats.noise_level, 80);
        assert_eq!(stats.frame_health, 30);
        assert_eq!(stats.dynamic_range, "HDR optimized");
    }

    #[test]
    fn test_parse_empty_object_uses_display_fallbacks() {
        let analysis = parse_analysis_text("{}").unwrap();
        let stats = ProcessingStats::from_analysis(&analysis);
        assert_eq!(stats.noise_level, 80);
        assert_eq!(stats.frame_health, 40);
        assert_eq!(stats.dynamic_range, "HDR optimized");
    }

    #[test]
    fn test_parse_malformed() {
        let result = parse_analysis_text("the frame looks grainy");
        assert!(matches!(result, Err(AnalysisError::ParseResponse(_))));
    }

    #[test]
    fn test_schema_requires_scores() {
        let schema = analysis_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["noiseLevel", "sharpness", "colorHealth"]);
        assert_eq!(schema["properties"]["grainType"]["type"], "STRING");
    }
}
