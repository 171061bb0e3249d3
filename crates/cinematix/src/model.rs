//! Session data shared between the orchestrator and presentation layers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::FrameAnalysis;

/// Resolution label shown for every analyzed frame.
pub const ESTIMATED_RESOLUTION_LABEL: &str = "4K Neural Analysis";
/// Dynamic-range label when the frame's color health is poor.
pub const RESTORING_COLOR_LABEL: &str = "restoring color";
/// Dynamic-range label when the frame's color health is acceptable.
pub const HDR_OPTIMIZED_LABEL: &str = "HDR optimized";

/// Color health below this maps to [`RESTORING_COLOR_LABEL`].
pub const COLOR_HEALTH_THRESHOLD: f64 = 40.0;

const FALLBACK_NOISE_LEVEL: u8 = 80;
const FALLBACK_FRAME_HEALTH: u8 = 40;

/// User-tunable restoration parameters.
///
/// Nothing in the remaster flow interprets these beyond the preview filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationConfig {
    #[serde(default = "default_denoise")]
    pub denoise: u8,
    #[serde(default = "default_true")]
    pub upscale: bool,
    #[serde(default = "default_true")]
    pub color_grade: bool,
    #[serde(default)]
    pub fps_boost: bool,
    #[serde(default = "default_sharpness")]
    pub sharpness: u8,
}

fn default_denoise() -> u8 {
    85
}

fn default_sharpness() -> u8 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for RestorationConfig {
    fn default() -> Self {
        Self {
            denoise: default_denoise(),
            upscale: true,
            color_grade: true,
            fps_boost: false,
            sharpness: default_sharpness(),
        }
    }
}

impl RestorationConfig {
    pub fn set_denoise(&mut self, value: i64) {
        self.denoise = clamp_percent(value);
    }

    pub fn set_sharpness(&mut self, value: i64) {
        self.sharpness = clamp_percent(value);
    }

    /// Returns a copy with both sliders pulled into 0-100.
    pub fn clamped(&self) -> Self {
        Self {
            denoise: self.denoise.min(100),
            sharpness: self.sharpness.min(100),
            ..self.clone()
        }
    }
}

fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Snapshot of one frame analysis, shaped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub noise_level: u8,
    pub estimated_resolution: String,
    pub dynamic_range: String,
    pub frame_health: u8,
}

impl ProcessingStats {
    /// Applies the display-label policy to raw scores.
    ///
    /// Missing or non-positive noise/sharpness scores fall back to 80/40.
    /// A missing color health counts as healthy.
    pub fn from_analysis(analysis: &FrameAnalysis) -> Self {
        let faded = analysis
            .color_health
            .is_some_and(|health| health < COLOR_HEALTH_THRESHOLD);
        let dynamic_range = if faded {
            RESTORING_COLOR_LABEL
        } else {
            HDR_OPTIMIZED_LABEL
        };

        Self {
            noise_level: score_or(analysis.noise_level, FALLBACK_NOISE_LEVEL),
            estimated_resolution: ESTIMATED_RESOLUTION_LABEL.to_string(),
            dynamic_range: dynamic_range.to_string(),
            frame_health: score_or(analysis.sharpness, FALLBACK_FRAME_HEALTH),
        }
    }
}

fn score_or(score: Option<f64>, fallback: u8) -> u8 {
    match score {
        Some(score) if score.is_finite() && score > 0.0 => score.round().min(100.0) as u8,
        _ => fallback,
    }
}

/// Lifecycle of a remaster operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Analyzing,
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Idle => write!(f, "Idle"),
            OperationStatus::Analyzing => write!(f, "Analyzing"),
            OperationStatus::Processing => write!(f, "Processing"),
            OperationStatus::Completed => write!(f, "Completed"),
            OperationStatus::Error => write!(f, "Error"),
        }
    }
}

impl OperationStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Any state may return to Idle; otherwise states advance one step.
    pub fn can_transition_to(self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        matches!(
            (self, next),
            (_, Idle)
                | (Idle, Analyzing)
                | (Analyzing, Processing)
                | (Analyzing, Error)
                | (Processing, Completed)
        )
    }

    /// An operation is in flight; the trigger stays disabled.
    pub fn is_busy(self) -> bool {
        matches!(self, OperationStatus::Analyzing | OperationStatus::Processing)
    }
}

/// Everything a presentation layer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemasterState {
    pub status: OperationStatus,
    pub progress: u8,
    pub stats: Option<ProcessingStats>,
    pub live_remaster: bool,
    pub downloading: bool,
    pub source_name: Option<String>,
    pub restoration: RestorationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<Uuid>,
}
