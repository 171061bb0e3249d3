use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::RestorationConfig;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub sampler: SamplerSettings,
    #[serde(default)]
    pub progress: ProgressSettings,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub restoration: RestorationConfig,
    #[serde(default)]
    pub api_key: ApiKeySettings,
}

/// What the orchestrator does when frame analysis fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisFallback {
    /// Continue without stats.
    #[default]
    LeaveUnset,
    /// Continue with conservative default scores.
    UseDefaults,
    /// Stop the operation in the Error state.
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_analysis_model")]
    pub model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub fallback: AnalysisFallback,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_analysis_model() -> String {
    DEFAULT_ANALYSIS_MODEL.to_string()
}

fn default_video_model() -> String {
    DEFAULT_VIDEO_MODEL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_analysis_model(),
            video_model: default_video_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback: AnalysisFallback::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerSettings {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Seek position of the sampled frame, in seconds.
    #[serde(default)]
    pub offset_secs: f64,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// JPEG quality, 1-100.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    360
}

fn default_quality() -> u8 {
    70
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            offset_secs: 0.0,
            width: default_width(),
            height: default_height(),
            quality: default_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSettings {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Upper bound (exclusive) of the random per-tick increment.
    #[serde(default = "default_max_increment")]
    pub max_increment: f64,
}

fn default_tick_interval_ms() -> u64 {
    400
}

fn default_max_increment() -> f64 {
    8.0
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_increment: default_max_increment(),
        }
    }
}

impl ProgressSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSettings {
    #[serde(default = "default_download_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
}

fn default_download_delay_ms() -> u64 {
    1500
}

fn default_prefix() -> String {
    "REMASTERED_".to_string()
}

fn default_fallback_name() -> String {
    "film.mp4".to_string()
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_download_delay_ms(),
            prefix: default_prefix(),
            fallback_name: default_fallback_name(),
        }
    }
}

impl DownloadSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySettings {
    #[serde(default = "default_key_file")]
    pub key_file: Option<PathBuf>,
    #[serde(default = "default_env_vars")]
    pub env_vars: Vec<String>,
}

fn default_key_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cinematix").join("api_key"))
}

fn default_env_vars() -> Vec<String> {
    crate::secrets::DEFAULT_KEY_ENV_VARS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ApiKeySettings {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            env_vars: default_env_vars(),
        }
    }
}

/// Default settings file location (`<config dir>/cinematix/settings.yaml`).
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cinematix").join("settings.yaml"))
}
