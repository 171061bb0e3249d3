//! Film remaster workflow: samples a still from a video, asks a multimodal
//! model to grade it, and drives a simulated remaster operation whose state
//! any presentation layer can observe.

pub mod analysis;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod preview;
pub mod sampler;
pub mod secrets;

pub use analysis::{FrameAnalysis, FrameAnalyzer, GeminiClient};
pub use broadcast::{RemasterBroadcaster, RemasterEvent};
pub use config::{load_settings, load_settings_or_default, AnalysisFallback, Settings};
pub use error::{
    AnalysisError, CinematixError, ConfigError, DownloadError, GenerationError, Result,
    SamplerError,
};
pub use logging::{init_logging, LogFormat};
pub use model::{OperationStatus, ProcessingStats, RemasterState, RestorationConfig};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use preview::PreviewFilter;
pub use sampler::{FrameSampler, SampledFrame, VideoSource};
pub use secrets::{resolve_secret, ApiKeyStore, KeySelector, SecretError};
