use std::path::PathBuf;
use thiserror::Error;

use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum CinematixError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame sampling error: {0}")]
    Sampler(#[from] SamplerError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Video generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Settings validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Video source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Failed to read source '{path}': {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg could not be started: {0}")]
    FfmpegUnavailable(#[source] std::io::Error),

    #[error("ffmpeg exited with {exit_code:?}: {stderr}")]
    FfmpegFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("API key unavailable: {0}")]
    MissingApiKey(#[from] SecretError),

    #[error("Failed to create HTTP client: {0}")]
    ClientInit(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Analysis response contained no candidate text")]
    EmptyResponse,

    #[error("Failed to parse analysis response: {0}")]
    ParseResponse(String),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API key unavailable: {0}")]
    MissingApiKey(#[from] SecretError),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse generation response: {0}")]
    ParseResponse(String),

    #[error("Generation operation '{name}' failed: {message}")]
    OperationFailed { name: String, message: String },

    #[error("Generation operation '{0}' did not finish in time")]
    Timeout(String),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to read original '{path}': {source}")]
    ReadOriginal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CinematixError>;
