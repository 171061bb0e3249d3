use std::path::Path;

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

/// Loads settings from `path`, falling back to defaults when the file is absent.
pub fn load_settings_or_default<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    load_settings(path)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    // serde_yaml rejects an empty document
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let mut settings: Settings = serde_yaml::from_str(content)?;

    validate_settings(&settings)?;

    // Sliders are range-clamped, never rejected
    settings.restoration = settings.restoration.clamped();

    Ok(settings)
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let analysis = &settings.analysis;
    if analysis.base_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "analysis.baseUrl must not be empty".to_string(),
        });
    }
    if !analysis.base_url.starts_with("http://") && !analysis.base_url.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!(
                "analysis.baseUrl must be an http(s) URL, got '{}'",
                analysis.base_url
            ),
        });
    }
    if analysis.model.trim().is_empty() || analysis.video_model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "analysis model names must not be empty".to_string(),
        });
    }
    if analysis.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "analysis.requestTimeoutSecs must be positive".to_string(),
        });
    }

    let sampler = &settings.sampler;
    if sampler.width == 0 || sampler.height == 0 {
        return Err(ConfigError::Validation {
            message: format!(
                "sampler dimensions must be positive, got {}x{}",
                sampler.width, sampler.height
            ),
        });
    }
    if !(1..=100).contains(&sampler.quality) {
        return Err(ConfigError::Validation {
            message: format!("sampler.quality must be 1-100, got {}", sampler.quality),
        });
    }
    if !sampler.offset_secs.is_finite() || sampler.offset_secs < 0.0 {
        return Err(ConfigError::Validation {
            message: format!(
                "sampler.offsetSecs must be a non-negative number, got {}",
                sampler.offset_secs
            ),
        });
    }

    let progress = &settings.progress;
    if progress.tick_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "progress.tickIntervalMs must be positive".to_string(),
        });
    }
    if !progress.max_increment.is_finite() || progress.max_increment <= 0.0 {
        return Err(ConfigError::Validation {
            message: format!(
                "progress.maxIncrement must be positive, got {}",
                progress.max_increment
            ),
        });
    }

    if settings.download.fallback_name.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "download.fallbackName must not be empty".to_string(),
        });
    }
    if settings.download.prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation {
            message: "download.prefix must not contain path separators".to_string(),
        });
    }

    Ok(())
}
