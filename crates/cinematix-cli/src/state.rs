//! Everything a command needs, built once from the settings file.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cinematix::config::{default_settings_path, load_settings, load_settings_or_default, Settings};
use cinematix::sampler::{FrameSampler, StillImageGrabber};
use cinematix::{ApiKeyStore, GeminiClient, Result};

pub struct AppState {
    pub settings: Settings,
    pub settings_path: Option<PathBuf>,
    pub keys: Arc<ApiKeyStore>,
}

impl AppState {
    /// Loads settings from `config` if given (must exist), otherwise from the
    /// default location (may be missing).
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let (settings, settings_path) = match config {
            Some(path) => (load_settings(path)?, Some(path.to_path_buf())),
            None => {
                let path = default_settings_path();
                let settings = match &path {
                    Some(path) => load_settings_or_default(path)?,
                    None => Settings::default(),
                };
                (settings, path)
            }
        };

        let keys = ApiKeyStore::from_settings(&settings.api_key).with_prompt(prompt_for_key);

        Ok(Self {
            settings,
            settings_path,
            keys: Arc::new(keys),
        })
    }

    pub fn client(&self) -> Result<GeminiClient> {
        Ok(GeminiClient::new(
            &self.settings.analysis,
            Arc::clone(&self.keys),
        )?)
    }

    /// ffmpeg for video files, direct decoding when `still` is set.
    pub fn sampler(&self, still: bool) -> FrameSampler {
        if still {
            FrameSampler::new(Arc::new(StillImageGrabber::new()), &self.settings.sampler)
        } else {
            FrameSampler::ffmpeg(&self.settings.sampler)
        }
    }
}

fn prompt_for_key() -> Option<String> {
    eprint!("Gemini API key: ");
    io::stderr().flush().ok()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let key = line.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
