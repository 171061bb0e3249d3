//! API key resolution and selection.
//!
//! The analysis service key can come from several places, checked in order:
//!
//! 1. **Direct value** - passed explicitly (e.g., from a command-line flag)
//! 2. **Key file** - written by [`ApiKeyStore::open_select_key`] or mounted as a secret
//! 3. **Env var** - `GEMINI_API_KEY`, then `API_KEY`

use secrecy::SecretString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ApiKeySettings;

/// Environment variables consulted for the API key, in priority order.
pub const DEFAULT_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No API key source provided (need one of: direct value, key file, or env var)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write secret to file '{path}': {source}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from multiple sources in priority order:
/// 1. Direct value (if provided and non-empty)
/// 2. File contents (if path provided and the file exists)
/// 3. The first set environment variable out of `env_vars`
///
/// A configured key file that does not exist is skipped so that a fresh
/// install can still fall back to the environment.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_vars: &[&str],
) -> Result<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            match fs::read_to_string(&expanded) {
                Ok(content) if !content.trim().is_empty() => {
                    return Ok(SecretString::from(content.trim().to_string()))
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SecretError::FileReadError {
                        path: expanded,
                        source: e,
                    })
                }
            }
        }
    }

    let mut last_missing = None;
    for var_name in env_vars.iter().filter(|v| !v.is_empty()) {
        match std::env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => {
                // Env vars may carry trailing newlines
                return Ok(SecretString::from(value.trim()));
            }
            Ok(_) | Err(std::env::VarError::NotPresent) => {
                last_missing = Some(var_name.to_string());
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(SecretError::EnvVarNotUnicode {
                    name: var_name.to_string(),
                })
            }
        }
    }

    match last_missing {
        Some(name) => Err(SecretError::EnvVarNotSet { name }),
        None => Err(SecretError::NoSourceProvided),
    }
}

/// Expands `~` to the user's home directory.
///
/// Only `~` and `~/path` are supported, not `~user/path`.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

/// Key-management capability consulted by presentation layers.
///
/// Gates the "manage key" affordance only; the remaster flow never asks it
/// anything.
pub trait KeySelector: Send + Sync {
    /// Whether a key is currently available from any source.
    fn has_selected_api_key(&self) -> bool;

    /// Lets the user pick a key. Returns `false` when no interactive
    /// selection is possible.
    fn open_select_key(&self) -> Result<bool>;
}

type KeyPrompt = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// File + environment backed key store.
pub struct ApiKeyStore {
    key_file: Option<PathBuf>,
    env_vars: Vec<String>,
    prompt: Option<KeyPrompt>,
}

impl ApiKeyStore {
    pub fn new(key_file: Option<PathBuf>, env_vars: Vec<String>) -> Self {
        Self {
            key_file,
            env_vars,
            prompt: None,
        }
    }

    pub fn from_settings(settings: &ApiKeySettings) -> Self {
        Self::new(settings.key_file.clone(), settings.env_vars.clone())
    }

    /// Installs the interactive prompt used by [`KeySelector::open_select_key`].
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn key_file(&self) -> Option<&Path> {
        self.key_file.as_deref()
    }

    /// Resolves the key, with an optional direct override taking priority.
    pub fn resolve(&self, direct: Option<&str>) -> Result<SecretString> {
        let file = self.key_file.as_ref().map(|p| p.to_string_lossy().into_owned());
        let vars: Vec<&str> = self.env_vars.iter().map(String::as_str).collect();
        resolve_secret(direct, file.as_deref(), &vars)
    }

    /// Stores a key in the key file with owner-only permissions.
    pub fn store(&self, key: &str) -> Result<PathBuf> {
        let path = self
            .key_file
            .clone()
            .ok_or(SecretError::NoSourceProvided)?;
        let path = PathBuf::from(expand_home(&path.to_string_lossy()));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SecretError::FileWriteError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        fs::write(&path, key.trim()).map_err(|e| SecretError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                SecretError::FileWriteError {
                    path: path.display().to_string(),
                    source: e,
                }
            })?;
        }

        log::info!("Stored API key at {}", path.display());
        Ok(path)
    }
}

impl KeySelector for ApiKeyStore {
    fn has_selected_api_key(&self) -> bool {
        self.resolve(None).is_ok()
    }

    fn open_select_key(&self) -> Result<bool> {
        let Some(prompt) = &self.prompt else {
            return Ok(false);
        };

        match prompt() {
            Some(key) if !key.trim().is_empty() => {
                self.store(&key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    // Tests that modify environment variables must run serially to avoid race conditions
    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("TEST_SECRET_1", "env_value");
        let result = resolve_secret(Some("direct_value"), None, &["TEST_SECRET_1"]).unwrap();
        assert_eq!(result.expose_secret(), "direct_value");
        std::env::remove_var("TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "file_value").unwrap();

        std::env::set_var("TEST_SECRET_2", "env_value");
        let result = resolve_secret(
            None,
            Some(temp_file.path().to_str().unwrap()),
            &["TEST_SECRET_2"],
        )
        .unwrap();
        assert_eq!(result.expose_secret(), "file_value");
        std::env::remove_var("TEST_SECRET_2");
    }

    #[test]
    #[serial]
    fn test_env_vars_checked_in_order() {
        std::env::remove_var("TEST_SECRET_PRIMARY");
        std::env::set_var("TEST_SECRET_SECONDARY", "second");
        let result =
            resolve_secret(None, None, &["TEST_SECRET_PRIMARY", "TEST_SECRET_SECONDARY"]).unwrap();
        assert_eq!(result.expose_secret(), "second");

        std::env::set_var("TEST_SECRET_PRIMARY", "first");
        let result =
            resolve_secret(None, None, &["TEST_SECRET_PRIMARY", "TEST_SECRET_SECONDARY"]).unwrap();
        assert_eq!(result.expose_secret(), "first");

        std::env::remove_var("TEST_SECRET_PRIMARY");
        std::env::remove_var("TEST_SECRET_SECONDARY");
    }

    #[test]
    fn test_no_source_error() {
        let result = resolve_secret(None, None, &[]);
        assert!(matches!(result, Err(SecretError::NoSourceProvided)));
    }

    #[test]
    fn test_missing_key_file_falls_through() {
        let result = resolve_secret(
            None,
            Some("/nonexistent/path/to/secret"),
            &["DEFINITELY_NOT_SET_VAR_12345"],
        );
        assert!(matches!(result, Err(SecretError::EnvVarNotSet { .. })));
    }

    #[test]
    fn test_file_content_trimmed() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "  secret_with_whitespace  ").unwrap();

        let result = resolve_secret(None, Some(temp_file.path().to_str().unwrap()), &[]).unwrap();
        assert_eq!(result.expose_secret(), "secret_with_whitespace");
    }

    #[test]
    #[serial]
    fn test_expand_home() {
        assert_eq!(expand_home("/absolute/path"), "/absolute/path");
        assert_eq!(expand_home("relative/path"), "relative/path");

        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_home("~/test"), format!("{}/test", home));
            assert_eq!(expand_home("~"), home);
        }
    }

    #[test]
    fn test_store_without_prompt_cannot_select() {
        let store = ApiKeyStore::new(None, vec!["DEFINITELY_NOT_SET_VAR_12345".to_string()]);
        assert!(!store.open_select_key().unwrap());
        assert!(!store.has_selected_api_key());
    }

    #[test]
    fn test_open_select_key_stores_prompted_key() {
        let dir = TempDir::new().unwrap();
        let key_file = dir.path().join("nested").join("api_key");
        let store = ApiKeyStore::new(
            Some(key_file.clone()),
            vec!["DEFINITELY_NOT_SET_VAR_12345".to_string()],
        )
        .with_prompt(|| Some("  picked-key\n".to_string()));

        assert!(!store.has_selected_api_key());
        assert!(store.open_select_key().unwrap());
        assert!(store.has_selected_api_key());
        assert_eq!(std::fs::read_to_string(&key_file).unwrap(), "picked-key");
        assert_eq!(store.resolve(None).unwrap().expose_secret(), "picked-key");
    }

    #[test]
    fn test_open_select_key_rejects_blank_input() {
        let dir = TempDir::new().unwrap();
        let store = ApiKeyStore::new(Some(dir.path().join("api_key")), vec![])
            .with_prompt(|| Some("   ".to_string()));
        assert!(!store.open_select_key().unwrap());
        assert!(!dir.path().join("api_key").exists());
    }
}
