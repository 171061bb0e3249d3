pub mod loader;
pub mod schema;

pub use loader::{load_settings, load_settings_from_str, load_settings_or_default, validate_settings};
pub use schema::{
    default_settings_path, AnalysisFallback, AnalysisSettings, ApiKeySettings, DownloadSettings,
    ProgressSettings, SamplerSettings, Settings,
};
