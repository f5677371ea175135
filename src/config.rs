use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User settings for the `tabclean` binary. Command-line flags override them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Clean rows on all cores by default
    pub parallel: bool,
    /// Maximum number of row issues printed after a run (the JSON report always has all of them)
    pub report_limit: usize,
    /// Also write logs to a daily rolling file in the data directory
    pub log_to_file: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            parallel: false,
            report_limit: 20,
            log_to_file: true,
        }
    }
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tabclean").join("config.json"))
}

/// Load settings from the standard location, falling back to defaults when
/// the file is absent or unreadable.
pub fn load_app_config() -> AppSettings {
    get_config_path()
        .and_then(|path| load_from(&path).ok())
        .unwrap_or_default()
}

/// # Errors
///
/// Fails if the file cannot be read or does not parse.
pub fn load_from(path: &Path) -> Result<AppSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))
}
