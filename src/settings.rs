use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotations::DEFAULT_CLEAR_DELAY;
use crate::document::DEFAULT_LINES_PER_PAGE;
use crate::illustration::DEFAULT_WORKERS;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagelight";

pub const DEFAULT_ENDPOINT: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-v1-6/text-to-image";
pub const DEFAULT_API_KEY_ENV: &str = "STABILITY_API_KEY";
pub const DEFAULT_STYLE_PREAMBLE: &str = "A highly detailed, cinematic illustration of a dramatic fiction scene, \
vivid colors, dynamic lighting, intricate background, expressive characters, \
fantasy atmosphere, ultra-realistic, 4k, trending on artstation, masterpiece,";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrationSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_style_preamble")]
    pub style_preamble: String,

    #[serde(default = "default_dimension")]
    pub width: u32,

    #[serde(default = "default_dimension")]
    pub height: u32,

    #[serde(default = "default_samples")]
    pub samples: u32,

    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f32,

    #[serde(default = "default_steps")]
    pub steps: u32,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSettings {
    /// Plain-text pagination when the file has no form feeds
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Delay before the native selection highlight is dropped
    #[serde(default = "default_clear_delay_ms")]
    pub clear_delay_ms: u64,
}

impl SelectionSettings {
    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub illustration: IllustrationSettings,

    #[serde(default)]
    pub document: DocumentSettings,

    #[serde(default)]
    pub selection: SelectionSettings,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_style_preamble() -> String {
    DEFAULT_STYLE_PREAMBLE.to_string()
}

fn default_dimension() -> u32 {
    512
}

fn default_samples() -> u32 {
    1
}

fn default_cfg_scale() -> f32 {
    7.0
}

fn default_steps() -> u32 {
    30
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_lines_per_page() -> usize {
    DEFAULT_LINES_PER_PAGE
}

fn default_clear_delay_ms() -> u64 {
    DEFAULT_CLEAR_DELAY.as_millis() as u64
}

impl Default for IllustrationSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            style_preamble: default_style_preamble(),
            width: default_dimension(),
            height: default_dimension(),
            samples: default_samples(),
            cfg_scale: default_cfg_scale(),
            steps: default_steps(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            lines_per_page: default_lines_per_page(),
        }
    }
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            clear_delay_ms: default_clear_delay_ms(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            illustration: IllustrationSettings::default(),
            document: DocumentSettings::default(),
            selection: SelectionSettings::default(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path` (or the default location).
///
/// Never fails: a missing file is created with defaults and an unreadable
/// one is logged and replaced by defaults in memory.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using default settings");
            return Settings::default();
        }
    };

    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        if let Err(e) = save_settings(&settings, &path) {
            error!("{e:#}");
        }
        return settings;
    }

    match read_settings(&path) {
        Ok(mut settings) => {
            debug!("Loaded settings from {path:?}");
            if settings.version < CURRENT_VERSION {
                migrate_settings(&mut settings);
                if let Err(e) = save_settings(&settings, &path) {
                    error!("{e:#}");
                }
            }
            settings
        }
        Err(e) => {
            error!("{e:#}");
            Settings::default()
        }
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {path:?}"))?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file {path:?}"))
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }
    }

    let yaml = serde_yaml::to_string(settings).context("Failed to serialize settings")?;
    let mut content = String::from(SETTINGS_HEADER);
    content.push_str(&yaml);

    fs::write(path, content).with_context(|| format!("Failed to save settings to {path:?}"))?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pagelight settings
# ============================================================================
# The image API key is read from the environment variable named by
# illustration.api_key_env; it is never stored in this file.
#
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let settings = load_settings(Some(&path));
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# ===="));
        assert!(written.contains("api_key_env: STABILITY_API_KEY"));
    }

    #[test]
    fn round_trip_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut settings = Settings::default();
        settings.illustration.steps = 50;
        settings.document.lines_per_page = 25;
        save_settings(&settings, &path).unwrap();

        assert_eq!(load_settings(Some(&path)), settings);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "illustration:\n  workers: 4\n").unwrap();

        let settings = load_settings(Some(&path));
        assert_eq!(settings.illustration.workers, 4);
        assert_eq!(settings.illustration.width, 512);
        assert_eq!(settings.selection.clear_delay(), Duration::from_millis(100));
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "illustration: [not, a, map").unwrap();

        assert_eq!(load_settings(Some(&path)), Settings::default());
    }

    #[test]
    fn old_version_is_migrated_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\n").unwrap();

        let settings = load_settings(Some(&path));
        assert_eq!(settings.version, CURRENT_VERSION);
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains(&format!("version: {CURRENT_VERSION}")));
    }
}
