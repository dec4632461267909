//! TOML configuration file loading
//!
//! Supports `~/.config/carevoice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Path to a substitute command catalog
    #[serde(default)]
    pub catalog: Option<String>,

    /// Session behaviour
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Recognition lifecycle tuning
    #[serde(default)]
    pub recognition: RecognitionFileConfig,

    /// Speech output
    #[serde(default)]
    pub speech: SpeechFileConfig,
}

/// Session configuration
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Quiet period before a transcript is dispatched, in milliseconds
    pub quiet_period_ms: Option<u64>,

    /// Duplicate-suppression window, in milliseconds
    pub cooldown_ms: Option<u64>,

    /// Start listening as soon as the assistant opens
    pub auto_listen: Option<bool>,

    /// Route the session starts on
    pub initial_route: Option<String>,
}

/// Recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct RecognitionFileConfig {
    /// BCP 47 language tag (e.g. "en-US")
    pub language: Option<String>,

    /// Delay before restarting after an error, in milliseconds
    pub restart_delay_ms: Option<u64>,

    /// Consecutive failures before giving up
    pub max_attempts: Option<u32>,

    /// Switch language when another one is detected
    pub detect_language: Option<bool>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Preferred voice name
    pub voice: Option<String>,

    /// Speak responses aloud
    pub auto_speak: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
#[must_use]
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/carevoice/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("carevoice").join("config.toml"))
}
