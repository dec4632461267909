//! Runtime configuration
//!
//! Sources, lowest priority first: built-in defaults, the TOML file,
//! persisted preferences, environment variables. CLI flags are applied by the
//! binary on top of the result.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::commands::CommandSet;
use crate::preferences::Preferences;
use crate::voice::{DEFAULT_COOLDOWN, DEFAULT_QUIET_PERIOD, RecognitionSettings};
use crate::{Error, Result};

use self::file::ConfigFile;

/// Route the assistant assumes when the host does not say otherwise
pub const DEFAULT_ROUTE: &str = "/";

/// Complete configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Session behaviour
    pub assistant: AssistantConfig,

    /// Recognition lifecycle tuning
    pub recognition: RecognitionSettings,

    /// Speech output
    pub speech: SpeechConfig,

    /// Substitute command catalog; the built-in one when `None`
    pub catalog_path: Option<PathBuf>,
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Quiet period before a transcript is dispatched
    pub quiet_period: Duration,

    /// Duplicate-suppression window
    pub cooldown: Duration,

    /// Start listening as soon as the assistant opens
    pub auto_listen: bool,

    /// Route the session starts on
    pub initial_route: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            cooldown: DEFAULT_COOLDOWN,
            auto_listen: true,
            initial_route: DEFAULT_ROUTE.to_string(),
        }
    }
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Preferred voice name
    pub voice: Option<String>,

    /// Speak responses aloud
    pub auto_speak: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: None,
            auto_speak: true,
        }
    }
}

impl Config {
    /// Load configuration from the config file, preferences and environment
    ///
    /// # Errors
    ///
    /// Returns error if the merged configuration is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        let prefs = Preferences::load();
        let config = Self::resolve(fc, &prefs, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Merge sources; `env` looks up environment variables
    #[must_use]
    pub fn resolve(fc: ConfigFile, prefs: &Preferences, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let assistant = AssistantConfig {
            quiet_period: fc
                .assistant
                .quiet_period_ms
                .map_or(defaults.assistant.quiet_period, Duration::from_millis),
            cooldown: fc
                .assistant
                .cooldown_ms
                .map_or(defaults.assistant.cooldown, Duration::from_millis),
            auto_listen: fc
                .assistant
                .auto_listen
                .unwrap_or(defaults.assistant.auto_listen),
            initial_route: fc
                .assistant
                .initial_route
                .unwrap_or(defaults.assistant.initial_route),
        };

        // Language (env > preferences > toml > default)
        let language = env("CAREVOICE_LANGUAGE")
            .or_else(|| prefs.recognition_language.clone())
            .or(fc.recognition.language)
            .unwrap_or(defaults.recognition.language);

        let recognition = RecognitionSettings {
            language,
            restart_delay: fc
                .recognition
                .restart_delay_ms
                .map_or(defaults.recognition.restart_delay, Duration::from_millis),
            max_restart_delay: defaults.recognition.max_restart_delay,
            max_attempts: fc
                .recognition
                .max_attempts
                .unwrap_or(defaults.recognition.max_attempts),
            detect_language: fc
                .recognition
                .detect_language
                .unwrap_or(defaults.recognition.detect_language),
        };

        let speech = SpeechConfig {
            voice: env("CAREVOICE_VOICE")
                .or_else(|| prefs.voice_name.clone())
                .or(fc.speech.voice),
            auto_speak: env("CAREVOICE_AUTO_SPEAK")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(prefs.auto_speak)
                .or(fc.speech.auto_speak)
                .unwrap_or(defaults.speech.auto_speak),
        };

        let catalog_path = env("CAREVOICE_CATALOG")
            .or(fc.catalog)
            .map(PathBuf::from);

        Self {
            assistant,
            recognition,
            speech,
            catalog_path,
        }
    }

    /// Check the merged configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.recognition.max_attempts == 0 {
            return Err(Error::Config(
                "recognition.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.assistant.quiet_period.is_zero() {
            return Err(Error::Config(
                "assistant.quiet_period_ms must be greater than 0".to_string(),
            ));
        }
        if self.recognition.language.trim().is_empty() {
            return Err(Error::Config(
                "recognition.language must not be empty".to_string(),
            ));
        }
        if !self.assistant.initial_route.starts_with('/') {
            return Err(Error::Config(format!(
                "assistant.initial_route must start with '/': {}",
                self.assistant.initial_route
            )));
        }
        Ok(())
    }

    /// Load the configured command catalog
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be read or fails validation
    pub fn commands(&self) -> Result<CommandSet> {
        match &self.catalog_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading command catalog");
                CommandSet::load(path)
            }
            None => CommandSet::builtin(),
        }
    }
}
