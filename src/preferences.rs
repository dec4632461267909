//! Persisted host preferences
//!
//! Voice, recognition language and auto-speak survive between sessions as a
//! small JSON file. Nothing in the core depends on it being present.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Preferences remembered across sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Selected speech output voice
    pub voice_name: Option<String>,
    /// Recognition language tag
    pub recognition_language: Option<String>,
    /// Speak responses aloud
    pub auto_speak: Option<bool>,
}

impl Preferences {
    /// Load from the default location
    ///
    /// Returns defaults if the file is missing or unreadable.
    #[must_use]
    pub fn load() -> Self {
        default_path().map_or_else(Self::default, |path| Self::load_from(&path))
    }

    /// Load from `path`, falling back to defaults
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(crate::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(crate::Error::from));

        match parsed {
            Ok(prefs) => {
                tracing::debug!(path = %path.display(), "loaded preferences");
                prefs
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load preferences, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save to the default location
    ///
    /// # Errors
    ///
    /// Returns error if no data directory is available or the file cannot
    /// be written
    pub fn save(&self) -> Result<()> {
        let path = default_path()
            .ok_or_else(|| crate::Error::Config("no data directory available".to_string()))?;
        self.save_to(&path)
    }

    /// Save to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "saved preferences");
        Ok(())
    }
}

/// Default preferences path: `~/.local/share/carevoice/preferences.json`
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.data_dir().join("carevoice").join("preferences.json"))
}
