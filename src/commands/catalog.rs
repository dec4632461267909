//! Command catalogs: phrase tables mapping to routes and spoken responses

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{contains_phrase, normalize};
use crate::{Error, Result};

/// Which table a command entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// "go to X" style page navigation
    Navigation,
    /// Service categories, always routed to the services page
    Services,
    /// Assistant control (close, quiet, capabilities)
    Control,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation => write!(f, "navigation"),
            Self::Services => write!(f, "services"),
            Self::Control => write!(f, "control"),
        }
    }
}

/// A canonical phrase and what it does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Normalized trigger phrase
    pub phrase: String,
    /// Route to navigate to (empty for control commands)
    #[serde(default)]
    pub target_route: String,
    /// Text spoken back to the user
    pub spoken_response: String,
    /// Whether this entry dismisses the assistant
    #[serde(default)]
    pub closes_assistant: bool,
    /// Whether this entry silences speech instead of speaking its response
    #[serde(default)]
    pub stops_speaking: bool,
}

/// An immutable phrase table with exact and contained-phrase lookup
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    kind: CatalogKind,
    entries: Vec<CommandEntry>,
    index: HashMap<String, usize>,
}

impl CommandCatalog {
    /// Build a catalog, normalizing every phrase
    ///
    /// # Errors
    ///
    /// Returns `Error::Catalog` if a phrase is empty after normalization or
    /// appears twice in the same table
    pub fn new(kind: CatalogKind, entries: Vec<CommandEntry>) -> Result<Self> {
        let mut normalized = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for mut entry in entries {
            let phrase = normalize(&entry.phrase);
            if phrase.is_empty() {
                return Err(Error::Catalog(format!("empty phrase in {kind} catalog")));
            }
            if kind != CatalogKind::Control && entry.target_route.is_empty() {
                return Err(Error::Catalog(format!(
                    "{kind} entry '{phrase}' has no target route"
                )));
            }
            if index.insert(phrase.clone(), normalized.len()).is_some() {
                return Err(Error::Catalog(format!(
                    "duplicate phrase '{phrase}' in {kind} catalog"
                )));
            }
            entry.phrase = phrase;
            normalized.push(entry);
        }

        Ok(Self {
            kind,
            entries: normalized,
            index,
        })
    }

    /// Exact lookup after case and whitespace normalization
    #[must_use]
    pub fn lookup(&self, phrase: &str) -> Option<&CommandEntry> {
        self.index
            .get(&normalize(phrase))
            .map(|&i| &self.entries[i])
    }

    /// First entry (in table order) whose phrase occurs in `normalized` as
    /// a whole-word substring
    ///
    /// `normalized` must already be normalized.
    #[must_use]
    pub fn find_contained(&self, normalized: &str) -> Option<&CommandEntry> {
        self.entries
            .iter()
            .find(|e| contains_phrase(normalized, &e.phrase))
    }

    /// Table this catalog represents
    #[must_use]
    pub const fn kind(&self) -> CatalogKind {
        self.kind
    }

    /// All entries in table order
    #[must_use]
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
