//! Voice command interpretation
//!
//! Catalog data is loaded once (the built-in table is embedded from
//! `data/catalog.toml`) and handed to the [`CommandMatcher`] explicitly.

mod catalog;
mod context;
mod matcher;
mod rules;
mod simplify;

pub use catalog::{CatalogKind, CommandCatalog, CommandEntry};
pub use context::{PageContext, PageContexts};
pub use matcher::{CommandMatch, CommandMatcher};
pub use rules::{ConversationRule, KeywordRule, KeywordRuleSpec, KeywordRules, SearchSettings};
pub use simplify::simplify;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// Built-in catalog shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.toml");

/// Catalog file schema
#[derive(Debug, Deserialize)]
struct CommandSetFile {
    services_route: String,
    #[serde(default)]
    navigation: Vec<CommandEntry>,
    #[serde(default)]
    services: Vec<CommandEntry>,
    #[serde(default)]
    control: Vec<CommandEntry>,
    #[serde(default)]
    keyword_rules: Vec<KeywordRuleSpec>,
    search: SearchSettings,
    #[serde(default)]
    conversation: Vec<ConversationRule>,
    default_page: PageContext,
    #[serde(default)]
    pages: Vec<PageContext>,
    #[serde(default)]
    elaborations: HashMap<String, String>,
}

/// Every table the matcher consults, validated and immutable
#[derive(Debug, Clone)]
pub struct CommandSet {
    navigation: CommandCatalog,
    services: CommandCatalog,
    control: CommandCatalog,
    keyword_rules: KeywordRules,
    conversation: Vec<ConversationRule>,
    search: SearchSettings,
    pages: PageContexts,
    services_route: String,
}

impl CommandSet {
    /// Load the embedded catalog
    ///
    /// # Errors
    ///
    /// Returns error if the embedded data is invalid
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    /// Load a catalog file from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or fails validation
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "loaded command catalog");
        Ok(set)
    }

    /// Parse and validate a catalog from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Error::Toml` for malformed input and `Error::Catalog` for
    /// duplicate phrases, dangling keyword targets, or invalid patterns
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CommandSetFile = toml::from_str(content)?;

        if file.services_route.is_empty() {
            return Err(Error::Catalog("services_route must not be empty".to_string()));
        }

        let services = file
            .services
            .into_iter()
            .map(|mut e| {
                if e.target_route.is_empty() {
                    e.target_route.clone_from(&file.services_route);
                }
                e
            })
            .collect();

        let navigation = CommandCatalog::new(CatalogKind::Navigation, file.navigation)?;
        let services = CommandCatalog::new(CatalogKind::Services, services)?;
        let control = CommandCatalog::new(CatalogKind::Control, file.control)?;
        let keyword_rules =
            KeywordRules::compile(&file.keyword_rules, &[&navigation, &services, &control])?;
        let pages = PageContexts::new(file.pages, file.default_page, file.elaborations)?;

        tracing::debug!(
            navigation = navigation.len(),
            services = services.len(),
            control = control.len(),
            keyword_rules = keyword_rules.rules().len(),
            "command catalog validated"
        );

        Ok(Self {
            navigation,
            services,
            control,
            keyword_rules,
            conversation: file.conversation,
            search: file.search,
            pages,
            services_route: file.services_route,
        })
    }

    /// Navigation commands
    #[must_use]
    pub const fn navigation(&self) -> &CommandCatalog {
        &self.navigation
    }

    /// Service-category commands
    #[must_use]
    pub const fn services(&self) -> &CommandCatalog {
        &self.services
    }

    /// Assistant-control commands
    #[must_use]
    pub const fn control(&self) -> &CommandCatalog {
        &self.control
    }

    /// Keyword fallback rules in precedence order
    #[must_use]
    pub const fn keyword_rules(&self) -> &KeywordRules {
        &self.keyword_rules
    }

    /// Conversational replies in precedence order
    #[must_use]
    pub fn conversation(&self) -> &[ConversationRule] {
        &self.conversation
    }

    /// Search-intent phrasing
    #[must_use]
    pub const fn search(&self) -> &SearchSettings {
        &self.search
    }

    /// Page contexts
    #[must_use]
    pub const fn pages(&self) -> &PageContexts {
        &self.pages
    }

    /// Route of the services catalog page
    #[must_use]
    pub fn services_route(&self) -> &str {
        &self.services_route
    }
}

/// Normalize an utterance or phrase for matching
///
/// Lowercases, turns punctuation (other than apostrophes) into spaces and
/// collapses whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '\u{2019}' => '\'',
            c if c.is_alphanumeric() || c == '\'' => c,
            _ => ' ',
        })
        .collect::<String>()
        .to_lowercase();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word substring check on normalized text
pub(crate) fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    !phrase.is_empty() && format!(" {haystack} ").contains(&format!(" {phrase} "))
}
