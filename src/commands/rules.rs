//! Ordered keyword and conversational rules
//!
//! Both layers are data: the first matching rule wins, so the order in the
//! catalog file is the precedence.

use regex::Regex;
use serde::Deserialize;

use super::catalog::{CatalogKind, CommandCatalog, CommandEntry};
use super::contains_phrase;
use crate::{Error, Result};

/// Keyword rule as written in the catalog file
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRuleSpec {
    /// Regex matched against the normalized utterance
    pub pattern: String,
    /// Table holding the target phrase
    pub table: CatalogKind,
    /// Exact phrase of the target entry
    pub phrase: String,
}

/// Compiled keyword rule resolved to its catalog entry
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pattern: Regex,
    table: CatalogKind,
    entry: CommandEntry,
}

impl KeywordRule {
    /// Regex source
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Table the target entry came from
    #[must_use]
    pub const fn table(&self) -> CatalogKind {
        self.table
    }

    /// Entry this rule resolves to
    #[must_use]
    pub const fn entry(&self) -> &CommandEntry {
        &self.entry
    }
}

/// Ordered list of keyword rules
#[derive(Debug, Clone, Default)]
pub struct KeywordRules {
    rules: Vec<KeywordRule>,
}

impl KeywordRules {
    /// Compile rules and resolve their targets against the catalogs
    ///
    /// Every target phrase must exist verbatim in its table; a dangling
    /// target is a data error rather than a silent miss at match time.
    ///
    /// # Errors
    ///
    /// Returns `Error::Catalog` for an invalid regex or a missing target
    pub fn compile(specs: &[KeywordRuleSpec], catalogs: &[&CommandCatalog]) -> Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());

        for spec in specs {
            let pattern = Regex::new(&format!("(?i){}", spec.pattern)).map_err(|e| {
                Error::Catalog(format!("invalid keyword pattern '{}': {e}", spec.pattern))
            })?;

            let entry = catalogs
                .iter()
                .find(|c| c.kind() == spec.table)
                .and_then(|c| c.lookup(&spec.phrase))
                .ok_or_else(|| {
                    Error::Catalog(format!(
                        "keyword rule '{}' targets '{}', which is not in the {} catalog",
                        spec.pattern, spec.phrase, spec.table
                    ))
                })?;

            rules.push(KeywordRule {
                pattern,
                table: spec.table,
                entry: entry.clone(),
            });
        }

        Ok(Self { rules })
    }

    /// First rule whose pattern matches
    #[must_use]
    pub fn first_match(&self, normalized: &str) -> Option<&KeywordRule> {
        self.rules.iter().find(|r| r.pattern.is_match(normalized))
    }

    /// All rules in precedence order
    #[must_use]
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

/// Canned reply for small talk
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRule {
    /// Phrases that trigger the reply (whole-word match)
    pub keywords: Vec<String>,
    /// Reply text; `{help}` expands to the page help text
    pub response: String,
    /// Whether the reply also dismisses the assistant
    #[serde(default)]
    pub closes_assistant: bool,
}

impl ConversationRule {
    /// Whether any keyword occurs in the normalized utterance
    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| contains_phrase(normalized, &super::normalize(k)))
    }

    /// Reply with `{help}` expanded
    #[must_use]
    pub fn render(&self, help_text: &str) -> String {
        self.response.replace("{help}", help_text)
    }
}

/// Search-intent phrasing
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Phrases signalling a search ("search for", "find")
    pub triggers: Vec<String>,
    /// Leading filler stripped from the residual term
    pub fillers: Vec<String>,
    /// Reply when a term was found; `{term}` expands to it
    pub response: String,
    /// Reply when nothing is left after stripping
    pub empty_response: String,
}

impl SearchSettings {
    /// Extract the search term if the utterance expresses search intent
    ///
    /// Returns `None` without search intent and `Some("")` when the intent
    /// is there but no term remains.
    #[must_use]
    pub fn extract_term(&self, normalized: &str) -> Option<String> {
        let triggers: Vec<String> = self.triggers.iter().map(|t| super::normalize(t)).collect();
        if !triggers.iter().any(|t| contains_phrase(normalized, t)) {
            return None;
        }

        let mut padded = format!(" {normalized} ");
        for trigger in &triggers {
            let needle = format!(" {trigger} ");
            while padded.contains(&needle) {
                padded = padded.replacen(&needle, " ", 1);
            }
        }

        let fillers: Vec<String> = self
            .fillers
            .iter()
            .map(|f| super::normalize(f))
            .filter(|f| !f.is_empty())
            .collect();
        let mut term = padded.trim().to_string();
        while !term.is_empty() {
            let stripped = fillers.iter().find_map(|f| {
                if term == *f {
                    Some(String::new())
                } else {
                    term.strip_prefix(&format!("{f} ")).map(str::to_string)
                }
            });
            match stripped {
                Some(rest) => term = rest,
                None => break,
            }
        }

        Some(term)
    }

    /// Reply for a found term
    #[must_use]
    pub fn render(&self, term: &str) -> String {
        self.response.replace("{term}", term)
    }
}
