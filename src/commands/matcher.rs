//! Free-text command matching
//!
//! Precedence, first hit wins:
//!
//! 1. exact assistant-control phrase
//! 2. exact navigation phrase
//! 3. exact service-category phrase
//! 4. contained phrase (control, then navigation, then services)
//! 5. keyword rules
//! 6. search intent
//! 7. conversational replies, then a page-specific fallback
//!
//! "Where am I" questions bypass all of the above.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;
use serde::Serialize;

use super::catalog::{CatalogKind, CommandEntry};
use super::{normalize, CommandSet};

/// Questions about the current location
static WHERE_AM_I: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(where am i|where are we|what page is this|what page am i on|which page is this|which page am i on)\b",
    )
    .expect("valid regex")
});

/// Classified result of one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandMatch {
    /// Navigate to `route` and speak `response`
    Navigation {
        /// Target route
        route: String,
        /// Spoken confirmation
        response: String,
    },
    /// Speak without side effects
    SpeakOnly {
        /// Spoken text
        response: String,
    },
    /// Silence speech; `response` is shown, never spoken
    StopSpeaking {
        /// Acknowledgement
        response: String,
    },
    /// Speak, then dismiss the assistant
    CloseAssistant {
        /// Spoken farewell
        response: String,
    },
    /// Nothing matched
    Fallback {
        /// Page-specific "didn't understand" reply
        response: String,
    },
}

impl CommandMatch {
    /// Text to speak for this match
    #[must_use]
    pub fn response(&self) -> &str {
        match self {
            Self::Navigation { response, .. }
            | Self::SpeakOnly { response }
            | Self::StopSpeaking { response }
            | Self::CloseAssistant { response }
            | Self::Fallback { response } => response,
        }
    }

    /// Route to navigate to, if any
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        match self {
            Self::Navigation { route, .. } => Some(route),
            _ => None,
        }
    }

    /// Short label used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Navigation { .. } => "navigation",
            Self::SpeakOnly { .. } => "speak_only",
            Self::StopSpeaking { .. } => "stop_speaking",
            Self::CloseAssistant { .. } => "close_assistant",
            Self::Fallback { .. } => "fallback",
        }
    }
}

/// Classifies utterances against a fixed [`CommandSet`]
///
/// Matching is a pure function of the utterance, the current route and the
/// command set.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    commands: Arc<CommandSet>,
}

impl CommandMatcher {
    /// Create a matcher over a command set
    #[must_use]
    pub const fn new(commands: Arc<CommandSet>) -> Self {
        Self { commands }
    }

    /// Command set in use
    #[must_use]
    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Classify an utterance spoken on `current_route`
    ///
    /// Never fails: anything unrecognized becomes [`CommandMatch::Fallback`].
    #[must_use]
    pub fn match_command(&self, utterance: &str, current_route: &str) -> CommandMatch {
        let text = normalize(utterance);
        let result = self.classify(&text, current_route);
        tracing::debug!(
            utterance = %text,
            route = current_route,
            kind = result.kind(),
            "matched command"
        );
        result
    }

    fn classify(&self, text: &str, current_route: &str) -> CommandMatch {
        let set = &*self.commands;

        if text.is_empty() {
            return self.fallback(text, current_route);
        }

        if WHERE_AM_I.is_match(text) {
            return self.where_am_i(current_route);
        }

        // Exact matches
        if let Some(entry) = set.control().lookup(text) {
            return control_match(entry);
        }
        if let Some(entry) = set.navigation().lookup(text) {
            return self.navigate(entry, current_route);
        }
        if let Some(entry) = set.services().lookup(text) {
            return self.navigate(entry, current_route);
        }

        // Contained phrases; control first so "please close this" is not
        // read as navigation
        if let Some(entry) = set.control().find_contained(text) {
            return control_match(entry);
        }
        if let Some(entry) = set.navigation().find_contained(text) {
            return self.navigate(entry, current_route);
        }
        if let Some(entry) = set.services().find_contained(text) {
            return self.navigate(entry, current_route);
        }

        if let Some(rule) = set.keyword_rules().first_match(text) {
            tracing::trace!(pattern = rule.pattern(), "keyword rule matched");
            return match rule.table() {
                CatalogKind::Control => control_match(rule.entry()),
                CatalogKind::Navigation | CatalogKind::Services => {
                    self.navigate(rule.entry(), current_route)
                }
            };
        }

        if let Some(term) = set.search().extract_term(text) {
            return if term.is_empty() {
                CommandMatch::SpeakOnly {
                    response: set.search().empty_response.clone(),
                }
            } else {
                CommandMatch::Navigation {
                    route: set.services_route().to_string(),
                    response: set.search().render(&term),
                }
            };
        }

        let page = set.pages().get(current_route);
        if let Some(rule) = set.conversation().iter().find(|r| r.matches(text)) {
            let response = rule.render(&page.help_text);
            return if rule.closes_assistant {
                CommandMatch::CloseAssistant { response }
            } else {
                CommandMatch::SpeakOnly { response }
            };
        }

        self.fallback(text, current_route)
    }

    /// Navigate unless already there, in which case describe the page
    fn navigate(&self, entry: &CommandEntry, current_route: &str) -> CommandMatch {
        if entry.target_route == current_route {
            let page = self.commands.pages().get(current_route);
            return CommandMatch::SpeakOnly {
                response: format!(
                    "You're already on the {} page. {}",
                    page.name, page.help_text
                ),
            };
        }

        CommandMatch::Navigation {
            route: entry.target_route.clone(),
            response: entry.spoken_response.clone(),
        }
    }

    fn where_am_i(&self, current_route: &str) -> CommandMatch {
        let pages = self.commands.pages();
        let help = &pages.get(current_route).help_text;
        let response = match pages.elaboration(current_route) {
            Some(extra) => format!("{help} {extra}"),
            None => help.clone(),
        };
        CommandMatch::SpeakOnly { response }
    }

    fn fallback(&self, text: &str, current_route: &str) -> CommandMatch {
        let page = self.commands.pages().get(current_route);
        CommandMatch::Fallback {
            response: pick_response(&page.general_responses, text).to_string(),
        }
    }
}

fn control_match(entry: &CommandEntry) -> CommandMatch {
    let response = entry.spoken_response.clone();
    if entry.closes_assistant {
        CommandMatch::CloseAssistant { response }
    } else if entry.stops_speaking {
        CommandMatch::StopSpeaking { response }
    } else {
        CommandMatch::SpeakOnly { response }
    }
}

/// Pseudo-random but reproducible choice keyed by the utterance
fn pick_response<'a>(responses: &'a [String], seed_text: &str) -> &'a str {
    let mut hasher = DefaultHasher::new();
    seed_text.hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());
    responses.choose(&mut rng).map_or("", String::as_str)
}
