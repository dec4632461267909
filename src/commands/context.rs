//! Per-route help text and fallback responses

use std::collections::HashMap;

use serde::Deserialize;

use crate::{Error, Result};

/// Contextual help for one route
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageContext {
    /// Route this context describes
    pub route: String,
    /// Human-readable page name ("caregivers", "how it works")
    pub name: String,
    /// One or two sentences describing the page
    pub help_text: String,
    /// "I didn't understand" responses tailored to the page
    pub general_responses: Vec<String>,
}

/// All known page contexts plus the default used for unknown routes
#[derive(Debug, Clone)]
pub struct PageContexts {
    pages: HashMap<String, PageContext>,
    default: PageContext,
    elaborations: HashMap<String, String>,
}

impl PageContexts {
    /// Build the context table
    ///
    /// # Errors
    ///
    /// Returns `Error::Catalog` if a route is declared twice or any context
    /// has no fallback responses
    pub fn new(
        pages: Vec<PageContext>,
        default: PageContext,
        elaborations: HashMap<String, String>,
    ) -> Result<Self> {
        if default.general_responses.is_empty() {
            return Err(Error::Catalog(
                "default page context needs at least one response".to_string(),
            ));
        }

        let mut by_route = HashMap::with_capacity(pages.len());
        for page in pages {
            if page.general_responses.is_empty() {
                return Err(Error::Catalog(format!(
                    "page '{}' needs at least one response",
                    page.route
                )));
            }
            let route = page.route.clone();
            if by_route.insert(route.clone(), page).is_some() {
                return Err(Error::Catalog(format!("duplicate page context '{route}'")));
            }
        }

        Ok(Self {
            pages: by_route,
            default,
            elaborations,
        })
    }

    /// Context for `route`, or the default context for unknown routes
    #[must_use]
    pub fn get(&self, route: &str) -> &PageContext {
        self.pages.get(route).unwrap_or(&self.default)
    }

    /// Whether `route` has its own context
    #[must_use]
    pub fn is_known(&self, route: &str) -> bool {
        self.pages.contains_key(route)
    }

    /// Fixed one-line elaboration for "where am I" answers
    #[must_use]
    pub fn elaboration(&self, route: &str) -> Option<&str> {
        self.elaborations.get(route).map(String::as_str)
    }

    /// Known routes, sorted
    #[must_use]
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.pages.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }
}
