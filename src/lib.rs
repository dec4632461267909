//! Carevoice - voice command interpreter for a caregiver-booking app
//!
//! Turns spoken or typed utterances into navigation, spoken replies and
//! assistant control for a host UI:
//! - Command catalogs and the free-text matcher
//! - Transcript simplification for repeated phrases
//! - Speech recognition lifecycle with restart and language detection
//! - Speech output, debounce and conversation history
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                 Host UI / router                   │
//! └───────────────▲──────────────────────┬─────────────┘
//!                 │ AssistantEvent       │ Command
//! ┌───────────────┴──────────────────────▼─────────────┐
//! │                 AssistantSession                   │
//! │ Recognition │ Debounce │ Simplify │ Match │ Speech │
//! └───────────────▲──────────────────────┬─────────────┘
//!                 │ RecognitionEvent     │ start/stop/speak
//! ┌───────────────┴──────────────────────▼─────────────┐
//! │        Platform recognition and synthesis          │
//! └────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod commands;
pub mod config;
pub mod error;
pub mod preferences;
pub mod voice;

pub use assistant::{AssistantEvent, AssistantSession, Notice};
pub use commands::{CommandMatch, CommandMatcher, CommandSet, simplify};
pub use config::Config;
pub use error::{Error, Result};
pub use preferences::Preferences;
