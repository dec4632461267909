//! Speech recognition lifecycle
//!
//! Wraps a continuous, event-driven recognition engine in an explicit state
//! machine. Engine callbacks arrive as [`RecognitionEvent`]s; timers are
//! exposed through [`RecognitionLifecycle::next_deadline`] and fired by
//! [`RecognitionLifecycle::poll`], so the machine can be driven entirely by
//! synthetic events in tests.
//!
//! ```text
//!  Idle ──start──▶ Starting ──started──▶ Listening
//!                     ▲                     │ error / unexpected end
//!                     └──── restart ◀── Restarting
//!  any ──failures ≥ cap──▶ Failed      any ──not-allowed / stop──▶ Idle
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::language::{detect_language, same_language};
use crate::{Error, Result};

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    /// Not listening
    Idle,
    /// Engine asked to start, waiting for confirmation
    Starting,
    /// Engine confirmed and streaming results
    Listening,
    /// Waiting out the restart delay after an error or unexpected end
    Restarting,
    /// Gave up after repeated failures; needs an explicit start
    Failed,
}

impl fmt::Display for RecognitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Listening => "listening",
            Self::Restarting => "restarting",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Engine error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Microphone permission refused
    NotAllowed,
    /// Silence timeout; benign
    NoSpeech,
    /// Recognition aborted
    Aborted,
    /// Network failure reaching the recognition service
    Network,
    /// Microphone capture failed
    AudioCapture,
    /// Anything else the engine reports
    Other(String),
}

impl RecognitionErrorKind {
    /// Parse an engine error code
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "not-allowed" | "service-not-allowed" | "permission-denied" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            "audio-capture" => Self::AudioCapture,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAllowed => f.write_str("not-allowed"),
            Self::NoSpeech => f.write_str("no-speech"),
            Self::Aborted => f.write_str("aborted"),
            Self::Network => f.write_str("network"),
            Self::AudioCapture => f.write_str("audio-capture"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// One recognized segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Recognized text
    pub raw_text: String,
    /// When the engine reported it
    pub timestamp: DateTime<Utc>,
    /// Committed (true) or still changing (false)
    pub is_final: bool,
}

impl Utterance {
    /// A committed segment stamped now
    #[must_use]
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            raw_text: text.into(),
            timestamp: Utc::now(),
            is_final: true,
        }
    }

    /// An interim segment stamped now
    #[must_use]
    pub fn interim_text(text: impl Into<String>) -> Self {
        Self {
            raw_text: text.into(),
            timestamp: Utc::now(),
            is_final: false,
        }
    }
}

/// Engine callbacks: the only inputs that move the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Engine confirmed start
    Started,
    /// Recognition results
    Result(Vec<Utterance>),
    /// Engine error
    Error(RecognitionErrorKind),
    /// Engine session ended
    Ended,
}

/// What the lifecycle reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionNotice {
    /// Engine is listening
    Listening,
    /// Accumulated final transcript changed
    Transcript(String),
    /// Interim text for live feedback only
    Interim(String),
    /// Recognition language was switched
    LanguageChanged(String),
    /// Listening stopped on request
    Stopped,
    /// Microphone permission refused
    PermissionDenied,
    /// Restart cap reached
    Exhausted {
        /// Consecutive failures when giving up
        attempts: u32,
    },
    /// Environment has no recognition support
    Unsupported(String),
}

/// A live recognition engine instance
pub trait RecognitionEngine: Send {
    /// Begin recognition; confirmation arrives later as `Started`
    ///
    /// # Errors
    ///
    /// Returns error if the engine refuses to start
    fn start(&mut self) -> Result<()>;

    /// Stop recognition; an `Ended` event may follow
    fn stop(&mut self);

    /// Change the language used for subsequent recognition
    fn set_language(&mut self, language: &str);
}

/// Creates engine instances
pub trait RecognitionBackend: Send {
    /// Whether speech recognition is available at all
    fn is_supported(&self) -> bool;

    /// Build a fresh engine configured for `language`
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be constructed
    fn create(&self, language: &str) -> Result<Box<dyn RecognitionEngine>>;
}

/// Lifecycle tuning
#[derive(Debug, Clone)]
pub struct RecognitionSettings {
    /// Initial recognition language
    pub language: String,
    /// Delay before restarting after an error or unexpected end
    pub restart_delay: Duration,
    /// Upper bound on the backed-off restart delay
    pub max_restart_delay: Duration,
    /// Consecutive failures before giving up
    pub max_attempts: u32,
    /// Switch language when a signature is detected
    pub detect_language: bool,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            language: super::language::DEFAULT_LANGUAGE.to_string(),
            restart_delay: Duration::from_millis(500),
            max_restart_delay: Duration::from_secs(8),
            max_attempts: 3,
            detect_language: true,
        }
    }
}

/// Owns the recognition engine and drives it through its states
pub struct RecognitionLifecycle {
    backend: Box<dyn RecognitionBackend>,
    engine: Option<Box<dyn RecognitionEngine>>,
    settings: RecognitionSettings,
    state: RecognitionState,
    wants_listening: bool,
    language: String,
    consecutive_failures: u32,
    transcript: String,
    interim: String,
    last_transcript: String,
    restart_at: Option<Instant>,
    /// A restart stopped the engine and its `Ended` has not arrived yet
    awaiting_end: bool,
}

impl fmt::Debug for RecognitionLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionLifecycle")
            .field("state", &self.state)
            .field("wants_listening", &self.wants_listening)
            .field("language", &self.language)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("restart_at", &self.restart_at)
            .field("awaiting_end", &self.awaiting_end)
            .finish_non_exhaustive()
    }
}

impl RecognitionLifecycle {
    /// Create a lifecycle over `backend`
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedEnvironment` if the backend has no
    /// recognition support, and `Error::Config` for a zero attempt cap
    pub fn new(backend: Box<dyn RecognitionBackend>, settings: RecognitionSettings) -> Result<Self> {
        if !backend.is_supported() {
            tracing::warn!("speech recognition not supported in this environment");
            return Err(Error::UnsupportedEnvironment(
                "no speech recognition engine available".to_string(),
            ));
        }
        if settings.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }

        Ok(Self {
            backend,
            engine: None,
            language: settings.language.clone(),
            settings,
            state: RecognitionState::Idle,
            wants_listening: false,
            consecutive_failures: 0,
            transcript: String::new(),
            interim: String::new(),
            last_transcript: String::new(),
            restart_at: None,
            awaiting_end: false,
        })
    }

    /// Start listening; no-op if already active
    pub fn start_listening(&mut self) -> Vec<RecognitionNotice> {
        if self.wants_listening && self.is_active() {
            tracing::debug!(state = %self.state, "start ignored, already listening");
            return Vec::new();
        }

        self.wants_listening = true;
        self.consecutive_failures = 0;
        self.restart_at = None;

        let mut notices = Vec::new();
        if self.engine.is_none() {
            match self.backend.create(&self.language) {
                Ok(engine) => self.engine = Some(engine),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to create recognition engine");
                    self.recreate(&mut notices);
                    return notices;
                }
            }
        }

        self.start_engine(&mut notices);
        notices
    }

    /// Stop listening and release the engine
    ///
    /// The intent flag is cleared first so the engine's trailing `Ended`
    /// event is not treated as an unexpected stop.
    pub fn stop_listening(&mut self) -> Vec<RecognitionNotice> {
        self.wants_listening = false;
        self.restart_at = None;
        self.release_engine();
        self.transcript.clear();
        self.interim.clear();

        if matches!(self.state, RecognitionState::Idle | RecognitionState::Failed) {
            return Vec::new();
        }

        self.transition(RecognitionState::Idle);
        tracing::info!("stopped listening");
        vec![RecognitionNotice::Stopped]
    }

    /// Start if idle, stop if active
    pub fn toggle_listening(&mut self) -> Vec<RecognitionNotice> {
        if self.wants_listening && self.is_active() {
            self.stop_listening()
        } else {
            self.start_listening()
        }
    }

    /// Feed one engine callback
    pub fn handle_event(&mut self, event: RecognitionEvent, now: Instant) -> Vec<RecognitionNotice> {
        let mut notices = Vec::new();

        match event {
            RecognitionEvent::Started => {
                if !self.wants_listening || self.state == RecognitionState::Failed {
                    tracing::debug!(state = %self.state, "ignoring stale start");
                    return notices;
                }
                self.consecutive_failures = 0;
                self.restart_at = None;
                self.transition(RecognitionState::Listening);
                notices.push(RecognitionNotice::Listening);
            }
            RecognitionEvent::Result(segments) => {
                if !self.wants_listening || !self.is_active() {
                    return notices;
                }
                self.handle_results(segments, &mut notices);
            }
            RecognitionEvent::Error(kind) => self.handle_error(kind, now, &mut notices),
            RecognitionEvent::Ended => {
                if self.awaiting_end {
                    self.awaiting_end = false;
                    tracing::debug!(state = %self.state, "ignoring end of restarted session");
                } else if self.wants_listening
                    && matches!(
                        self.state,
                        RecognitionState::Listening | RecognitionState::Starting
                    )
                {
                    tracing::debug!("recognition ended unexpectedly, scheduling restart");
                    self.schedule_restart(now, self.settings.restart_delay);
                }
            }
        }

        notices
    }

    /// Fire a due restart timer
    pub fn poll(&mut self, now: Instant) -> Vec<RecognitionNotice> {
        let mut notices = Vec::new();

        if self.restart_at.is_some_and(|at| at <= now) {
            self.restart_at = None;
            self.restart(&mut notices);
        }

        notices
    }

    /// When the restart timer is due, if armed
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        self.restart_at
    }

    /// Drop the accumulated transcript after it has been dispatched
    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
        self.interim.clear();
    }

    /// Set the recognition language for this and future engines
    pub fn set_language(&mut self, language: &str) {
        if language == self.language {
            return;
        }
        self.language = language.to_string();
        if let Some(engine) = self.engine.as_mut() {
            engine.set_language(language);
        }
        tracing::info!(language, "recognition language set");
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RecognitionState {
        self.state
    }

    /// Whether the engine is confirmed listening
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == RecognitionState::Listening
    }

    /// Current recognition language
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Consecutive failures since the last confirmed start
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Accumulated final transcript
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Latest interim text
    #[must_use]
    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Most recent final segment
    #[must_use]
    pub fn last_transcript(&self) -> &str {
        &self.last_transcript
    }

    /// Whether an engine instance is currently held
    #[must_use]
    pub const fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    const fn is_active(&self) -> bool {
        matches!(
            self.state,
            RecognitionState::Starting | RecognitionState::Listening | RecognitionState::Restarting
        )
    }

    fn handle_results(&mut self, segments: Vec<Utterance>, notices: &mut Vec<RecognitionNotice>) {
        let mut committed = false;
        let mut interim = String::new();

        for segment in segments {
            let text = segment.raw_text.trim();
            if text.is_empty() {
                continue;
            }

            if segment.is_final {
                if !self.transcript.is_empty() {
                    self.transcript.push(' ');
                }
                self.transcript.push_str(text);
                self.last_transcript = text.to_string();
                committed = true;

                if self.settings.detect_language {
                    self.maybe_switch_language(text, notices);
                }
            } else {
                if !interim.is_empty() {
                    interim.push(' ');
                }
                interim.push_str(text);
            }
        }

        if committed {
            tracing::debug!(transcript = %self.transcript, "final transcript updated");
            notices.push(RecognitionNotice::Transcript(self.transcript.clone()));
        }

        if interim != self.interim {
            self.interim = interim;
            notices.push(RecognitionNotice::Interim(self.interim.clone()));
        }
    }

    fn maybe_switch_language(&mut self, text: &str, notices: &mut Vec<RecognitionNotice>) {
        let Some(detected) = detect_language(text) else {
            return;
        };
        if same_language(detected, &self.language) {
            return;
        }

        tracing::info!(from = %self.language, to = detected, "switching recognition language");
        self.language = detected.to_string();
        if let Some(engine) = self.engine.as_mut() {
            engine.set_language(detected);
        }
        notices.push(RecognitionNotice::LanguageChanged(detected.to_string()));
    }

    fn handle_error(
        &mut self,
        kind: RecognitionErrorKind,
        now: Instant,
        notices: &mut Vec<RecognitionNotice>,
    ) {
        match kind {
            RecognitionErrorKind::NoSpeech => {
                tracing::debug!("no speech detected, still listening");
            }
            RecognitionErrorKind::NotAllowed => {
                tracing::error!("microphone permission denied");
                self.wants_listening = false;
                self.restart_at = None;
                self.release_engine();
                self.transition(RecognitionState::Idle);
                notices.push(RecognitionNotice::PermissionDenied);
            }
            kind => {
                if !self.wants_listening || !self.is_active() {
                    tracing::debug!(error = %kind, state = %self.state, "ignoring error");
                    return;
                }

                self.consecutive_failures += 1;
                tracing::warn!(
                    error = %kind,
                    failures = self.consecutive_failures,
                    "recognition error"
                );

                if self.consecutive_failures >= self.settings.max_attempts {
                    self.fail(notices);
                } else {
                    let delay = self.backoff();
                    self.schedule_restart(now, delay);
                }
            }
        }
    }

    /// Restart delay doubled per consecutive failure, capped
    fn backoff(&self) -> Duration {
        let exponent = self.consecutive_failures.saturating_sub(1).min(16);
        self.settings
            .restart_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.settings.max_restart_delay)
    }

    fn schedule_restart(&mut self, now: Instant, delay: Duration) {
        self.restart_at = Some(now + delay);
        self.transition(RecognitionState::Restarting);
    }

    /// Stop and start the same engine, rebuilding it if that fails
    fn restart(&mut self, notices: &mut Vec<RecognitionNotice>) {
        if !self.wants_listening {
            return;
        }

        match self.engine.as_mut() {
            Some(engine) => {
                engine.stop();
                self.awaiting_end = true;
                match engine.start() {
                    Ok(()) => {
                        tracing::debug!("recognition restarted");
                        self.transition(RecognitionState::Starting);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "restart failed, recreating engine");
                        self.recreate(notices);
                    }
                }
            }
            None => self.recreate(notices),
        }
    }

    fn start_engine(&mut self, notices: &mut Vec<RecognitionNotice>) {
        let Some(engine) = self.engine.as_mut() else {
            self.recreate(notices);
            return;
        };

        match engine.start() {
            Ok(()) => {
                tracing::info!(language = %self.language, "starting recognition");
                self.transition(RecognitionState::Starting);
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine refused to start, recreating");
                self.recreate(notices);
            }
        }
    }

    /// Discard the engine and build a new one, counting each attempt
    fn recreate(&mut self, notices: &mut Vec<RecognitionNotice>) {
        loop {
            self.release_engine();
            self.consecutive_failures += 1;

            if self.consecutive_failures >= self.settings.max_attempts {
                self.fail(notices);
                return;
            }

            let created = self.backend.create(&self.language).and_then(|mut engine| {
                engine.start()?;
                Ok(engine)
            });

            match created {
                Ok(engine) => {
                    tracing::info!(
                        failures = self.consecutive_failures,
                        "recognition engine recreated"
                    );
                    self.engine = Some(engine);
                    self.transition(RecognitionState::Starting);
                    return;
                }
                Err(Error::UnsupportedEnvironment(reason)) => {
                    self.wants_listening = false;
                    self.transition(RecognitionState::Failed);
                    notices.push(RecognitionNotice::Unsupported(reason));
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to recreate recognition engine");
                }
            }
        }
    }

    fn fail(&mut self, notices: &mut Vec<RecognitionNotice>) {
        tracing::error!(
            attempts = self.consecutive_failures,
            "speech recognition failed repeatedly, giving up"
        );
        self.wants_listening = false;
        self.restart_at = None;
        self.release_engine();
        self.transition(RecognitionState::Failed);
        notices.push(RecognitionNotice::Exhausted {
            attempts: self.consecutive_failures,
        });
    }

    fn release_engine(&mut self) {
        self.awaiting_end = false;
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
            tracing::debug!("recognition engine released");
        }
    }

    fn transition(&mut self, to: RecognitionState) {
        if self.state != to {
            tracing::debug!(from = %self.state, to = %to, "recognition state");
            self.state = to;
        }
    }
}

impl Drop for RecognitionLifecycle {
    fn drop(&mut self) {
        self.release_engine();
    }
}
