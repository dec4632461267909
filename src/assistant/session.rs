//! Assistant session
//!
//! Wires recognition, debounce, simplification, matching, speech output and
//! the conversation log into one object owned by the host UI. Everything the
//! host must react to is queued as an [`AssistantEvent`].

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::commands::{CommandMatch, CommandMatcher, simplify};
use crate::config::Config;
use crate::voice::{
    CommandDebouncer, ConversationHistory, ConversationMessage, RecognitionBackend,
    RecognitionEvent, RecognitionLifecycle, RecognitionNotice, RecognitionState,
    SpeechOutput, SpeechSynthesizer,
};
use crate::{Error, Result};

/// User-visible problems the host should surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Microphone access was refused
    PermissionDenied,
    /// Recognition kept failing and was abandoned
    RecognitionExhausted {
        /// Consecutive failures
        attempts: u32,
    },
    /// No speech recognition; text input only
    Unsupported {
        /// Why
        reason: String,
    },
    /// A response could not be spoken
    SynthesisFailed {
        /// Synthesizer error
        reason: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str(
                "Microphone access was denied. Please allow microphone access to use voice commands.",
            ),
            Self::RecognitionExhausted { attempts } => write!(
                f,
                "Speech recognition stopped after {attempts} failed attempts. Please try again."
            ),
            Self::Unsupported { reason } => {
                write!(f, "Voice input is not available ({reason}). You can type instead.")
            }
            Self::SynthesisFailed { reason } => write!(f, "Could not speak the response: {reason}"),
        }
    }
}

/// Outbound signal for the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// Hand `route` to the host router
    Navigate {
        /// Target route
        route: String,
    },
    /// A line was added to the conversation
    Message(ConversationMessage),
    /// Dismiss the assistant
    Close,
    /// Live, not-yet-final recognition text
    Interim {
        /// Interim text
        text: String,
    },
    /// Listening started or stopped
    Listening {
        /// Whether the microphone is live
        active: bool,
    },
    /// Recognition language switched
    LanguageChanged {
        /// New language tag
        language: String,
    },
    /// Something the user should be told
    Notice(Notice),
}

/// One assistant dialog, from open to close
pub struct AssistantSession {
    id: Uuid,
    matcher: CommandMatcher,
    recognition: Option<RecognitionLifecycle>,
    speech: SpeechOutput,
    debouncer: CommandDebouncer,
    history: ConversationHistory,
    current_route: String,
    language: String,
    auto_speak: bool,
    outbox: VecDeque<AssistantEvent>,
}

impl fmt::Debug for AssistantSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantSession")
            .field("id", &self.id)
            .field("current_route", &self.current_route)
            .field("recognition", &self.recognition)
            .field("debouncer", &self.debouncer)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl AssistantSession {
    /// Open a session
    ///
    /// A backend without recognition support leaves the session in text-only
    /// mode and queues a single [`Notice::Unsupported`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the recognition settings are invalid
    pub fn new(
        matcher: CommandMatcher,
        backend: Box<dyn RecognitionBackend>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        config: &Config,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let mut outbox = VecDeque::new();

        let recognition = match RecognitionLifecycle::new(backend, config.recognition.clone()) {
            Ok(lifecycle) => Some(lifecycle),
            Err(Error::UnsupportedEnvironment(reason)) => {
                outbox.push_back(AssistantEvent::Notice(Notice::Unsupported { reason }));
                None
            }
            Err(e) => return Err(e),
        };

        let mut speech = SpeechOutput::new(synthesizer);
        speech.select_voice(config.speech.voice.clone());

        tracing::info!(
            session = %id,
            route = %config.assistant.initial_route,
            voice_input = recognition.is_some(),
            "assistant session opened"
        );

        Ok(Self {
            id,
            matcher,
            recognition,
            speech,
            debouncer: CommandDebouncer::new(config.assistant.quiet_period, config.assistant.cooldown),
            history: ConversationHistory::new(),
            current_route: config.assistant.initial_route.clone(),
            language: config.recognition.language.clone(),
            auto_speak: config.speech.auto_speak,
            outbox,
        })
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Start listening
    pub fn start_listening(&mut self) {
        let Some(recognition) = self.recognition.as_mut() else {
            tracing::debug!("no recognition available, ignoring start");
            return;
        };
        let notices = recognition.start_listening();
        self.apply_notices(notices, None);
    }

    /// Stop listening and drop any transcript waiting to be dispatched
    pub fn stop_listening(&mut self) {
        self.debouncer.cancel();
        let Some(recognition) = self.recognition.as_mut() else {
            return;
        };
        let notices = recognition.stop_listening();
        self.apply_notices(notices, None);
    }

    /// Start if idle, stop if listening
    pub fn toggle_listening(&mut self) {
        let Some(recognition) = self.recognition.as_mut() else {
            return;
        };
        let was_active = !matches!(
            recognition.state(),
            RecognitionState::Idle | RecognitionState::Failed
        );
        if was_active {
            self.stop_listening();
        } else {
            self.start_listening();
        }
    }

    /// Feed an engine callback
    pub fn handle_recognition(&mut self, event: RecognitionEvent, now: Instant) {
        let Some(recognition) = self.recognition.as_mut() else {
            return;
        };
        let notices = recognition.handle_event(event, now);
        self.apply_notices(notices, Some(now));
    }

    /// Fire due timers: recognition restarts and debounced dispatch
    ///
    /// Returns the match if a command was dispatched.
    pub fn poll(&mut self, now: Instant) -> Option<CommandMatch> {
        if let Some(recognition) = self.recognition.as_mut() {
            let notices = recognition.poll(now);
            self.apply_notices(notices, Some(now));
        }

        let due = self.debouncer.next_deadline().is_some_and(|at| at <= now);
        let Some(transcript) = self.debouncer.poll(now) else {
            // A suppressed duplicate must not leak into the next command
            if due {
                if let Some(recognition) = self.recognition.as_mut() {
                    recognition.reset_transcript();
                }
            }
            return None;
        };
        if let Some(recognition) = self.recognition.as_mut() {
            recognition.reset_transcript();
        }
        let result = self.dispatch(&transcript);
        self.debouncer.finish();
        result
    }

    /// Earliest pending timer
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let restart = self.recognition.as_ref().and_then(RecognitionLifecycle::next_deadline);
        match (restart, self.debouncer.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Typed input; dispatched immediately
    pub fn submit_text(&mut self, text: &str, now: Instant) -> Option<CommandMatch> {
        let transcript = self.debouncer.dispatch_now(text, now)?;
        let result = self.dispatch(&transcript);
        self.debouncer.finish();
        result
    }

    /// Run one transcript through simplify, match and act
    fn dispatch(&mut self, transcript: &str) -> Option<CommandMatch> {
        let text = simplify(transcript);
        if text.is_empty() {
            return None;
        }

        tracing::debug!(session = %self.id, transcript = %text, "dispatching command");
        let message = self.history.push_user(text.as_str()).clone();
        self.outbox.push_back(AssistantEvent::Message(message));

        let result = self.matcher.match_command(&text, &self.current_route);
        tracing::info!(
            session = %self.id,
            kind = result.kind(),
            route = result.route(),
            "command matched"
        );

        let message = self.history.push_assistant(result.response()).clone();
        self.outbox.push_back(AssistantEvent::Message(message));

        if self.auto_speak && !matches!(result, CommandMatch::StopSpeaking { .. }) {
            let language = self.language().to_string();
            self.speak(result.response(), Some(&language));
        }

        match &result {
            CommandMatch::Navigation { route, .. } => {
                self.current_route.clone_from(route);
                self.outbox.push_back(AssistantEvent::Navigate {
                    route: route.clone(),
                });
            }
            CommandMatch::StopSpeaking { .. } => self.stop_speaking(),
            CommandMatch::CloseAssistant { .. } => {
                self.outbox.push_back(AssistantEvent::Close);
                self.teardown();
            }
            CommandMatch::SpeakOnly { .. } | CommandMatch::Fallback { .. } => {}
        }

        Some(result)
    }

    /// Tell the session the host router is now on `route`
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.current_route = route.into();
    }

    /// Route the session believes the host is on
    #[must_use]
    pub fn current_route(&self) -> &str {
        &self.current_route
    }

    /// Speak `text`; failures become a [`Notice::SynthesisFailed`]
    pub fn speak(&mut self, text: &str, language: Option<&str>) {
        if let Err(e) = self.speech.speak(text, language) {
            tracing::warn!(error = %e, "speech synthesis failed");
            self.outbox
                .push_back(AssistantEvent::Notice(Notice::SynthesisFailed {
                    reason: e.to_string(),
                }));
        }
    }

    /// Silence any speech in progress
    pub fn stop_speaking(&mut self) {
        self.speech.stop();
    }

    /// Choose the speech output voice
    pub fn select_voice(&mut self, name: Option<String>) {
        self.speech.select_voice(name);
    }

    /// Turn spoken responses on or off
    pub fn set_auto_speak(&mut self, enabled: bool) {
        self.auto_speak = enabled;
        if !enabled {
            self.speech.stop();
        }
    }

    /// Whether responses are spoken
    #[must_use]
    pub const fn auto_speak(&self) -> bool {
        self.auto_speak
    }

    /// Active recognition language
    #[must_use]
    pub fn language(&self) -> &str {
        self.recognition
            .as_ref()
            .map_or(self.language.as_str(), RecognitionLifecycle::language)
    }

    /// Recognition state; `None` in text-only mode
    #[must_use]
    pub fn recognition_state(&self) -> Option<RecognitionState> {
        self.recognition.as_ref().map(RecognitionLifecycle::state)
    }

    /// Whether the microphone is live
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.recognition
            .as_ref()
            .is_some_and(RecognitionLifecycle::is_listening)
    }

    /// Whether voice input is available
    #[must_use]
    pub const fn supports_voice(&self) -> bool {
        self.recognition.is_some()
    }

    /// Conversation so far
    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Dismiss the assistant: stop listening and speaking, cancel every
    /// timer and forget the conversation
    pub fn close(&mut self) {
        self.speech.stop();
        self.teardown();
    }

    fn teardown(&mut self) {
        self.stop_listening();
        self.debouncer.reset();
        self.history.clear();
        tracing::info!(session = %self.id, "assistant session closed");
    }

    /// Take everything queued for the host
    pub fn drain_events(&mut self) -> Vec<AssistantEvent> {
        self.outbox.drain(..).collect()
    }

    fn apply_notices(&mut self, notices: Vec<RecognitionNotice>, now: Option<Instant>) {
        for notice in notices {
            match notice {
                RecognitionNotice::Listening => {
                    self.outbox
                        .push_back(AssistantEvent::Listening { active: true });
                }
                RecognitionNotice::Stopped => {
                    self.outbox
                        .push_back(AssistantEvent::Listening { active: false });
                }
                RecognitionNotice::Transcript(text) => {
                    if let Some(now) = now {
                        self.debouncer.update(&text, now);
                    }
                }
                RecognitionNotice::Interim(text) => {
                    self.outbox.push_back(AssistantEvent::Interim { text });
                }
                RecognitionNotice::LanguageChanged(language) => {
                    self.language.clone_from(&language);
                    self.outbox
                        .push_back(AssistantEvent::LanguageChanged { language });
                }
                RecognitionNotice::PermissionDenied => {
                    self.debouncer.cancel();
                    self.outbox
                        .push_back(AssistantEvent::Listening { active: false });
                    self.outbox
                        .push_back(AssistantEvent::Notice(Notice::PermissionDenied));
                }
                RecognitionNotice::Exhausted { attempts } => {
                    self.debouncer.cancel();
                    self.outbox
                        .push_back(AssistantEvent::Listening { active: false });
                    self.outbox.push_back(AssistantEvent::Notice(
                        Notice::RecognitionExhausted { attempts },
                    ));
                }
                RecognitionNotice::Unsupported(reason) => {
                    self.debouncer.cancel();
                    self.outbox
                        .push_back(AssistantEvent::Notice(Notice::Unsupported { reason }));
                }
            }
        }
    }
}

impl Drop for AssistantSession {
    fn drop(&mut self) {
        self.speech.stop();
    }
}
