//! Speech output
//!
//! At most one utterance is audible at a time: every `speak` cancels whatever
//! is playing first. There is no queue.

use serde::{Deserialize, Serialize};

use super::language::same_language;
use crate::Result;

/// A voice offered by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Voice name, unique per platform
    pub name: String,
    /// BCP 47 language tag
    pub language: String,
    /// Platform default voice
    #[serde(default)]
    pub is_default: bool,
}

/// Platform text-to-speech
pub trait SpeechSynthesizer: Send {
    /// Available voices
    fn voices(&self) -> Vec<Voice>;

    /// Begin speaking `text` with `voice` (platform default when `None`)
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if playback cannot start
    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<()>;

    /// Cancel any in-flight utterance
    fn cancel(&mut self);

    /// Whether something is playing
    fn is_speaking(&self) -> bool;
}

/// Owns the output channel and the user's voice choice
pub struct SpeechOutput {
    synthesizer: Box<dyn SpeechSynthesizer>,
    selected_voice: Option<String>,
}

impl std::fmt::Debug for SpeechOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechOutput")
            .field("selected_voice", &self.selected_voice)
            .finish_non_exhaustive()
    }
}

impl SpeechOutput {
    /// Wrap a synthesizer
    #[must_use]
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            selected_voice: None,
        }
    }

    /// Choose the voice used when no language is requested
    pub fn select_voice(&mut self, name: Option<String>) {
        tracing::debug!(voice = ?name, "voice selected");
        self.selected_voice = name;
    }

    /// Name of the selected voice
    #[must_use]
    pub fn selected_voice(&self) -> Option<&str> {
        self.selected_voice.as_deref()
    }

    /// Available voices
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.synthesizer.voices()
    }

    /// Speak `text`, cancelling anything already playing
    ///
    /// With `language`, a voice sharing its primary subtag is preferred;
    /// otherwise the selected voice, otherwise the platform default.
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if playback fails to start
    pub fn speak(&mut self, text: &str, language: Option<&str>) -> Result<()> {
        if self.synthesizer.is_speaking() {
            tracing::debug!("cancelling in-flight speech");
        }
        self.synthesizer.cancel();

        if text.trim().is_empty() {
            return Ok(());
        }

        let voice = self.choose_voice(language);
        tracing::debug!(
            voice = voice.as_ref().map(|v| v.name.as_str()),
            language,
            "speaking"
        );
        self.synthesizer.speak(text, voice.as_ref())
    }

    /// Cancel playback; safe to call repeatedly
    pub fn stop(&mut self) {
        self.synthesizer.cancel();
    }

    /// Whether something is playing
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.synthesizer.is_speaking()
    }

    fn choose_voice(&self, language: Option<&str>) -> Option<Voice> {
        let voices = self.synthesizer.voices();

        if let Some(language) = language {
            let selected_matches = self.selected_voice.as_deref().and_then(|name| {
                voices
                    .iter()
                    .find(|v| v.name == name && same_language(&v.language, language))
            });
            if let Some(voice) = selected_matches {
                return Some(voice.clone());
            }
            if let Some(voice) = voices.iter().find(|v| same_language(&v.language, language)) {
                return Some(voice.clone());
            }
        }

        if let Some(name) = self.selected_voice.as_deref() {
            if let Some(voice) = voices.iter().find(|v| v.name == name) {
                return Some(voice.clone());
            }
            tracing::debug!(voice = name, "selected voice unavailable, using default");
        }

        voices.into_iter().find(|v| v.is_default)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::Error;

    #[derive(Default)]
    struct Log {
        spoken: Vec<(String, Option<String>)>,
        cancels: usize,
        speaking: bool,
    }

    struct FakeSynth {
        log: Arc<Mutex<Log>>,
        fail: bool,
    }

    impl SpeechSynthesizer for FakeSynth {
        fn voices(&self) -> Vec<Voice> {
            vec![
                Voice {
                    name: "Samantha".to_string(),
                    language: "en-US".to_string(),
                    is_default: true,
                },
                Voice {
                    name: "Daniel".to_string(),
                    language: "en-GB".to_string(),
                    is_default: false,
                },
                Voice {
                    name: "Monica".to_string(),
                    language: "es-ES".to_string(),
                    is_default: false,
                },
            ]
        }

        fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<()> {
            if self.fail {
                return Err(Error::Synthesis("device busy".to_string()));
            }
            let mut log = self.log.lock().unwrap();
            log.spoken
                .push((text.to_string(), voice.map(|v| v.name.clone())));
            log.speaking = true;
            Ok(())
        }

        fn cancel(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.cancels += 1;
            log.speaking = false;
        }

        fn is_speaking(&self) -> bool {
            self.log.lock().unwrap().speaking
        }
    }

    fn output(fail: bool) -> (SpeechOutput, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let synth = FakeSynth {
            log: Arc::clone(&log),
            fail,
        };
        (SpeechOutput::new(Box::new(synth)), log)
    }

    #[test]
    fn speak_cancels_previous() {
        let (mut out, log) = output(false);
        out.speak("first", None).unwrap();
        out.speak("second", None).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.cancels, 2);
        assert_eq!(log.spoken.len(), 2);
    }

    #[test]
    fn language_match_wins() {
        let (mut out, log) = output(false);
        out.select_voice(Some("Daniel".to_string()));
        out.speak("hola", Some("es-MX")).unwrap();

        let spoken = &log.lock().unwrap().spoken;
        assert_eq!(spoken[0].1.as_deref(), Some("Monica"));
    }

    #[test]
    fn selected_voice_preferred_within_language() {
        let (mut out, log) = output(false);
        out.select_voice(Some("Daniel".to_string()));
        out.speak("hello", Some("en-US")).unwrap();

        let spoken = &log.lock().unwrap().spoken;
        assert_eq!(spoken[0].1.as_deref(), Some("Daniel"));
    }

    #[test]
    fn falls_back_to_selected_then_default() {
        let (mut out, log) = output(false);
        out.speak("hello", Some("ja-JP")).unwrap();
        out.select_voice(Some("Daniel".to_string()));
        out.speak("hello", Some("ja-JP")).unwrap();
        out.select_voice(Some("Missing".to_string()));
        out.speak("hello", None).unwrap();

        let spoken = &log.lock().unwrap().spoken;
        assert_eq!(spoken[0].1.as_deref(), Some("Samantha"));
        assert_eq!(spoken[1].1.as_deref(), Some("Daniel"));
        assert_eq!(spoken[2].1.as_deref(), Some("Samantha"));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut out, log) = output(false);
        out.speak("hello", None).unwrap();
        out.stop();
        out.stop();
        assert!(!out.is_speaking());
        assert_eq!(log.lock().unwrap().cancels, 3);
    }

    #[test]
    fn synthesis_error_propagates() {
        let (mut out, _log) = output(true);
        assert!(matches!(out.speak("hello", None), Err(Error::Synthesis(_))));
    }
}
