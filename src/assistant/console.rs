//! Terminal stand-ins for the platform speech engines
//!
//! The console engine has no microphone: the REPL feeds typed lines in as
//! final recognition results. Starting the engine confirms immediately.

use tokio::sync::mpsc;

use super::runtime::Command;
use crate::voice::{RecognitionBackend, RecognitionEngine, RecognitionEvent, SpeechSynthesizer, Voice};
use crate::{Error, Result};

/// Creates [`ConsoleEngine`]s that report back on the runtime's command channel
#[derive(Debug, Clone)]
pub struct ConsoleBackend {
    commands: mpsc::Sender<Command>,
}

impl ConsoleBackend {
    /// Backend reporting to `commands`
    #[must_use]
    pub const fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }
}

impl RecognitionBackend for ConsoleBackend {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, language: &str) -> Result<Box<dyn RecognitionEngine>> {
        tracing::debug!(language, "console recognition engine created");
        Ok(Box::new(ConsoleEngine {
            commands: self.commands.clone(),
        }))
    }
}

/// Recognition engine driven by typed input
#[derive(Debug)]
pub struct ConsoleEngine {
    commands: mpsc::Sender<Command>,
}

impl RecognitionEngine for ConsoleEngine {
    fn start(&mut self) -> Result<()> {
        self.commands
            .try_send(Command::Recognition(RecognitionEvent::Started))
            .map_err(|e| Error::Recognition(format!("console engine unavailable: {e}")))
    }

    fn stop(&mut self) {}

    fn set_language(&mut self, language: &str) {
        tracing::debug!(language, "console engine language set");
    }
}

/// Logs responses instead of speaking them; the REPL prints the
/// conversation itself
#[derive(Debug)]
pub struct ConsoleSynthesizer {
    voices: Vec<Voice>,
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self {
            voices: vec![Voice {
                name: "console".to_string(),
                language: crate::voice::DEFAULT_LANGUAGE.to_string(),
                is_default: true,
            }],
        }
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<()> {
        let name = voice.map_or("default", |v| v.name.as_str());
        tracing::debug!(voice = name, text, "speaking");
        Ok(())
    }

    fn cancel(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_start_confirms_on_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let backend = ConsoleBackend::new(tx);
        let mut engine = backend.create("en-US").unwrap();

        engine.start().unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(Command::Recognition(RecognitionEvent::Started))
        ));
    }

    #[test]
    fn engine_start_fails_when_channel_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut engine = ConsoleBackend::new(tx).create("en-US").unwrap();
        assert!(matches!(engine.start(), Err(Error::Recognition(_))));
    }
}
