//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use carevoice::voice::{
    RecognitionBackend, RecognitionEngine, RecognitionLifecycle, RecognitionSettings,
    SpeechSynthesizer, Voice,
};
use carevoice::{AssistantSession, CommandMatcher, CommandSet, Config, Error, Result};

/// What the fake recognition engines were asked to do
#[derive(Debug, Default)]
pub struct EngineLog {
    pub created: usize,
    pub starts: usize,
    pub stops: usize,
    pub languages: Vec<String>,
    /// Fail this many upcoming `start` calls
    pub failing_starts: usize,
}

/// Recognition backend handing out recording engines
#[derive(Clone)]
pub struct FakeBackend {
    pub log: Arc<Mutex<EngineLog>>,
    pub supported: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EngineLog::default())),
            supported: true,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }
}

impl RecognitionBackend for FakeBackend {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, language: &str) -> Result<Box<dyn RecognitionEngine>> {
        let mut log = self.log.lock().unwrap();
        log.created += 1;
        log.languages.push(language.to_string());
        Ok(Box::new(FakeEngine {
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl RecognitionEngine for FakeEngine {
    fn start(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.failing_starts > 0 {
            log.failing_starts -= 1;
            return Err(Error::Recognition("engine busy".to_string()));
        }
        log.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
    }

    fn set_language(&mut self, language: &str) {
        self.log.lock().unwrap().languages.push(language.to_string());
    }
}

/// What the fake synthesizer was asked to say
#[derive(Debug, Default)]
pub struct SpeechLog {
    pub spoken: Vec<(String, Option<String>)>,
    pub cancels: usize,
    pub fail: bool,
}

/// Synthesizer recording every utterance
#[derive(Clone)]
pub struct FakeSynthesizer {
    pub log: Arc<Mutex<SpeechLog>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SpeechLog::default())),
        }
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        vec![
            Voice {
                name: "Samantha".to_string(),
                language: "en-US".to_string(),
                is_default: true,
            },
            Voice {
                name: "Monica".to_string(),
                language: "es-ES".to_string(),
                is_default: false,
            },
        ]
    }

    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail {
            return Err(Error::Synthesis("audio device busy".to_string()));
        }
        log.spoken
            .push((text.to_string(), voice.map(|v| v.name.clone())));
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
    }

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Matcher over the built-in catalog
pub fn builtin_matcher() -> CommandMatcher {
    CommandMatcher::new(Arc::new(
        CommandSet::builtin().expect("built-in catalog loads"),
    ))
}

/// Lifecycle over a fresh fake backend
pub fn lifecycle() -> (RecognitionLifecycle, Arc<Mutex<EngineLog>>) {
    let backend = FakeBackend::new();
    let log = Arc::clone(&backend.log);
    let lifecycle = RecognitionLifecycle::new(Box::new(backend), RecognitionSettings::default())
        .expect("fake backend is supported");
    (lifecycle, log)
}

/// Session plus handles on its fakes
pub struct TestSession {
    pub session: AssistantSession,
    pub engine: Arc<Mutex<EngineLog>>,
    pub speech: Arc<Mutex<SpeechLog>>,
}

/// Session over fakes with default configuration
pub fn session() -> TestSession {
    session_with(&Config::default())
}

/// Session over fakes with `config`
pub fn session_with(config: &Config) -> TestSession {
    let backend = FakeBackend::new();
    let synth = FakeSynthesizer::new();
    let engine = Arc::clone(&backend.log);
    let speech = Arc::clone(&synth.log);

    let session = AssistantSession::new(builtin_matcher(), Box::new(backend), Box::new(synth), config)
        .expect("session opens");

    TestSession {
        session,
        engine,
        speech,
    }
}
