//! Voice input and output
//!
//! Recognition lifecycle, language detection, speech output, transcript
//! debounce and the conversation log.

mod debounce;
mod history;
mod language;
mod recognition;
mod synthesis;

pub use debounce::{CommandDebouncer, DEFAULT_COOLDOWN, DEFAULT_QUIET_PERIOD};
pub use history::{ConversationHistory, ConversationMessage, Role};
pub use language::{DEFAULT_LANGUAGE, MIN_DETECTION_CHARS, detect_language, primary_subtag, same_language};
pub use recognition::{
    RecognitionBackend, RecognitionEngine, RecognitionErrorKind, RecognitionEvent,
    RecognitionLifecycle, RecognitionNotice, RecognitionSettings, RecognitionState, Utterance,
};
pub use synthesis::{SpeechOutput, SpeechSynthesizer, Voice};
