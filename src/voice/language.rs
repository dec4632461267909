//! Best-effort spoken-language detection from recognized text
//!
//! A handful of greeting and courtesy words per language. A wrong guess only
//! retunes the recognizer for later speech, so false positives are tolerated.

use std::sync::LazyLock;

use regex::Regex;

/// Default recognition language
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Minimum transcript length before detection is attempted
pub const MIN_DETECTION_CHARS: usize = 10;

/// Language tag and the signature that identifies it
struct Signature {
    tag: &'static str,
    pattern: Regex,
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    [
        (
            "es-ES",
            r"(?i)\b(hola|gracias|adi[oó]s|buenos d[ií]as|buenas tardes|por favor|necesito)\b",
        ),
        (
            "fr-FR",
            r"(?i)\b(bonjour|merci|au revoir|bonsoir|s'il vous pla[iî]t|je voudrais)\b",
        ),
        (
            "de-DE",
            r"(?i)\b(hallo|danke|guten tag|auf wiedersehen|bitte|tsch[uü]ss)\b",
        ),
        (
            "hi-IN",
            r"(?i)(\b(namaste|dhanyavaad|dhanyavad|shukriya|alvida)\b|\p{Devanagari}{2,})",
        ),
    ]
    .into_iter()
    .map(|(tag, pattern)| Signature {
        tag,
        pattern: Regex::new(pattern).expect("valid regex"),
    })
    .collect()
});

/// Guess the language of `text`
///
/// Returns `None` for short text or when no signature matches.
#[must_use]
pub fn detect_language(text: &str) -> Option<&'static str> {
    if text.trim().chars().count() <= MIN_DETECTION_CHARS {
        return None;
    }

    SIGNATURES
        .iter()
        .find(|s| s.pattern.is_match(text))
        .map(|s| s.tag)
}

/// Primary subtag of a BCP 47 language tag ("es-ES" -> "es")
#[must_use]
pub fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

/// Whether two tags share a primary language
#[must_use]
pub fn same_language(a: &str, b: &str) -> bool {
    primary_subtag(a).eq_ignore_ascii_case(primary_subtag(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_languages() {
        assert_eq!(detect_language("hola, necesito ayuda"), Some("es-ES"));
        assert_eq!(detect_language("bonjour, je voudrais"), Some("fr-FR"));
        assert_eq!(detect_language("guten tag, wie geht's"), Some("de-DE"));
        assert_eq!(detect_language("namaste, kaise ho aap"), Some("hi-IN"));
        assert_eq!(detect_language("नमस्ते आप कैसे हैं"), Some("hi-IN"));
    }

    #[test]
    fn short_text_is_ignored() {
        assert_eq!(detect_language("hola"), None);
        assert_eq!(detect_language("   gracias  "), None);
    }

    #[test]
    fn english_has_no_signature() {
        assert_eq!(detect_language("go to the caregivers page"), None);
    }

    #[test]
    fn subtags() {
        assert_eq!(primary_subtag("es-ES"), "es");
        assert_eq!(primary_subtag("fr"), "fr");
        assert!(same_language("en-US", "EN-gb"));
        assert!(!same_language("en-US", "es-US"));
    }
}
