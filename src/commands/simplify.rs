//! Transcript simplification
//!
//! Continuous recognition on a stuck-open microphone can emit the same
//! fragment many times in a row. Consecutive repeats are collapsed before the
//! text reaches the matcher or the conversation history. Only consecutive
//! runs are touched; word order is preserved.

use std::collections::HashMap;

/// Longest phrase (in words) checked for repetition
const MAX_PHRASE_WORDS: usize = 4;

/// Shortest phrase (in words) checked for repetition
const MIN_PHRASE_WORDS: usize = 2;

/// A single word must occur more than this many times to be collapsed
const WORD_FREQUENCY_THRESHOLD: usize = 3;

/// Minimum run length for single-word collapsing
const WORD_RUN_THRESHOLD: usize = 3;

/// Words this short are never collapsed individually
const MIN_WORD_CHARS: usize = 3;

/// Collapse repeated phrases and words in a transcript
///
/// Idempotent: passes repeat until the text stops changing, so
/// `simplify(&simplify(x)) == simplify(x)`.
#[must_use]
pub fn simplify(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();

    loop {
        let before = tokens.len();

        tokens = collapse_words(&tokens);
        for n in (MIN_PHRASE_WORDS..=MAX_PHRASE_WORDS).rev() {
            tokens = collapse_phrases(&tokens, n);
        }

        if tokens.len() == before {
            break;
        }
    }

    let simplified = tokens.join(" ");
    if simplified.len() < text.trim().len() {
        tracing::debug!(
            original_len = text.len(),
            simplified_len = simplified.len(),
            "collapsed repeated transcript fragments"
        );
    }
    simplified
}

fn lower_key(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn same_phrase(a: &[&str], b: &[&str]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.to_lowercase() == y.to_lowercase())
}

/// Replace runs of two or more consecutive `n`-word phrases with one copy
fn collapse_phrases<'a>(tokens: &[&'a str], n: usize) -> Vec<&'a str> {
    if tokens.len() < n * 2 {
        return tokens.to_vec();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for window in tokens.windows(n) {
        *counts.entry(lower_key(window)).or_default() += 1;
    }

    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if i + n * 2 <= tokens.len() {
            let phrase = &tokens[i..i + n];
            let repeated = counts.get(&lower_key(phrase)).is_some_and(|&c| c >= 2);

            if repeated && same_phrase(phrase, &tokens[i + n..i + n * 2]) {
                let mut j = i + n * 2;
                while j + n <= tokens.len() && same_phrase(phrase, &tokens[j..j + n]) {
                    j += n;
                }
                out.extend_from_slice(phrase);
                i = j;
                continue;
            }
        }

        out.push(tokens[i]);
        i += 1;
    }

    out
}

/// Collapse runs of three or more of a frequent single word
fn collapse_words<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokens {
        *counts.entry(token.to_lowercase()).or_default() += 1;
    }

    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let word = tokens[i].to_lowercase();
        let mut j = i + 1;
        while j < tokens.len() && tokens[j].to_lowercase() == word {
            j += 1;
        }

        let run = j - i;
        let frequent = word.chars().count() >= MIN_WORD_CHARS
            && counts.get(&word).is_some_and(|&c| c > WORD_FREQUENCY_THRESHOLD);

        if frequent && run >= WORD_RUN_THRESHOLD {
            out.push(tokens[i]);
        } else {
            out.extend_from_slice(&tokens[i..j]);
        }
        i = j;
    }

    out
}
