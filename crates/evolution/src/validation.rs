//! Structural checks on generated prompt text.

use serde::{Deserialize, Serialize};

/// Phrase every generated prompt must open with (case-insensitive).
pub const ROLE_PHRASE: &str = "you are";

/// How many leading characters are searched for [`ROLE_PHRASE`].
pub const ROLE_WINDOW: usize = 50;

/// Minimum accepted length in characters.
pub const MIN_LENGTH: usize = 20;

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
];

/// Why generated text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationFailure {
    /// Shorter than [`MIN_LENGTH`]
    #[error("text is {len} characters, need at least {min}")]
    TooShort {
        /// Length after cleaning
        len: usize,
        /// Required length
        min: usize,
    },

    /// No "you are" near the start
    #[error("\"you are\" not found within the first {window} characters")]
    MissingRolePhrase {
        /// Characters searched
        window: usize,
    },
}

/// Trim whitespace and strip matching quote pairs wrapping the whole text.
///
/// Quotes inside the text, including a closing quote of embedded speech at
/// the end, are left alone.
pub fn clean(raw: &str) -> &str {
    let mut text = raw.trim();
    while let Some(inner) = unwrap_pair(text) {
        text = inner.trim();
    }
    text
}

fn unwrap_pair(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    QUOTE_PAIRS
        .iter()
        .any(|&(open, close)| first == open && last == close)
        .then(|| &text[first.len_utf8()..text.len() - last.len_utf8()])
}

/// Clean generated text and check it is a usable system prompt.
pub fn validate(raw: &str) -> Result<String, ValidationFailure> {
    let text = clean(raw);

    let len = text.chars().count();
    if len < MIN_LENGTH {
        return Err(ValidationFailure::TooShort { len, min: MIN_LENGTH });
    }

    let head: String = text.chars().take(ROLE_WINDOW).collect();
    if !head.to_lowercase().contains(ROLE_PHRASE) {
        return Err(ValidationFailure::MissingRolePhrase { window: ROLE_WINDOW });
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_fails() {
        assert_eq!(
            validate("Be supportive."),
            Err(ValidationFailure::TooShort { len: 14, min: MIN_LENGTH })
        );
    }

    #[test]
    fn test_plain_prompt_passes() {
        let text = "You are a helpful peer mentor for college students.";
        assert_eq!(validate(text).as_deref(), Ok(text));
    }

    #[test]
    fn test_quoted_prompt_passes_after_strip() {
        assert_eq!(
            validate("\"You are a thoughtful mentor who listens.\"").as_deref(),
            Ok("You are a thoughtful mentor who listens.")
        );
        assert_eq!(
            validate("  \u{201C}You are a thoughtful mentor who listens.\u{201D}\n").as_deref(),
            Ok("You are a thoughtful mentor who listens.")
        );
    }

    #[test]
    fn test_embedded_speech_keeps_its_quotes() {
        let text = "You are a mentor who says \"keep going\"";
        assert_eq!(validate(text).as_deref(), Ok(text));
        let text = "You are a coach who always tells students 'you can do it'";
        assert_eq!(validate(text).as_deref(), Ok(text));
        assert_eq!(
            validate("\"You are a mentor who says 'keep going'\"").as_deref(),
            Ok("You are a mentor who says 'keep going'")
        );
    }

    #[test]
    fn test_nested_pairs_are_stripped() {
        assert_eq!(clean(" \" 'You are a calm coach.' \" "), "You are a calm coach.");
        assert_eq!(clean("\"You are a calm coach.'"), "\"You are a calm coach.'");
        assert_eq!(clean("\""), "\"");
        assert_eq!(clean("\"\""), "");
    }

    #[test]
    fn test_role_phrase_must_be_near_start() {
        assert!(validate("As a coach for students, YOU ARE expected to listen.").is_ok());
        assert_eq!(
            validate("I am a supportive peer mentor for students"),
            Err(ValidationFailure::MissingRolePhrase { window: ROLE_WINDOW })
        );
        let late = format!("{} you are a mentor.", "x".repeat(60));
        assert!(matches!(validate(&late), Err(ValidationFailure::MissingRolePhrase { .. })));
    }
}
