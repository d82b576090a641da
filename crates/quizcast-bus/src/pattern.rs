//! Pattern subscriptions.
//!
//! Patterns use the same glob dialect as Redis `PSUBSCRIBE`: `*`, `?`,
//! `[...]` classes and `\` escapes. `:` and `/` are ordinary characters.

use globset::{GlobBuilder, GlobMatcher};

use crate::errors::BusError;

/// Compile a subscription pattern.
///
/// Empty patterns and patterns containing whitespace are rejected along
/// with anything `globset` cannot parse.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher, BusError> {
    if pattern.is_empty() {
        return Err(BusError::Subscribe("pattern is empty".into()));
    }
    if pattern.chars().any(char::is_whitespace) {
        return Err(BusError::Subscribe(format!(
            "pattern {pattern:?} contains whitespace"
        )));
    }
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| BusError::Subscribe(format!("invalid pattern {pattern:?}: {e}")))
}

/// Validate a subscription pattern without keeping the matcher.
pub fn validate_pattern(pattern: &str) -> Result<(), BusError> {
    compile_pattern(pattern).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn matches(pattern: &str, channel: &str) -> bool {
        compile_pattern(pattern).unwrap().is_match(channel)
    }

    #[test]
    fn trailing_star_matches_prefix() {
        assert!(matches("quiz_channel:*", "quiz_channel:abc"));
        assert!(matches("quiz_channel:*", "quiz_channel:"));
        assert!(!matches("quiz_channel:*", "chat:abc"));
    }

    #[test]
    fn exact_pattern() {
        assert!(matches("a:b", "a:b"));
        assert!(!matches("a:b", "a:bc"));
    }

    #[test]
    fn question_mark_single_char() {
        assert!(matches("q?", "q1"));
        assert!(!matches("q?", "q12"));
    }

    #[test]
    fn star_crosses_separators() {
        assert!(matches("a*c*e", "abcde"));
        assert!(matches("room:*", "room:a/b"));
        assert!(!matches("a*c", "abd"));
    }

    #[test]
    fn character_class() {
        assert!(matches("c:[ab]*", "c:a1"));
        assert!(matches("c:[ab]*", "c:b"));
        assert!(!matches("c:[ab]*", "c:x1"));
    }

    #[test]
    fn backslash_escapes_metacharacter() {
        assert!(matches(r"c:\*", "c:*"));
        assert!(!matches(r"c:\*", "c:abc"));
    }

    #[test]
    fn rejects_empty_whitespace_and_malformed() {
        assert_matches!(validate_pattern(""), Err(BusError::Subscribe(_)));
        assert_matches!(validate_pattern("a *"), Err(BusError::Subscribe(_)));
        assert_matches!(validate_pattern("c:[ab"), Err(BusError::Subscribe(_)));
        assert!(validate_pattern("quiz_channel:*").is_ok());
    }
}
