//! Tokenization and query-term sanitization.
//!
//! Documents and query terms are normalized the same way: lowercased, then
//! split into runs of ASCII alphanumerics and Greek letters. Everything
//! else (punctuation, whitespace, other scripts) separates tokens. Query
//! terms may additionally combine operands with `||` (union of synonyms)
//! and `&&` (intersection); sanitization sorts the operands so equivalent
//! expressions share one canonical form.

use once_cell::sync::Lazy;
use regex::Regex;

/// Intersection operator in query-term expressions.
pub const LOGICAL_AND: &str = "&&";

/// Union (synonym) operator in query-term expressions.
pub const LOGICAL_OR: &str = "||";

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9Α-Ωα-ω]+").expect("valid token regex"));

/// Split text into normalized (lowercase) tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Canonicalize a single phrase: lowercase tokens joined by single spaces.
fn sanitize_phrase(phrase: &str) -> String {
    tokenize(phrase).join(" ")
}

/// Canonicalize a query-term expression.
///
/// Each `||` alternative is split into its `&&` conjuncts; every operand is
/// tokenized and rejoined, operands are sorted within their operator, and
/// the expression is reassembled. Equal expressions with reordered operands
/// therefore compare equal, which keeps per-query caches keyed correctly.
pub fn sanitize_term(term: &str) -> String {
    let mut alternatives: Vec<String> = term
        .split(LOGICAL_OR)
        .map(|alt| {
            let mut conjuncts: Vec<String> =
                alt.split(LOGICAL_AND).map(sanitize_phrase).collect();
            conjuncts.sort();
            conjuncts.join(LOGICAL_AND)
        })
        .collect();
    alternatives.sort();
    alternatives.join(LOGICAL_OR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_strips_punctuation() {
        assert_eq!(tokenize("Testing123****."), vec!["testing123"]);
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        assert_eq!(
            tokenize("breast-cancer, abemaciclib;"),
            vec!["breast", "cancer", "abemaciclib"]
        );
    }

    #[test]
    fn test_tokenize_keeps_greek_letters() {
        assert_eq!(tokenize("TGF-β signaling"), vec!["tgf", "β", "signaling"]);
    }

    #[test]
    fn test_tokenize_empty_text() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... !!").is_empty());
    }

    #[test]
    fn test_sanitize_plain_phrase() {
        assert_eq!(sanitize_term("Testing123****."), "testing123");
        assert_eq!(sanitize_term("Breast  Cancer."), "breast cancer");
    }

    #[test]
    fn test_sanitize_sorts_or_operands() {
        let sanitized = sanitize_term(&format!(
            "The quick brown fox {} jumped over the lazy dog.",
            LOGICAL_OR
        ));
        assert_eq!(
            sanitized,
            format!("jumped over the lazy dog{}the quick brown fox", LOGICAL_OR)
        );
    }

    #[test]
    fn test_sanitize_sorts_and_operands() {
        assert_eq!(sanitize_term("This&&is&&a&&test."), "a&&is&&test&&this");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_term("skin&&treatment||Carcinoma");
        assert_eq!(sanitize_term(&once), once);
    }
}
