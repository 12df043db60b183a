//! Syntactic domain validation and normalization.
//!
//! Validation is purely lexical: labels of alphanumerics and inner hyphens
//! separated by dots, ending in a TLD of two or more letters. Whether the
//! domain actually resolves is the lookup pipeline's problem, not ours.

use once_cell::sync::Lazy;
use regex::Regex;

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z0-9]+(-[a-z0-9]+)*\.)+[a-z]{2,}$").expect("domain regex is valid")
});

/// Check whether `input` is a syntactically acceptable domain name.
///
/// Returns false for blank or whitespace-only input, input without a dot,
/// and anything that fails the label pattern.
pub fn is_valid(input: &str) -> bool {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return false;
    }

    if !trimmed.contains('.') {
        return false;
    }

    DOMAIN_RE.is_match(trimmed)
}

/// Trim and lowercase a domain name. Assumes validity was already checked;
/// blank input collapses to the empty string.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_domains() {
        assert!(is_valid("example.com"));
        assert!(is_valid("sub.example.com"));
        assert!(is_valid("my-site.example.co.uk"));
        assert!(is_valid("123.example.com"));
        assert!(is_valid("EXAMPLE.COM"));
        assert!(is_valid("  example.com  "));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(!is_valid(""));
        assert!(!is_valid("   "));
        assert!(!is_valid("example"));
        assert!(!is_valid("example."));
        assert!(!is_valid(".example.com"));
        assert!(!is_valid("sub..example.com"));
        assert!(!is_valid("-example.com"));
        assert!(!is_valid("example-.com"));
        assert!(!is_valid("exam ple.com"));
        assert!(!is_valid("example.c"));
        assert!(!is_valid("example.1"));
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Example.COM  "), "example.com");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["Example.COM", "  sub.Example.org ", "already.normal.net"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }
}
