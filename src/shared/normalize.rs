//! Slug and tag normalization.
//!
//! Pure text transforms used by every write path that derives identifiers
//! from user input.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Runs of characters that cannot appear in a slug
    static ref SLUG_SEPARATOR_REGEX: Regex = Regex::new(r"[^a-z0-9]+").unwrap();

    /// Runs of whitespace inside a tag
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

/// Turn a display name into a URL-safe identifier.
///
/// The input is lowercased and every run of characters outside `[a-z0-9]`
/// becomes a single hyphen. Leading and trailing hyphens are kept.
pub fn slugify(name: &str) -> String {
    SLUG_SEPARATOR_REGEX
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// Canonical form of one tag: trimmed, lowercased, inner whitespace
/// collapsed to a hyphen. `None` when nothing is left.
///
/// Commas are not separators here, so a lookup for `"foo,bar"` stays a
/// single tag that no stored tag can equal.
pub fn normalize_tag(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    Some(
        WHITESPACE_REGEX
            .replace_all(&token.to_lowercase(), "-")
            .into_owned(),
    )
}

/// Canonical tag list from submitted form values.
///
/// Every value may itself hold several comma separated tags, each run
/// through [`normalize_tag`]. Empty tokens are dropped and repeated tags keep
/// their first position.
pub fn normalize_tags<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for tag in values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .filter_map(normalize_tag)
    {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    tags
}

/// Candidate slug for the `attempt`-th collision (`attempt` starts at 2)
pub fn suffixed_slug(base: &str, attempt: u32) -> String {
    format!("{}-{}", base, attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separator_runs() {
        assert_eq!(slugify("Hello, World! 2.0"), "hello-world-2-0");
        assert_eq!(slugify("Landing Page Kit"), "landing-page-kit");
    }

    #[test]
    fn test_slugify_keeps_edge_hyphens() {
        assert_eq!(slugify("  Padded  "), "-padded-");
        assert_eq!(slugify("!!!"), "-");
    }

    #[test]
    fn test_slugify_non_ascii_becomes_separator() {
        assert_eq!(slugify("Café Menu"), "caf-menu");
    }

    #[test]
    fn test_normalize_tags_from_single_value() {
        let tags = normalize_tags(&["Foo Bar, baz  qux,, Foo Bar"]);
        assert_eq!(tags, vec!["foo-bar".to_string(), "baz-qux".to_string()]);
    }

    #[test]
    fn test_normalize_tags_from_many_values() {
        let tags = normalize_tags(&[" HTML ", "Dark Mode", "", "html"]);
        assert_eq!(tags, vec!["html".to_string(), "dark-mode".to_string()]);
    }

    #[test]
    fn test_normalize_tags_empty_input() {
        let empty: [&str; 0] = [];
        assert!(normalize_tags(&empty).is_empty());
        assert!(normalize_tags(&[" , ,"]).is_empty());
    }

    #[test]
    fn test_normalize_tag_keeps_commas() {
        assert_eq!(normalize_tag("  Dark   Mode ").as_deref(), Some("dark-mode"));
        assert_eq!(normalize_tag("Foo,Bar").as_deref(), Some("foo,bar"));
        assert!(normalize_tag("   ").is_none());
    }

    #[test]
    fn test_suffixed_slug() {
        assert_eq!(suffixed_slug("landing", 2), "landing-2");
    }
}
