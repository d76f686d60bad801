//! URL slug generation for posts.

use std::collections::HashSet;

use anyhow::Result;
use uuid::Uuid;

use crate::store::ContentStore;

/// Maximum slug length before the numeric suffix.
const MAX_SLUG_LEN: usize = 128;

/// First path segments owned by other routes. A post with one of these slugs
/// would be shadowed, so they are never handed out.
pub const RESERVED_SLUGS: &[&str] = &[
    "categories",
    "category",
    "dashboard",
    "delete-comment",
    "login",
    "logout",
    "register",
    "search",
];

fn is_taken(candidate: &str, existing: &HashSet<String>) -> bool {
    RESERVED_SLUGS.contains(&candidate) || existing.contains(candidate)
}

/// Convert a title to a URL-safe slug.
///
/// Keeps ASCII letters, digits, underscores and hyphens; runs of whitespace or
/// hyphens become a single hyphen; leading and trailing hyphens and
/// underscores are stripped. Returns an empty string when nothing survives.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
        // Anything else is dropped without separating words.
    }

    let trimmed = result.trim_matches(|c| c == '-' || c == '_');
    if trimmed.len() <= MAX_SLUG_LEN {
        return trimmed.to_string();
    }

    // Pure ASCII from here, so byte slicing is safe.
    let truncated = &trimmed[..MAX_SLUG_LEN];
    let cut = match truncated.rfind('-') {
        Some(last_hyphen) if last_hyphen > 0 => &truncated[..last_hyphen],
        _ => truncated,
    };
    cut.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Pick the first free slug: `base`, then `base-1`, `base-2`, ...
pub fn pick_unique_slug(base: &str, existing: &HashSet<String>) -> String {
    if !is_taken(base, existing) {
        return base.to_string();
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !is_taken(&candidate, existing) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Resolve a unique slug for `base`, ignoring the post `exclude` (the one being edited).
pub async fn unique_slug(
    store: &dyn ContentStore,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String> {
    let existing: HashSet<String> = store
        .slugs_with_prefix(base, exclude)
        .await?
        .into_iter()
        .collect();

    Ok(pick_unique_slug(base, &existing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust is Great"), "rust-is-great");
    }

    #[test]
    fn test_slugify_drops_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("C++ & you"), "c-you");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("hello   --  world"), "hello-world");
        assert_eq!(slugify("  -leading and trailing-  "), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_keeps_inner_underscores() {
        assert_eq!(slugify("_snake_case_"), "snake_case");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn test_slugify_long_text() {
        let long = "word ".repeat(60);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("word-word"));
    }

    #[test]
    fn test_pick_unique_slug() {
        let mut existing = HashSet::new();
        assert_eq!(pick_unique_slug("hello-world", &existing), "hello-world");

        existing.insert("hello-world".to_string());
        assert_eq!(pick_unique_slug("hello-world", &existing), "hello-world-1");

        existing.insert("hello-world-1".to_string());
        existing.insert("hello-world-2".to_string());
        assert_eq!(pick_unique_slug("hello-world", &existing), "hello-world-3");
    }

    #[test]
    fn test_pick_unique_slug_skips_route_segments() {
        let mut existing = HashSet::new();
        assert_eq!(pick_unique_slug("search", &existing), "search-1");
        assert_eq!(pick_unique_slug("dashboard", &existing), "dashboard-1");

        existing.insert("login-1".to_string());
        assert_eq!(pick_unique_slug("login", &existing), "login-2");

        // Only whole segments are reserved.
        assert_eq!(pick_unique_slug("search-tips", &existing), "search-tips");
    }

    #[test]
    fn test_pick_unique_slug_fills_gaps() {
        let existing: HashSet<String> = ["post", "post-2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(pick_unique_slug("post", &existing), "post-1");
    }
}
