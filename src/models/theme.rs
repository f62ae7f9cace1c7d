//! Theme model and slug derivation.

use serde::{Deserialize, Serialize};

/// A user-defined tag attached to content items for filtering and search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub name: String,
    /// URL-safe identifier derived from the name; appears in shareable
    /// filter URLs, so the derivation rule is part of the persisted contract.
    pub slug: String,
    pub created_at: String,
}

/// Request body for find-or-create of a theme.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThemeRequest {
    pub name: String,
}

/// Derive the URL-safe slug for a theme name.
///
/// Lowercase, whitespace runs become `-`, everything outside `[a-z0-9-]`
/// is stripped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = false;
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            if !last_was_hyphen {
                slug.push('-');
                last_was_hyphen = true;
            }
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
            last_was_hyphen = ch == '-';
        }
        // anything else is dropped
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_simple() {
        assert_eq!(slugify("Wellbeing"), "wellbeing");
    }

    #[test]
    fn test_slugify_spaces() {
        assert_eq!(slugify("Trauma Informed Practice"), "trauma-informed-practice");
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("Care & Support"), "care-support");
    }

    #[test]
    fn test_slugify_collapses_whitespace() {
        assert_eq!(slugify("  Young   People  "), "young-people");
    }

    #[test]
    fn test_slugify_keeps_digits_and_hyphens() {
        assert_eq!(slugify("3-2-1 Reflections"), "3-2-1-reflections");
    }
}
