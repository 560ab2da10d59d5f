use once_cell::sync::Lazy;
use regex::Regex;
use slug::slugify;

pub const MAX_SLUG_LENGTH: usize = 200;

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("Invalid slug regex pattern"));

pub fn generate_slug(title: &str) -> String {
    slugify(title)
}

/// Lowercase ASCII words joined by single hyphens.
pub fn validate_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        return false;
    }
    SLUG_REGEX.is_match(slug)
}
