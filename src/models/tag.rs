use super::validation::require_slug;
use super::ValidationErrors;
use serde::Serialize;

pub const MIN_TAG_TITLE_LENGTH: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagData {
    pub title: String,
    pub slug: String,
}

impl TagData {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.title.trim().chars().count() < MIN_TAG_TITLE_LENGTH {
            errors.add(
                "title",
                format!(
                    "Title must be at least {} characters long",
                    MIN_TAG_TITLE_LENGTH
                ),
            );
        }
        require_slug(&mut errors, "slug", &self.slug);
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    #[serde(flatten)]
    pub data: TagData,
}

impl Tag {
    pub fn validate(&self) -> ValidationErrors {
        self.data.validate()
    }
}
