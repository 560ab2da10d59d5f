use super::validation::{require_max_chars, require_non_blank, require_slug};
use super::{Category, ValidationErrors};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_TITLE_LENGTH: usize = 255;

/// Every field of a post the admin can write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostData {
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: String,
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
    pub published: bool,
    pub category_id: i64,
    pub author_id: Option<i64>,
    pub tag_ids: Vec<i64>,
}

impl PostData {
    /// Field rules only; slug uniqueness is checked against storage by the caller.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        require_max_chars(&mut errors, "title", "Title", &self.title, MAX_TITLE_LENGTH);
        require_non_blank(&mut errors, "title", "Title", &self.title);
        require_slug(&mut errors, "slug", &self.slug);
        require_non_blank(&mut errors, "description", "Description", &self.description);
        require_non_blank(&mut errors, "body", "Body", &self.body);

        if self.category_id <= 0 {
            errors.add("category_id", "Category must be selected");
        }
        if self.published && self.published_at.is_none() {
            errors.add(
                "published_at",
                "Publish date is required for published posts",
            );
        }

        errors
    }
}

/// A stored post with its category resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    #[serde(flatten)]
    pub data: PostData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<Category>,
}

impl Post {
    pub fn validate(&self) -> ValidationErrors {
        self.data.validate()
    }
}
