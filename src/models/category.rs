use super::validation::{require_max_chars, require_non_blank};
use super::ValidationErrors;
use serde::Serialize;

pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryData {
    pub name: String,
}

impl CategoryData {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        require_max_chars(
            &mut errors,
            "name",
            "Name",
            &self.name,
            MAX_CATEGORY_NAME_LENGTH,
        );
        require_non_blank(&mut errors, "name", "Name", &self.name);
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: i64,
    #[serde(flatten)]
    pub data: CategoryData,
}
