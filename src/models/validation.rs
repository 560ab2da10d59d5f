use serde::Serialize;
use std::collections::BTreeMap;

/// Field name to message. A field keeps only the last message reported for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub(crate) fn require_non_blank(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} must not be empty", label));
    }
}

pub(crate) fn require_max_chars(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("{} must be {} characters or less", label, max),
        );
    }
}

pub(crate) fn require_slug(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if !crate::services::slug::validate_slug(value) {
        errors.add(
            field,
            "Slug must contain only lowercase letters, numbers and single hyphens",
        );
    }
}
