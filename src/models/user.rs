use super::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Sign-up input. The password is hashed by the repository and never stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_username(&mut errors, &self.username);
        validate_email(&mut errors, &self.email);
        validate_password(&mut errors, &self.password);
        errors
    }
}

pub fn validate_username(errors: &mut ValidationErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", "Username cannot be empty");
    } else if username.len() > MAX_USERNAME_LENGTH {
        errors.add(
            "username",
            format!(
                "Username must be {} characters or less",
                MAX_USERNAME_LENGTH
            ),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        errors.add(
            "username",
            "Username can only contain letters, numbers, underscores, and hyphens",
        );
    }
}

pub fn validate_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email cannot be empty");
    } else if email.len() > MAX_EMAIL_LENGTH {
        errors.add(
            "email",
            format!("Email must be {} characters or less", MAX_EMAIL_LENGTH),
        );
    } else if !email.contains('@') || !email.contains('.') {
        errors.add("email", "Invalid email format");
    }
}

pub fn validate_password(errors: &mut ValidationErrors, password: &str) {
    if password.len() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ),
        );
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.add(
            "password",
            "Password must contain at least one lowercase letter",
        );
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.add(
            "password",
            "Password must contain at least one uppercase letter",
        );
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.add("password", "Password must contain at least one number");
    }
}
