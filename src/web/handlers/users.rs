use super::{make_admin_context, render};
use crate::models::{
    validate_email, validate_password, NewUser, User, ValidationErrors,
};
use crate::web::error::AppResult;
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::Form;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct NewUserForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

fn check_confirmation(errors: &mut ValidationErrors, password: &str, confirm: &str) {
    if password != confirm {
        errors.add("password_confirm", "Passwords do not match");
    }
}

fn render_new_form(
    state: &AppState,
    user: &User,
    username: &str,
    email: &str,
    errors: &ValidationErrors,
) -> AppResult<Response> {
    let mut ctx = make_admin_context(state, user);
    ctx.insert("username", username);
    ctx.insert("email", email);
    ctx.insert("errors", errors);
    render(state, "admin/users/form.html", &ctx)
}

fn render_profile(
    state: &AppState,
    user: &User,
    email: &str,
    saved: bool,
    errors: &ValidationErrors,
) -> AppResult<Response> {
    let mut ctx = make_admin_context(state, user);
    ctx.insert("email", email);
    ctx.insert("saved", &saved);
    ctx.insert("errors", errors);
    render(state, "admin/users/profile.html", &ctx)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let users = state.repos.users.find_all()?;
    let mut ctx = make_admin_context(&state, &user);
    ctx.insert("users", &users);
    render(&state, "admin/users/index.html", &ctx)
}

pub async fn new_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_new_form(&state, &user, "", "", &ValidationErrors::new())
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<NewUserForm>,
) -> AppResult<Response> {
    let new_user = NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password,
    };

    let mut errors = new_user.validate();
    check_confirmation(&mut errors, &new_user.password, &form.password_confirm);
    if !errors.contains("username")
        && !state.repos.users.check_username_availability(&new_user.username)?
    {
        errors.add("username", "Username already taken");
    }
    if !errors.contains("email")
        && !state.repos.users.check_email_availability(&new_user.email)?
    {
        errors.add("email", "Email already used");
    }
    if !errors.is_empty() {
        return render_new_form(&state, &user, &new_user.username, &new_user.email, &errors);
    }

    let created = state.repos.users.create(&new_user)?;
    tracing::info!(
        created_by = %user.username,
        username = %created.username,
        "Admin user added"
    );
    Ok(Redirect::to("/admin/users").into_response())
}

pub async fn profile_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_profile(&state, &user, &user.email, false, &ValidationErrors::new())
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let email = form.email.trim().to_string();
    let change_password = !form.password.is_empty();

    let mut errors = ValidationErrors::new();
    validate_email(&mut errors, &email);
    if !errors.contains("email")
        && email != user.email
        && !state.repos.users.check_email_availability(&email)?
    {
        errors.add("email", "Email already used");
    }
    if change_password {
        validate_password(&mut errors, &form.password);
        check_confirmation(&mut errors, &form.password, &form.password_confirm);
    }
    if !errors.is_empty() {
        return render_profile(&state, &user, &email, false, &errors);
    }

    if email != user.email {
        state.repos.users.update_email(&user, &email)?;
    }
    if change_password {
        state.repos.users.update_password(&user, &form.password)?;
    }

    render_profile(&state, &user, &email, true, &errors)
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    if id == user.id {
        return Ok((
            StatusCode::CONFLICT,
            "You cannot delete the account you are signed in with",
        )
            .into_response());
    }

    if state.repos.users.delete_one_by_id(id)? {
        tracing::info!(
            deleted_by = %user.username,
            user_id = id,
            "Admin user removed"
        );
    }
    Ok(Redirect::to("/admin/users").into_response())
}
