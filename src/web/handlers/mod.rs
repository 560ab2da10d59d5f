pub mod categories;
pub mod debug;
pub mod posts;
pub mod tags;
pub mod users;

use crate::models::{User, UserSummary};
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tera::Context;

fn make_admin_context(state: &AppState, user: &User) -> Context {
    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    ctx.insert("user", &UserSummary::from(user));
    ctx.insert("version", env!("CARGO_PKG_VERSION"));
    ctx.insert("query_log_enabled", &state.query_log.is_some());
    ctx
}

fn render(state: &AppState, template: &str, ctx: &Context) -> AppResult<Response> {
    let html = state.templates.render(template, ctx)?;
    Ok(Html(html).into_response())
}

pub async fn home() -> Redirect {
    Redirect::to("/admin/posts")
}

/// Trimmed value, or `None` when nothing but whitespace was submitted.
fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
