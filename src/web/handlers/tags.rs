use super::{make_admin_context, non_blank, render};
use crate::models::{Tag, TagData, User, ValidationErrors};
use crate::services::slug::generate_slug;
use crate::web::error::{AppError, AppResult};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::Form;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub title: String,
    #[serde(default)]
    pub slug: String,
}

impl TagForm {
    /// An empty slug is derived from the title.
    pub fn into_data(self) -> TagData {
        let title = self.title.trim().to_string();
        let slug = non_blank(&self.slug).unwrap_or_else(|| generate_slug(&title));
        TagData { title, slug }
    }
}

fn render_form(
    state: &AppState,
    user: &User,
    tag_id: Option<i64>,
    tag: &TagData,
    errors: &ValidationErrors,
) -> AppResult<Response> {
    let mut ctx = make_admin_context(state, user);
    ctx.insert("is_new", &tag_id.is_none());
    ctx.insert("tag_id", &tag_id);
    ctx.insert("tag", tag);
    ctx.insert("errors", errors);
    render(state, "admin/tags/form.html", &ctx)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let tags = state.repos.tags.find_all()?;
    let mut ctx = make_admin_context(&state, &user);
    ctx.insert("tags", &tags);
    render(&state, "admin/tags/index.html", &ctx)
}

pub async fn new_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_form(&state, &user, None, &TagData::default(), &ValidationErrors::new())
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<TagForm>,
) -> AppResult<Response> {
    let data = form.into_data();

    let mut errors = data.validate();
    if !errors.contains("slug") && !state.repos.tags.check_slug_availability(&data.slug)? {
        errors.add("slug", "Slug already used");
    }
    if !errors.is_empty() {
        return render_form(&state, &user, None, &data, &errors);
    }

    state.repos.tags.create(&data)?;
    Ok(Redirect::to("/admin/tags").into_response())
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let tag = state.repos.tags.find_one_by_id(id)?.ok_or(AppError::NotFound)?;
    render_form(&state, &user, Some(tag.id), &tag.data, &ValidationErrors::new())
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<TagForm>,
) -> AppResult<Response> {
    let current = state.repos.tags.find_one_by_id(id)?.ok_or(AppError::NotFound)?;
    let data = form.into_data();

    let mut errors = data.validate();
    if !errors.contains("slug")
        && data.slug != current.data.slug
        && !state.repos.tags.check_slug_availability(&data.slug)?
    {
        errors.add("slug", "Slug already used");
    }
    if !errors.is_empty() {
        return render_form(&state, &user, Some(id), &data, &errors);
    }

    let tag = Tag { id: current.id, data };
    if !state.repos.tags.update(&tag)? {
        return Err(AppError::NotFound);
    }
    Ok(Redirect::to("/admin/tags").into_response())
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    state.repos.tags.delete_one_by_id(id)?;
    Ok(Redirect::to("/admin/tags").into_response())
}
