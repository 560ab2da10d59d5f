use super::{make_admin_context, render};
use crate::models::{Category, CategoryData, PageInfo, Pagination, User, ValidationErrors};
use crate::web::error::{AppError, AppResult};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::Form;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

impl CategoryForm {
    pub fn into_data(self) -> CategoryData {
        CategoryData {
            name: self.name.trim().to_string(),
        }
    }
}

fn render_form(
    state: &AppState,
    user: &User,
    category_id: Option<i64>,
    category: &CategoryData,
    errors: &ValidationErrors,
) -> AppResult<Response> {
    let mut ctx = make_admin_context(state, user);
    ctx.insert("is_new", &category_id.is_none());
    ctx.insert("category_id", &category_id);
    ctx.insert("category", category);
    ctx.insert("errors", errors);
    render(state, "admin/categories/form.html", &ctx)
}

fn render_index(
    state: &AppState,
    user: &User,
    page: i64,
    error: Option<&str>,
) -> AppResult<Response> {
    let pagination = Pagination::new(page, state.config.content.categories_per_page);
    let total = state.repos.categories.count()?;
    let categories = state.repos.categories.find_page(&pagination)?;

    let mut ctx = make_admin_context(state, user);
    ctx.insert("categories", &categories);
    ctx.insert("page_info", &PageInfo::new(&pagination, total));
    ctx.insert("error", &error);
    render(state, "admin/categories/index.html", &ctx)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_index(&state, &user, 1, None)
}

pub async fn index_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(page): Path<i64>,
) -> AppResult<Response> {
    render_index(&state, &user, page, None)
}

pub async fn new_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_form(
        &state,
        &user,
        None,
        &CategoryData::default(),
        &ValidationErrors::new(),
    )
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let data = form.into_data();
    let errors = data.validate();
    if !errors.is_empty() {
        return render_form(&state, &user, None, &data, &errors);
    }

    state.repos.categories.create(&data)?;
    Ok(Redirect::to("/admin/categories").into_response())
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let category = state
        .repos
        .categories
        .find_one_by_id(id)?
        .ok_or(AppError::NotFound)?;
    render_form(
        &state,
        &user,
        Some(category.id),
        &category.data,
        &ValidationErrors::new(),
    )
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let data = form.into_data();
    let errors = data.validate();
    if !errors.is_empty() {
        return render_form(&state, &user, Some(id), &data, &errors);
    }

    if !state.repos.categories.update(&Category { id, data })? {
        return Err(AppError::NotFound);
    }
    Ok(Redirect::to("/admin/categories").into_response())
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    if state.repos.categories.is_in_use(id)? {
        let mut response = render_index(
            &state,
            &user,
            1,
            Some("Category is still used by posts and cannot be deleted"),
        )?;
        *response.status_mut() = StatusCode::CONFLICT;
        return Ok(response);
    }

    state.repos.categories.delete_one_by_id(id)?;
    Ok(Redirect::to("/admin/categories").into_response())
}
