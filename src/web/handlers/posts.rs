use super::{make_admin_context, non_blank, render};
use crate::models::{PageInfo, Pagination, Post, PostData, User, UserSummary, ValidationErrors};
use crate::web::error::{AppError, AppResult};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::Form;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

const PUBLISHED_AT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];
const PUBLISHED_AT_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub image: String,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl PostForm {
    /// Builds the post fields. Values that cannot be converted are reported per field
    /// and left at their defaults so the form can be shown again.
    pub fn into_data(self, author_id: Option<i64>) -> (PostData, ValidationErrors) {
        let mut errors = ValidationErrors::new();

        let category_id = match self.category_id.trim().parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                errors.add("category_id", "Category must be selected");
                0
            }
        };

        let published_at = match non_blank(&self.published_at) {
            Some(raw) => {
                let parsed = parse_published_at(&raw);
                if parsed.is_none() {
                    errors.add(
                        "published_at",
                        "Publish date must look like YYYY-MM-DD HH:MM",
                    );
                }
                parsed
            }
            None => None,
        };

        let data = PostData {
            title: self.title.trim().to_string(),
            slug: self.slug.trim().to_string(),
            image: non_blank(&self.image),
            description: self.description,
            body: self.body,
            published_at,
            published: self.published.is_some(),
            category_id,
            author_id,
            tag_ids: self.tag_ids,
        };

        (data, errors)
    }
}

pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    PUBLISHED_AT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn published_at_input(post: &PostData) -> String {
    post.published_at
        .map(|dt| dt.format(PUBLISHED_AT_INPUT_FORMAT).to_string())
        .unwrap_or_default()
}

/// Tags may be deleted while an edit form is open; report that instead of failing the write.
fn check_tags_exist(
    state: &AppState,
    data: &PostData,
    errors: &mut ValidationErrors,
) -> AppResult<()> {
    if data.tag_ids.is_empty() {
        return Ok(());
    }
    let known: HashSet<i64> = state
        .repos
        .tags
        .find_all()?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if data.tag_ids.iter().any(|id| !known.contains(id)) {
        errors.add("tag_ids", "Selected tag no longer exists");
    }
    Ok(())
}

fn render_form(
    state: &AppState,
    user: &User,
    post_id: Option<i64>,
    post: &PostData,
    published_at: &str,
    errors: &ValidationErrors,
) -> AppResult<Response> {
    let categories: Vec<serde_json::Value> = state
        .repos
        .posts
        .category_key_pairs()?
        .into_iter()
        .map(|(id, name)| serde_json::json!({ "id": id, "name": name }))
        .collect();
    let tags = state.repos.tags.find_all()?;

    let mut ctx = make_admin_context(state, user);
    ctx.insert("is_new", &post_id.is_none());
    ctx.insert("post_id", &post_id);
    ctx.insert("post", post);
    ctx.insert("published_at_input", published_at);
    ctx.insert("categories", &categories);
    ctx.insert("tags", &tags);
    ctx.insert("errors", errors);
    render(state, "admin/posts/form.html", &ctx)
}

fn render_index(state: &AppState, user: &User, page: i64) -> AppResult<Response> {
    let pagination = Pagination::new(page, state.config.content.posts_per_page);
    let total = state.repos.posts.count()?;
    let posts = state.repos.posts.find_page(&pagination)?;

    let mut ctx = make_admin_context(state, user);
    ctx.insert("posts", &posts);
    ctx.insert("page_info", &PageInfo::new(&pagination, total));
    render(state, "admin/posts/index.html", &ctx)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_index(&state, &user, 1)
}

pub async fn index_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(page): Path<i64>,
) -> AppResult<Response> {
    render_index(&state, &user, page)
}

pub async fn view(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = state.repos.posts.find_one_by_id(id)?.ok_or(AppError::NotFound)?;
    let tags = state.repos.tags.find_for_post(post.id)?;
    let author = match post.data.author_id {
        Some(author_id) => state
            .repos
            .users
            .find_one_by_id(author_id)?
            .map(|author| UserSummary::from(&author)),
        None => None,
    };

    let mut ctx = make_admin_context(&state, &user);
    ctx.insert("post", &post);
    ctx.insert("tags", &tags);
    ctx.insert("author", &author);
    render(&state, "admin/posts/view.html", &ctx)
}

pub async fn new_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_form(
        &state,
        &user,
        None,
        &PostData::default(),
        "",
        &ValidationErrors::new(),
    )
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let published_at = form.published_at.clone();
    let (data, parse_errors) = form.into_data(Some(user.id));

    let mut errors = ValidationErrors::new();
    if !state.repos.posts.check_slug_availability(&data.slug)? {
        errors.add("slug", "Slug already used");
    }
    errors.merge(data.validate());
    errors.merge(parse_errors);
    check_tags_exist(&state, &data, &mut errors)?;

    if !errors.is_empty() {
        return render_form(&state, &user, None, &data, &published_at, &errors);
    }

    let post = state.repos.posts.create(&data)?;
    Ok(Redirect::to(&format!("/admin/posts/{}", post.id)).into_response())
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = state.repos.posts.find_one_by_id(id)?.ok_or(AppError::NotFound)?;
    render_form(
        &state,
        &user,
        Some(post.id),
        &post.data,
        &published_at_input(&post.data),
        &ValidationErrors::new(),
    )
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let current = state.repos.posts.find_one_by_id(id)?.ok_or(AppError::NotFound)?;
    let published_at = form.published_at.clone();
    let (data, parse_errors) = form.into_data(current.data.author_id);

    let mut errors = ValidationErrors::new();
    if data.slug != current.data.slug && !state.repos.posts.check_slug_availability(&data.slug)? {
        errors.add("slug", "Slug already used");
    }
    errors.merge(data.validate());
    errors.merge(parse_errors);
    check_tags_exist(&state, &data, &mut errors)?;

    if !errors.is_empty() {
        return render_form(&state, &user, Some(id), &data, &published_at, &errors);
    }

    let post = Post { data, ..current };
    if !state.repos.posts.update_with_tags(&post)? {
        return Err(AppError::NotFound);
    }

    Ok(Redirect::to(&format!("/admin/posts/{}", post.id)).into_response())
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    if !state.repos.posts.delete_one_by_id(id)? {
        tracing::debug!(post_id = id, "Delete requested for missing post");
    }
    Ok(Redirect::to("/admin/posts").into_response())
}
