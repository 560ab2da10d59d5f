use super::handlers;
use super::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::home))
        .route("/admin", get(handlers::home))
        .route(
            "/admin/posts",
            get(handlers::posts::index).post(handlers::posts::create),
        )
        .route("/admin/posts/page/:page", get(handlers::posts::index_page))
        .route("/admin/posts/new", get(handlers::posts::new_form))
        .route(
            "/admin/posts/:id",
            get(handlers::posts::view).post(handlers::posts::update),
        )
        .route("/admin/posts/:id/edit", get(handlers::posts::edit_form))
        .route("/admin/posts/:id/delete", post(handlers::posts::delete))
        .route(
            "/admin/categories",
            get(handlers::categories::index).post(handlers::categories::create),
        )
        .route(
            "/admin/categories/page/:page",
            get(handlers::categories::index_page),
        )
        .route("/admin/categories/new", get(handlers::categories::new_form))
        .route("/admin/categories/:id", post(handlers::categories::update))
        .route(
            "/admin/categories/:id/edit",
            get(handlers::categories::edit_form),
        )
        .route(
            "/admin/categories/:id/delete",
            post(handlers::categories::delete),
        )
        .route(
            "/admin/tags",
            get(handlers::tags::index).post(handlers::tags::create),
        )
        .route("/admin/tags/new", get(handlers::tags::new_form))
        .route("/admin/tags/:id", post(handlers::tags::update))
        .route("/admin/tags/:id/edit", get(handlers::tags::edit_form))
        .route("/admin/tags/:id/delete", post(handlers::tags::delete))
        .route(
            "/admin/users",
            get(handlers::users::index).post(handlers::users::create),
        )
        .route("/admin/users/new", get(handlers::users::new_form))
        .route("/admin/users/:id/delete", post(handlers::users::delete))
        .route(
            "/admin/profile",
            get(handlers::users::profile_form).post(handlers::users::update_profile),
        )
}

pub fn diagnostics_routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/debug/queries", get(handlers::debug::queries))
}
