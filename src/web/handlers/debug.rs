use crate::web::error::{AppError, AppResult};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct LoggedQuery {
    sql: String,
    elapsed_ms: f64,
    params: Vec<String>,
}

/// Recent statements recorded by the query log, oldest first.
pub async fn queries(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Response> {
    let log = state.query_log.as_ref().ok_or(AppError::NotFound)?;
    let entries: Vec<LoggedQuery> = log
        .entries()
        .into_iter()
        .map(|record| LoggedQuery {
            elapsed_ms: record.elapsed_ms(),
            sql: record.sql,
            params: record.params,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "capacity": log.capacity(),
        "queries": entries,
    }))
    .into_response())
}
