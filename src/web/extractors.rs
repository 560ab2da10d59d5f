use crate::models::User;
use crate::services::auth::decode_basic_credentials;
use crate::web::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The admin acting on this request, authenticated from HTTP Basic credentials.
pub struct CurrentUser(pub User);

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"blog-admin\"")],
        "Unauthorized",
    )
        .into_response()
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Box::pin(async move {
            let (username, password) = authorization
                .as_deref()
                .and_then(decode_basic_credentials)
                .ok_or_else(unauthorized)?;

            match state.repos.users.authenticate(&username, &password) {
                Ok(Some(user)) => Ok(CurrentUser(user)),
                Ok(None) => {
                    tracing::warn!(username = %username, "Rejected admin credentials");
                    Err(unauthorized())
                }
                Err(e) => {
                    tracing::error!("Authentication lookup failed: {}", e);
                    Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
                }
            }
        })
    }
}
