mod error;
mod extractors;
mod handlers;
mod routes;
pub mod security;
mod state;

pub use error::{AppError, AppResult};
pub use extractors::CurrentUser;
pub use handlers::posts::parse_published_at;
pub use state::{AppState, Repositories};

use crate::{Config, Database};
use anyhow::Result;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// The admin router with its middleware stack applied.
pub fn app(state: Arc<AppState>) -> Router {
    let mut router = routes::admin_routes();
    if state.query_log.is_some() {
        router = router.merge(routes::diagnostics_routes());
    }

    router
        .layer(middleware::from_fn(security::apply_security_headers))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config, db: Database, addr: &str) -> Result<()> {
    let state = Arc::new(AppState::from_database(config, db)?);
    let app = app(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Admin listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
