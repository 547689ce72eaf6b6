use std::{future::Future, sync::Arc, time::Instant};

use anyhow::{Context as _, Result};
use axum::{
    Json, Router,
    extract::OriginalUri,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::db::DbHandle;
use crate::ticket::TicketTracker;

pub mod api;
pub mod dashboard;

/// Shared by every request handler.
pub struct AppState {
    pub db: DbHandle,
    pub tracker: Arc<TicketTracker>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: DbHandle, tracker: Arc<TicketTracker>) -> Self {
        Self {
            db,
            tracker,
            started_at: Instant::now(),
        }
    }
}

/// A store failure surfaced as a 500 response.
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Dashboard request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Internal server error",
                "message": format!("{:#}", self.0),
            })),
        )
            .into_response()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(dashboard::index))
        .route("/health", get(api::health))
        .route("/api", get(api::info))
        .route("/api/tickets", get(api::list_tickets))
        .route("/api/tickets/{id}", get(api::get_ticket))
        .route("/api/stats", get(api::stats))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Route not found",
            "path": uri.path(),
        })),
    )
}

/// Serves the dashboard until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read dashboard address")?;
    info!("Dashboard listening on http://{addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Dashboard server error")?;

    info!("Dashboard server stopped");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt as _;
    use tower::ServiceExt as _;

    use super::*;

    pub async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    pub async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = get(state, uri).await;
        (status, serde_json::from_str(&body).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::Retention;
    use crate::db::{spawn_test_db, store::test_options};

    #[tokio::test]
    async fn unknown_routes_report_their_path() {
        let dir = TempDir::new().unwrap();
        let db = spawn_test_db(test_options(dir.path(), Retention::Unbounded)).await;
        let state = Arc::new(AppState::new(db.clone(), Arc::new(TicketTracker::new(db))));

        let (status, body) = test_util::get_json(state, "/api/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Route not found");
        assert_eq!(body["path"], "/api/nope");
    }
}
