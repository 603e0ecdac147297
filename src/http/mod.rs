//! HTTP surface (ambient component, §6.1). One axum router, one handler
//! module per resource family, a shared `AppState`, and an API-key auth
//! middleware gating every route but `/health`.

mod auth;
mod handlers;

use crate::error::Result;
use crate::history_sync::HistorySyncController;
use crate::session::SessionManager;
use crate::store::Store;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use std::sync::Arc;

/// Runs a blocking store call off the async runtime, matching §5's
/// "every database call is a suspension point" for the HTTP layer.
pub(crate) async fn run_store<T, F>(store: Arc<Store>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store)).await?
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub history_sync: Arc<HistorySyncController>,
    pub api_key: Arc<str>,
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/status", get(handlers::status::status))
        .route("/qr", get(handlers::status::qr))
        .route("/contacts", get(handlers::contacts::list))
        .route("/chats", get(handlers::chats::list))
        .route("/chats/{id}/messages", get(handlers::chats::messages))
        .route("/chats/{id}", delete(handlers::chats::delete))
        .route("/mark-read/{id}", post(handlers::chats::mark_read))
        .route("/send", post(handlers::messages::send))
        .route("/send-image", post(handlers::messages::send_image))
        .route("/react", post(handlers::messages::react))
        .route("/download-media", post(handlers::messages::download_media))
        .route("/resolve-number", post(handlers::messages::resolve_number))
        .route("/sync-history", post(handlers::sync::sync_history))
        .route("/sync-all", post(handlers::sync::sync_all))
        .route("/deep-sync", post(handlers::sync::start_deep_sync).get(handlers::sync::deep_sync_progress))
        .route("/search", get(handlers::search::search))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    Router::new()
        .route("/health", get(handlers::status::health))
        .merge(protected)
        .with_state(state)
}
