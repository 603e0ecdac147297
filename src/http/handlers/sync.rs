use crate::address::string_to_internal;
use crate::error::Result;
use crate::history_sync::{self, request_history};
use crate::http::{AppState, run_store};
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const SYNC_ALL_DEADLINE: Duration = Duration::from_secs(120);
const DEFAULT_BACKFILL_COUNT: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryRequest {
    pub chat_id: String,
    pub count: Option<u32>,
}

pub async fn sync_history(State(state): State<AppState>, Json(req): Json<SyncHistoryRequest>) -> Result<Json<Value>> {
    let count = req.count.unwrap_or(DEFAULT_BACKFILL_COUNT);
    request_history(&state.session, &req.chat_id, count).await?;

    let chat_internal = string_to_internal(&req.chat_id);
    let current_count = run_store(state.session.store(), move |s| s.message_count(&chat_internal)).await?;

    Ok(Json(json!({
        "success": true,
        "requested": count,
        "currentCount": current_count,
        "note": "history request sent; the remote peer may silently ignore it",
    })))
}

#[derive(Debug, Deserialize)]
pub struct SyncAllQuery {
    pub count: Option<u32>,
}

pub async fn sync_all(State(state): State<AppState>, Query(query): Query<SyncAllQuery>) -> Result<Json<Value>> {
    let count = query.count.unwrap_or(DEFAULT_BACKFILL_COUNT);
    let chats = run_store(state.session.store(), |s| s.get_chats()).await?;

    let fut = async {
        let mut results = Vec::new();
        for chat in &chats {
            let outcome = request_history(&state.session, &chat.id, count).await;
            results.push(json!({ "chatId": chat.id, "success": outcome.is_ok() }));
        }
        results
    };
    let results = tokio::time::timeout(SYNC_ALL_DEADLINE, fut).await.unwrap_or_default();

    Ok(Json(json!({
        "success": true,
        "chatsCount": chats.len(),
        "requested": count,
        "results": results,
    })))
}

pub async fn start_deep_sync(State(state): State<AppState>) -> Result<Json<Value>> {
    state.history_sync.deep_sync()?;
    Ok(Json(json!({ "success": true, "message": "deep sync started" })))
}

pub async fn deep_sync_progress(State(state): State<AppState>) -> Json<history_sync::DeepSyncProgress> {
    Json(state.history_sync.progress_snapshot().await)
}
