use crate::error::Result;
use crate::http::{AppState, run_store};
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

const DEFAULT_SEARCH_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<Json<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = run_store(state.session.store(), move |s| s.search_messages(&query.q, limit)).await?;

    let count = results.len();
    let results: Vec<_> = results
        .into_iter()
        .map(|r| {
            json!({
                "messageId": r.message_id,
                "chatId": r.chat_jid(),
                "chatName": r.chat_name,
                "senderName": r.sender_name,
                "body": r.body,
                "timestamp": r.timestamp,
            })
        })
        .collect();

    Ok(Json(json!({ "results": results, "count": count })))
}
