use crate::address::{MessageKey, string_to_internal};
use crate::error::Result;
use crate::http::{AppState, run_store};
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let chats = run_store(state.session.store(), |s| s.get_chats()).await?;
    let chats: Vec<_> = chats
        .into_iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "isGroup": c.is_group,
                "unreadCount": c.unread_count,
                "lastMessage": c.last_message,
                "lastMessageTimestamp": c.last_message_timestamp,
                "messageCount": c.message_count,
            })
        })
        .collect();
    Ok(Json(json!({ "chats": chats })))
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub before: Option<i64>,
}

pub async fn messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>> {
    let chat_internal = string_to_internal(&id);
    let limit = query.limit.unwrap_or(50);
    let messages = run_store(state.session.store(), move |s| s.get_messages(&chat_internal, limit, query.before)).await?;

    let empty = messages.is_empty();
    let messages: Vec<_> = messages
        .into_iter()
        .map(|m| {
            json!({
                "id": m.id,
                "chatId": crate::address::string_to_api(&m.chat_address),
                "senderAddress": m.sender_address,
                "senderName": m.sender_name,
                "fromMe": m.from_me,
                "body": m.body,
                "timestamp": m.timestamp,
                "hasMedia": m.has_media,
                "mediaKind": m.media_kind,
            })
        })
        .collect();

    Ok(Json(json!({ "messages": messages, "fromCache": true, "empty": empty })))
}

pub async fn mark_read(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let chat_internal = string_to_internal(&id);
    run_store(state.session.store(), {
        let chat_internal = chat_internal.clone();
        move |s| s.mark_read(&chat_internal)
    })
    .await?;

    let latest = run_store(state.session.store(), {
        let chat_internal = chat_internal.clone();
        move |s| s.get_messages(&chat_internal, 1, None)
    })
    .await?;

    if let Some(latest) = latest.into_iter().next() {
        if let Ok(handle) = state.session.handle() {
            let key = MessageKey::parse(&latest.id)?;
            let sender = chat_internal
                .ends_with("@g.us")
                .then(|| latest.sender_address.clone())
                .filter(|s| !s.is_empty());
            if let Err(e) = handle.mark_read(&chat_internal, sender.as_deref(), vec![key.raw_id]).await {
                tracing::warn!(chat = %id, error = %e, "remote read receipt failed");
            }
        }
    }

    Ok(Json(json!({ "success": true })))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let chat_internal = string_to_internal(&id);
    run_store(state.session.store(), move |s| s.delete_chat(&chat_internal)).await?;
    Ok(Json(json!({ "success": true })))
}
