use crate::address::{MessageKey, string_to_api, string_to_internal};
use crate::content::{ProtoMessage, detect_media_mime};
use crate::error::{Error, Result};
use crate::http::{AppState, run_store};
use axum::Json;
use axum::extract::State;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Value, json};

const MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub chat_id: String,
    pub message: String,
    pub quoted_message_id: Option<String>,
}

pub async fn send(State(state): State<AppState>, Json(req): Json<SendRequest>) -> Result<Json<Value>> {
    if req.message.len() > MAX_MESSAGE_BYTES {
        return Err(Error::Invalid("message exceeds 64 KiB".to_string()));
    }
    let handle = state.session.ready_handle().await?;
    let chat_internal = string_to_internal(&req.chat_id);
    let quoted_raw_id = req
        .quoted_message_id
        .as_deref()
        .map(MessageKey::parse)
        .transpose()?
        .map(|k| k.raw_id);

    let raw_id = handle.send_text(&chat_internal, &req.message, quoted_raw_id.as_deref()).await?;
    let message_id = MessageKey::new(true, string_to_api(&chat_internal), raw_id).format();
    Ok(Json(json!({ "success": true, "messageId": message_id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendImageRequest {
    pub chat_id: String,
    pub base64: String,
    pub caption: Option<String>,
}

pub async fn send_image(State(state): State<AppState>, Json(req): Json<SendImageRequest>) -> Result<Json<Value>> {
    let handle = state.session.ready_handle().await?;
    let image = base64::engine::general_purpose::STANDARD
        .decode(req.base64)
        .map_err(|e| Error::Invalid(format!("invalid base64: {e}")))?;
    let chat_internal = string_to_internal(&req.chat_id);

    let raw_id = handle.send_image(&chat_internal, &image, req.caption.as_deref()).await?;
    let message_id = MessageKey::new(true, string_to_api(&chat_internal), raw_id).format();
    Ok(Json(json!({ "success": true, "messageId": message_id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub message_id: String,
    pub emoji: String,
}

pub async fn react(State(state): State<AppState>, Json(req): Json<ReactRequest>) -> Result<Json<Value>> {
    let handle = state.session.ready_handle().await?;
    let key = MessageKey::parse(&req.message_id)?;
    let chat_internal = string_to_internal(&key.chat_api);
    handle.send_reaction(&chat_internal, &key.raw_id, key.from_me, &req.emoji).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMediaRequest {
    pub message_id: String,
}

pub async fn download_media(State(state): State<AppState>, Json(req): Json<DownloadMediaRequest>) -> Result<Json<Value>> {
    let handle = state.session.ready_handle().await?;
    let key = req.message_id.clone();
    let raw_encoded = run_store(state.session.store(), move |s| s.get_raw_encoded(&key)).await?;

    let decoded: waproto::whatsapp::Message = prost::Message::decode(raw_encoded.as_slice())
        .map_err(|e| Error::Invalid(format!("corrupt stored message: {e}")))?;
    let mime = detect_media_mime(&ProtoMessage::from_wire(&decoded));

    let bytes = handle.download_raw(&raw_encoded).await?;
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(Json(json!({ "data": data, "mimetype": mime })))
}

#[derive(Debug, Deserialize)]
pub struct ResolveNumberRequest {
    pub number: String,
}

pub async fn resolve_number(State(state): State<AppState>, Json(req): Json<ResolveNumberRequest>) -> Result<Json<Value>> {
    let handle = state.session.ready_handle().await?;
    match handle.resolve_number(&req.number).await? {
        Some(jid) => Ok(Json(json!({ "chatId": string_to_api(&jid) }))),
        None => Err(Error::NotFound(format!("{} is not on WhatsApp", req.number))),
    }
}
