use crate::error::Result;
use crate::http::AppState;
use crate::qr;
use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "timestamp": chrono::Utc::now().timestamp() }))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let status = state.session.status().await;
    Json(json!({
        "status": status.state.as_str(),
        "ready": status.state == crate::session::ConnectionState::Ready,
        "lastConnectedAt": status.last_connected_at,
        "lastDisconnectedAt": status.last_disconnected_at,
        "offlineGapSecs": status.offline_gap_secs(),
    }))
}

pub async fn qr(State(state): State<AppState>) -> Result<Json<Value>> {
    let status = state.session.status().await;
    match status.qr_code {
        Some(code) => {
            let data_url = qr::code_to_data_url(&code)?;
            Ok(Json(json!({ "qr": data_url })))
        }
        None => Ok(Json(json!({ "message": "no pairing code pending" }))),
    }
}
