use crate::error::Result;
use crate::http::{AppState, run_store};
use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let contacts = run_store(state.session.store(), |s| s.get_contacts()).await?;
    let contacts: Vec<_> = contacts
        .into_iter()
        .map(|c| json!({ "id": c.id, "name": c.name, "number": c.number, "isGroup": c.is_group }))
        .collect();
    Ok(Json(json!({ "contacts": contacts })))
}
