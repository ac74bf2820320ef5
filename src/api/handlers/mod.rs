pub mod archive;
pub mod rooms;
pub mod users;
pub mod webhook;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock, AppState};
use crate::users::types::WalletAddress;

/// `?walletAddress=` query string shared by the wallet lookups.
#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    #[serde(rename = "walletAddress")]
    pub wallet_address: Option<String>,
}

/// `None` for absent or blank values.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) fn parse_wallet(raw: &str) -> ApiResult<WalletAddress> {
    raw.parse().map_err(ApiError::BadRequest)
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let sessions = lock(&state.sessions)?.session_count();
    Ok(Json(json!({ "status": "ok", "sessions": sessions })))
}
