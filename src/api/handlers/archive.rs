//! Conversation archive upload, CID listing, and export.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_wallet, present, WalletQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::archive::conversations_file_name;
use crate::db::with_conn;
use crate::users::store;

#[derive(Debug, Deserialize)]
pub struct UpdateIpnsRequest {
    pub uid: Option<String>,
    pub conversations: Option<Value>,
}

/// `null` and `""` count as absent. An empty array is a valid (empty) export.
fn is_blank(value: &Value) -> bool {
    value.is_null() || value.as_str() == Some("")
}

fn upload_failed(details: &anyhow::Error) -> Response {
    tracing::error!(error = %details, "conversation upload failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to upload",
            "details": format!("{details:#}"),
        })),
    )
        .into_response()
}

/// Pin a conversation export and record its CID on the user.
pub async fn update_ipns(
    State(state): State<AppState>,
    Json(req): Json<UpdateIpnsRequest>,
) -> ApiResult<Response> {
    let (Some(uid), Some(conversations)) = (
        present(req.uid),
        req.conversations.filter(|c| !is_blank(c)),
    ) else {
        return Err(ApiError::BadRequest("Missing required fields".into()));
    };

    tracing::info!(uid = %uid, "processing conversation upload");

    let cid = match state
        .archive
        .upload(&conversations_file_name(&uid), &conversations)
        .await
    {
        Ok(cid) => cid,
        Err(e) => return Ok(upload_failed(&e)),
    };

    let stored = cid.clone();
    if let Err(e) = with_conn(&state.db, move |conn| {
        store::push_conversation_cid(conn, &uid, &stored)
    })
    .await
    {
        return Ok(upload_failed(&e));
    }

    let url = state.archive.url_for(&cid);
    Ok(Json(json!({ "success": true, "cid": cid, "url": url })).into_response())
}

pub async fn get_cids(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> ApiResult<Json<Value>> {
    let raw = present(query.wallet_address)
        .ok_or_else(|| ApiError::BadRequest("Wallet address is required".into()))?;
    let wallet = parse_wallet(&raw)?;

    let cids = with_conn(&state.db, move |conn| store::cids_for_wallet(conn, &wallet))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    tracing::debug!(count = cids.len(), "found CIDs for user");
    Ok(Json(json!({ "cids": cids })))
}

#[derive(Debug, Serialize)]
pub struct ExportedConversation {
    pub cid: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fetch every archived conversation of a user back from storage.
///
/// Individual fetch failures are reported per entry rather than failing the
/// whole export.
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> ApiResult<Json<Value>> {
    let raw = present(query.wallet_address)
        .ok_or_else(|| ApiError::BadRequest("Wallet address is required".into()))?;
    let wallet = parse_wallet(&raw)?;

    let lookup = wallet.clone();
    let cids = with_conn(&state.db, move |conn| store::cids_for_wallet(conn, &lookup))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let mut conversations = Vec::with_capacity(cids.len());
    for cid in cids {
        let url = state.archive.url_for(&cid);
        let entry = match state.archive.fetch(&cid).await {
            Ok(content) => ExportedConversation {
                cid,
                url,
                content: Some(content),
                error: None,
            },
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "failed to fetch archived conversation");
                ExportedConversation {
                    cid,
                    url,
                    content: None,
                    error: Some(format!("{e:#}")),
                }
            }
        };
        conversations.push(entry);
    }

    Ok(Json(json!({
        "wallet_address": wallet,
        "conversations": conversations,
    })))
}
