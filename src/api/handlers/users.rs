//! Registration, setup status, and interest tags.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_wallet, present, WalletQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::db::with_conn;
use crate::users::store::{self, StoreError};
use crate::users::types::{parse_tags, WalletAddress};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub wallet_address: Option<String>,
    pub uid: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(wallet), Some(uid)) = (present(req.wallet_address), present(req.uid)) else {
        return Err(ApiError::BadRequest(
            "Wallet address and UID are required".into(),
        ));
    };
    let wallet = parse_wallet(&wallet)?;

    tracing::info!(uid = %uid, wallet = %wallet, "registering user");

    with_conn(&state.db, move |conn| store::register(conn, &uid, &wallet))
        .await
        .map_err(|e| {
            if let Some(StoreError::WalletConflict { .. }) = e.downcast_ref::<StoreError>() {
                return ApiError::Conflict(e.to_string());
            }
            ApiError::from(e)
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "User registered successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct UidQuery {
    pub uid: Option<String>,
}

pub async fn setup_completed(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> (StatusCode, Json<Value>) {
    let Some(uid) = present(query.uid) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "is_setup_completed": false, "error": "UID is required" })),
        );
    };

    match with_conn(&state.db, move |conn| store::is_setup_completed(conn, &uid)).await {
        Ok(done) => (StatusCode::OK, Json(json!({ "is_setup_completed": done }))),
        Err(e) => {
            tracing::error!(error = %e, "setup completed check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "is_setup_completed": false,
                    "error": "Failed to check setup status",
                })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagsRequest {
    pub uid: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn update_tags(
    State(state): State<AppState>,
    Json(req): Json<UpdateTagsRequest>,
) -> ApiResult<Json<Value>> {
    let uid = present(req.uid).ok_or_else(|| ApiError::BadRequest("UID is required".into()))?;
    let tags = parse_tags(&req.tags).map_err(ApiError::BadRequest)?;

    tracing::info!(uid = %uid, tags = ?tags, "updating tags");

    let user = with_conn(&state.db, move |conn| store::add_tags(conn, &uid, &tags)).await?;

    Ok(Json(json!({ "success": true, "user": user })))
}

/// Never fails: unknown wallets and store errors read as "no tags".
pub async fn get_tags(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> Json<Value> {
    let Some(wallet) = present(query.wallet_address).and_then(|w| w.parse::<WalletAddress>().ok()) else {
        return Json(json!({ "tags": [] }));
    };

    tracing::debug!(wallet = %wallet, "fetching tags");

    let tags = match with_conn(&state.db, move |conn| store::tags_for_wallet(conn, &wallet)).await {
        Ok(tags) => tags.unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, "tag lookup failed");
            Vec::new()
        }
    };
    Json(json!({ "tags": tags }))
}
