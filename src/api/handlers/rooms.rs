//! Tag chat rooms. A wallet may read and post only in rooms for tags it holds.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_wallet, present};
use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock, AppState};
use crate::chat::rooms::{validate_text, Room};
use crate::chat::{room_topic, ChatMessage};
use crate::db::with_conn;
use crate::users::store;
use crate::users::types::{Tag, WalletAddress};

const DEFAULT_READ_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "walletAddress")]
    pub wallet_address: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub text: String,
}

fn required_wallet(raw: Option<String>) -> ApiResult<WalletAddress> {
    let raw =
        present(raw).ok_or_else(|| ApiError::BadRequest("Wallet address is required".into()))?;
    parse_wallet(&raw)
}

fn parse_room(raw: &str) -> ApiResult<Tag> {
    raw.parse().map_err(ApiError::BadRequest)
}

/// `None` when no user holds `wallet`.
async fn wallet_tags(state: &AppState, wallet: &WalletAddress) -> ApiResult<Option<Vec<Tag>>> {
    let wallet = wallet.clone();
    Ok(with_conn(&state.db, move |conn| store::tags_for_wallet(conn, &wallet)).await?)
}

/// A wallet without a user record holds no tags, so it is a non-member too.
async fn require_member(state: &AppState, wallet: &WalletAddress, room: Tag) -> ApiResult<()> {
    let tags = wallet_tags(state, wallet).await?.unwrap_or_default();
    if tags.contains(&room) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("not a member of room {room}")))
    }
}

/// Rooms the wallet belongs to, with member counts.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> ApiResult<Json<Value>> {
    let wallet = required_wallet(query.wallet_address)?;
    let tags = wallet_tags(&state, &wallet)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let prefix = state.config.chat.topic_prefix.clone();
    let rooms = with_conn(&state.db, move |conn| {
        tags.into_iter()
            .map(|tag| {
                Ok(Room {
                    tag,
                    topic: room_topic(&prefix, tag),
                    members: store::members_with_tag(&*conn, tag)?.len(),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(json!({ "rooms": rooms })))
}

/// Pull new payloads from the relay into the room history, then return the tail.
///
/// A relay outage degrades to serving the history already held.
pub async fn read(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(query): Query<RoomQuery>,
) -> ApiResult<Json<Value>> {
    let room = parse_room(&room)?;
    let wallet = required_wallet(query.wallet_address)?;
    require_member(&state, &wallet, room).await?;

    let topic = room_topic(&state.config.chat.topic_prefix, room);
    match state.chat.fetch(&topic).await {
        Ok(payloads) => {
            let added = lock(&state.rooms)?.absorb(room, &payloads);
            tracing::debug!(room = %room, added, "room history refreshed");
        }
        Err(e) => tracing::warn!(room = %room, error = %e, "relay fetch failed; serving cached history"),
    }

    let limit = query.limit.unwrap_or(DEFAULT_READ_LIMIT);
    let messages = lock(&state.rooms)?.recent(room, limit);
    Ok(Json(json!({ "room": room, "topic": topic, "messages": messages })))
}

pub async fn post(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<PostRequest>,
) -> ApiResult<Json<Value>> {
    let room = parse_room(&room)?;
    let wallet = required_wallet(req.wallet_address)?;
    let text = validate_text(&req.text).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_member(&state, &wallet, room).await?;

    let message = ChatMessage::new(room, wallet.as_str(), text);
    let payload = message.encode()?;
    let topic = room_topic(&state.config.chat.topic_prefix, room);

    state
        .chat
        .publish(&topic, &payload)
        .await
        .map_err(|e| ApiError::Upstream(format!("failed to publish message: {e:#}")))?;

    lock(&state.rooms)?.absorb(room, &[payload]);
    tracing::info!(room = %room, id = %message.id, "message published");

    Ok(Json(json!({ "success": true, "message": message })))
}
