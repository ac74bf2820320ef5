//! Voice-assistant transcript webhook.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::present;
use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock, AppState};
use crate::transcript::recent::RecentPayload;
use crate::transcript::types::TranscriptPayload;

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub uid: Option<String>,
}

/// Buffer the payload's segments and process every batch that fills up.
pub async fn receive(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    Json(payload): Json<TranscriptPayload>,
) -> ApiResult<Json<Value>> {
    let uid = present(query.uid).ok_or_else(|| ApiError::BadRequest("uid is required".into()))?;

    tracing::info!(
        uid = %uid,
        session_id = %payload.session_id,
        segments = payload.segments.len(),
        "transcript received"
    );

    lock(&state.recent)?.push(RecentPayload {
        uid: Some(uid.clone()),
        session_id: payload.session_id.clone(),
        segments: payload.segments.clone(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    });

    let ingested = lock(&state.sessions)?.ingest(&uid, &payload.session_id, payload.segments);

    let mut outcomes = Vec::with_capacity(ingested.batches.len());
    for batch in &ingested.batches {
        outcomes.push(state.pipeline.process(batch).await);
    }

    Ok(Json(json!({
        "status": "success",
        "flushed": outcomes.len(),
        "batches": outcomes,
    })))
}

/// Recently received payloads, oldest first.
pub async fn recent(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let snapshot = lock(&state.recent)?.snapshot();
    Ok(Json(json!(snapshot)))
}
