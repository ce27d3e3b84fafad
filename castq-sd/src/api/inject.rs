//! Manual media and chat injection
//!
//! Manual media is written to the media directory under a fresh id and served
//! back from `/media/<id>.<ext>` until its item leaves the queue. Chat
//! messages are forwarded to the commentary source; its reply is queued
//! directly after the active item.

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use castq_common::{ItemOrigin, Payload, QueueItem};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scheduler::UserCommand;
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct ManualInjectParams {
    #[serde(default)]
    pub label: Option<String>,
    /// Original file name; only its extension is kept
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InjectResponse {
    pub item_id: String,
    pub items: Vec<QueueItem>,
}

#[derive(Debug, Deserialize)]
pub struct ChatInjectRequest {
    pub message: String,
    #[serde(default)]
    pub match_summary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatInjectResponse {
    pub accepted: usize,
    pub items: Vec<QueueItem>,
}

/// POST /inject/manual?label=&filename= - raw body is the media blob
pub async fn inject_manual(
    State(ctx): State<AppContext>,
    Query(params): Query<ManualInjectParams>,
    body: Bytes,
) -> Result<Json<InjectResponse>> {
    if body.is_empty() {
        return Err(Error::BadRequest("media body is empty".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let media_url = ctx
        .media
        .store(&id, params.filename.as_deref(), &body)
        .await?;

    let label = params
        .label
        .filter(|l| !l.trim().is_empty())
        .or(params.filename)
        .unwrap_or_else(|| "Manual clip".to_string());

    info!(item_id = %id, bytes = body.len(), media_url = %media_url, "Stored manual media");

    let item = QueueItem::new(id.clone(), ItemOrigin::Manual, label, Payload::media(media_url.clone()));
    let items = match ctx.scheduler.execute(UserCommand::InjectManual(item)).await {
        Ok(items) => items,
        Err(e) => {
            ctx.media.remove(&media_url).await;
            return Err(e);
        }
    };

    Ok(Json(InjectResponse { item_id: id, items }))
}

/// POST /inject/chat - ask the source to answer an operator message
///
/// Fails with 502 when the source request fails; the queue and connectivity
/// state are unchanged in that case.
pub async fn inject_chat(
    State(ctx): State<AppContext>,
    Json(request): Json<ChatInjectRequest>,
) -> Result<Json<ChatInjectResponse>> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(Error::BadRequest("message must not be empty".to_string()));
    }

    let accepted = ctx
        .scheduler
        .chat(&ctx.client, message, request.match_summary)
        .await?;
    let items = ctx.scheduler.queue().await?;

    Ok(Json(ChatInjectResponse { accepted, items }))
}
