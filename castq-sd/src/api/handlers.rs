//! HTTP request handlers
//!
//! Queue, playback, settings and session endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use castq_common::events::MatchClock;
use castq_common::QueueItem;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::scheduler::{SchedulerStatus, SettingsUpdate, UserCommand};
use crate::AppContext;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    pub items: Vec<QueueItem>,
}

impl From<Vec<QueueItem>> for QueueResponse {
    fn from(items: Vec<QueueItem>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    /// Item the presenter finished; omit to acknowledge whatever is active
    #[serde(default)]
    pub item_id: Option<String>,
}

impl CompleteRequest {
    /// Parse a completion body; blank means "no item named"
    fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| Error::BadRequest(format!("invalid completion body: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    #[serde(default)]
    pub context_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchClockRequest {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

// ============================================================================
// Queue and Status
// ============================================================================

/// GET /queue - ordered queue snapshot
pub async fn get_queue(State(ctx): State<AppContext>) -> Result<Json<QueueResponse>> {
    Ok(Json(ctx.scheduler.queue().await?.into()))
}

/// GET /status - connectivity, auto-play, session and match clock
pub async fn get_status(State(ctx): State<AppContext>) -> Result<Json<SchedulerStatus>> {
    Ok(Json(ctx.scheduler.status().await?))
}

async fn run(ctx: &AppContext, command: UserCommand) -> Result<Json<QueueResponse>> {
    Ok(Json(ctx.scheduler.execute(command).await?.into()))
}

// ============================================================================
// Playback Control
// ============================================================================

/// POST /playback/skip
pub async fn skip(State(ctx): State<AppContext>) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::Skip).await
}

/// POST /playback/stop
pub async fn stop(State(ctx): State<AppContext>) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::Stop).await
}

/// POST /playback/complete - completion report or text acknowledgement
///
/// An empty body acknowledges whatever is active. A body that is present
/// must parse as `{item_id?}`; anything else is rejected so a garbled report
/// never completes the wrong item.
pub async fn complete(State(ctx): State<AppContext>, body: Bytes) -> Result<Json<QueueResponse>> {
    let request = CompleteRequest::parse(&body)?;
    run(&ctx, UserCommand::Complete { item_id: request.item_id }).await
}

/// POST /playback/play/:id
pub async fn play_item(State(ctx): State<AppContext>, Path(id): Path<String>) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::Play(id)).await
}

/// POST /playback/stop/:id
pub async fn stop_item(State(ctx): State<AppContext>, Path(id): Path<String>) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::StopItem(id)).await
}

// ============================================================================
// Queue Editing
// ============================================================================

/// DELETE /queue/:id
pub async fn remove_item(State(ctx): State<AppContext>, Path(id): Path<String>) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::Remove(id)).await
}

/// POST /queue/clear - removes everything except the active item
pub async fn clear_queue(State(ctx): State<AppContext>) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::Clear).await
}

/// POST /queue/reorder
pub async fn reorder_queue(
    State(ctx): State<AppContext>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<QueueResponse>> {
    run(&ctx, UserCommand::Reorder(request.order)).await
}

// ============================================================================
// Settings and Session
// ============================================================================

/// POST /settings - partial settings update
pub async fn update_settings(
    State(ctx): State<AppContext>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SchedulerStatus>> {
    ctx.scheduler.execute(UserCommand::UpdateSettings(update)).await?;
    Ok(Json(ctx.scheduler.status().await?))
}

/// POST /session/context - switch broadcast context
pub async fn reset_context(
    State(ctx): State<AppContext>,
    Json(request): Json<ContextRequest>,
) -> Result<Json<SchedulerStatus>> {
    ctx.scheduler
        .execute(UserCommand::ResetContext(request.context_id))
        .await?;
    Ok(Json(ctx.scheduler.status().await?))
}

/// POST /session/stats - replace the stats snapshot sent with each poll
pub async fn set_stats(
    State(ctx): State<AppContext>,
    Json(snapshot): Json<serde_json::Value>,
) -> Result<Json<StatusResponse>> {
    ctx.scheduler.set_stats_snapshot(snapshot).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /match/clock - external match clock reading
pub async fn set_match_clock(
    State(ctx): State<AppContext>,
    Json(request): Json<MatchClockRequest>,
) -> Result<Json<MatchClock>> {
    let value = request.value.trim().to_string();
    if value.is_empty() {
        return Err(Error::BadRequest("value must not be empty".to_string()));
    }
    info!("Match clock set externally: {}", value);
    Ok(Json(ctx.scheduler.set_match_clock(value).await?))
}
