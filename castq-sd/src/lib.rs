//! castq-sd library - live commentary broadcast scheduler daemon
//!
//! Polls a remote commentary source, merges new events into a single play
//! queue under a priority policy, drives a single-active playback state
//! machine and exposes an HTTP command surface plus an SSE event feed.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use castq_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod scheduler;
pub mod source;

pub use error::{Error, Result};

/// Largest accepted manual media upload
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application context shared across HTTP handlers
#[derive(Clone)]
pub struct AppContext {
    /// Handle to the scheduler owner task
    pub scheduler: scheduler::SchedulerHandle,
    /// Client used for operator chat requests
    pub client: source::EventSourceClient,
    /// Event bus feeding the SSE stream
    pub bus: EventBus,
    /// Where manually injected media is written and served from
    pub media: media::MediaStore,
}

/// Build application router
pub fn build_router(ctx: AppContext) -> Router {
    use axum::routing::{delete, get, post};

    let media_files = ServeDir::new(ctx.media.dir());

    Router::new()
        // Queue and status
        .route("/queue", get(api::get_queue))
        .route("/status", get(api::get_status))

        // Playback control
        .route("/playback/skip", post(api::skip))
        .route("/playback/stop", post(api::stop))
        .route("/playback/complete", post(api::complete))
        .route("/playback/play/:id", post(api::play_item))
        .route("/playback/stop/:id", post(api::stop_item))

        // Queue editing
        .route("/queue/:id", delete(api::remove_item))
        .route("/queue/clear", post(api::clear_queue))
        .route("/queue/reorder", post(api::reorder_queue))

        // Injection
        .route(
            "/inject/manual",
            post(api::inject_manual).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/inject/chat", post(api::inject_chat))

        // Session and settings
        .route("/settings", post(api::update_settings))
        .route("/session/context", post(api::reset_context))
        .route("/session/stats", post(api::set_stats))
        .route("/match/clock", post(api::set_match_clock))

        // SSE event stream
        .route("/events", get(api::event_stream))

        .merge(api::health_routes())
        .nest_service(media::MEDIA_ROUTE, media_files)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
