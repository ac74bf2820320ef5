//! HTTP API: shared state, router, and request handlers.
//!
//! [`router`] wires every route onto an [`AppState`]. Handlers do their
//! database work through [`crate::db::with_conn`] and report failures as
//! [`error::ApiError`].

pub mod error;
pub mod handlers;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::archive::ArchiveStore;
use crate::chat::rooms::RoomHistory;
use crate::chat::ChatTransport;
use crate::classifier::TagClassifier;
use crate::config::FriendCircleConfig;
use crate::db::SharedConnection;
use crate::transcript::buffer::SessionBuffer;
use crate::transcript::pipeline::Pipeline;
use crate::transcript::recent::RecentWebhooks;
use error::ApiError;

/// Everything a handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedConnection,
    pub sessions: Arc<Mutex<SessionBuffer>>,
    pub recent: Arc<Mutex<RecentWebhooks>>,
    pub rooms: Arc<Mutex<RoomHistory>>,
    pub pipeline: Pipeline,
    pub archive: Arc<dyn ArchiveStore>,
    pub chat: Arc<dyn ChatTransport>,
    pub config: Arc<FriendCircleConfig>,
}

impl AppState {
    pub fn new(
        db: SharedConnection,
        classifier: Arc<dyn TagClassifier>,
        archive: Arc<dyn ArchiveStore>,
        chat: Arc<dyn ChatTransport>,
        config: Arc<FriendCircleConfig>,
    ) -> Self {
        let webhook = &config.webhook;
        Self {
            sessions: Arc::new(Mutex::new(SessionBuffer::new(
                webhook.batch_size,
                webhook.max_sessions,
            ))),
            recent: Arc::new(Mutex::new(RecentWebhooks::new(webhook.recent_capacity))),
            rooms: Arc::new(Mutex::new(RoomHistory::new())),
            pipeline: Pipeline::new(db.clone(), classifier, Arc::clone(&archive)),
            db,
            archive,
            chat,
            config,
        }
    }
}

/// Lock one of the in-memory structures, mapping poisoning to a 500.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ApiError> {
    mutex
        .lock()
        .map_err(|e| ApiError::Internal(format!("state lock poisoned: {e}")))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    // The voice assistant calls the webhook cross-origin and the live view
    // polls it, so responses must never be cached.
    let webhook = Router::new()
        .route(
            "/api/webhook",
            get(handlers::webhook::recent).post(handlers::webhook::receive),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::users::register))
        .route("/api/setup-completed", get(handlers::users::setup_completed))
        .route("/api/update-tags", post(handlers::users::update_tags))
        .route("/api/get-tags", get(handlers::users::get_tags))
        .route("/api/update-ipns", post(handlers::archive::update_ipns))
        .route("/api/get-cids", get(handlers::archive::get_cids))
        .route("/api/export", get(handlers::archive::export))
        .route("/api/rooms", get(handlers::rooms::list))
        .route(
            "/api/rooms/{tag}/messages",
            get(handlers::rooms::read).post(handlers::rooms::post),
        )
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
