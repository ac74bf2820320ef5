//! HTTP server startup.
//!
//! [`serve`] opens the database, builds the external clients from config, and
//! runs the API router until ctrl-c.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

use friendcircle::api::{self, AppState};
use friendcircle::archive::pinning::PinningArchive;
use friendcircle::archive::ArchiveStore;
use friendcircle::chat::relay::RelayTransport;
use friendcircle::chat::rooms::all_topics;
use friendcircle::chat::ChatTransport;
use friendcircle::classifier::llm::LlmClassifier;
use friendcircle::classifier::TagClassifier;
use friendcircle::config::FriendCircleConfig;
use friendcircle::db;

/// Open the DB and construct every collaborator the handlers need.
fn setup_state(config: FriendCircleConfig) -> Result<AppState> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let classifier: Arc<dyn TagClassifier> = Arc::new(LlmClassifier::new(&config.classifier)?);
    let archive: Arc<dyn ArchiveStore> = Arc::new(PinningArchive::new(&config.archive)?);
    let chat: Arc<dyn ChatTransport> = Arc::new(RelayTransport::new(&config.chat)?);
    tracing::info!(
        model = %config.classifier.model,
        relay = %config.chat.relay_url,
        "external clients ready"
    );

    Ok(AppState::new(
        Arc::new(Mutex::new(conn)),
        classifier,
        archive,
        chat,
        Arc::new(config),
    ))
}

/// Start the HTTP API server.
pub async fn serve(config: FriendCircleConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = setup_state(config)?;

    let topics = all_topics(&state.config.chat.topic_prefix);
    if let Err(e) = state.chat.subscribe(&topics).await {
        // rooms still work for posting; reads serve whatever history arrives later
        tracing::warn!(error = %e, "could not subscribe to room topics");
    }

    let router = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
