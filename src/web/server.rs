use axum::{routing::get, routing::post, routing::put, Router};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::SampleCache;
use crate::producer::{
    subscribe_all, LocationProvider, MotionProvider, PushHub, SimulatedLocation, SimulatedMotion,
};
use crate::session::SessionController;
use crate::storage::DatasetStore;

use super::api::dataset as dataset_handlers;
use super::api::samples as sample_handlers;
use super::api::session as session_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;
use super::config::{Config, ConfigError, SourceKind};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wires cache, store, share target and producers into a controller for `config`.
///
/// Must run inside a tokio runtime: producer pumps are spawned immediately.
pub fn build_session(
    config: &Config,
) -> Result<(SessionController, Option<Arc<PushHub>>), ConfigError> {
    let device = config.device_id()?;
    let cache = Arc::new(SampleCache::new());
    let store = Arc::new(DatasetStore::new(config.storage.base_folder.clone()));
    let mut session =
        SessionController::new(device, cache.clone(), store, config.export.share_target())
            .with_period(config.sampling.period);

    let push = match config.source {
        SourceKind::Simulated => None,
        SourceKind::Push => Some(Arc::new(PushHub::new(
            config.location.enabled,
            config.motion.channels.clone(),
        ))),
    };

    let watch = config.location.watch_options();
    let subscribe = |location: &dyn LocationProvider, motion: &dyn MotionProvider| {
        subscribe_all(
            location,
            &watch,
            motion,
            &config.motion.channels,
            config.motion.update_interval,
            &cache,
        )
    };
    let subscriptions = match &push {
        Some(hub) => subscribe(&**hub, &**hub),
        None => subscribe(
            &SimulatedLocation::new(config.location.enabled),
            &SimulatedMotion::default(),
        ),
    };
    log::info!(
        "{} of {} producer streams active",
        subscriptions.len(),
        config.motion.channels.len() + 1
    );
    for subscription in subscriptions {
        session.attach(subscription);
    }

    Ok((session, push))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Session control
        .route("/api/session/start", post(session_handlers::start))
        .route("/api/session/stop", post(session_handlers::stop))
        .route("/api/session/activity", put(session_handlers::set_activity))
        .route("/api/session/status", get(session_handlers::status))
        .route("/api/session/samples", get(session_handlers::samples))
        .route("/api/activities", get(session_handlers::activities))
        // Dataset
        .route(
            "/api/dataset",
            get(dataset_handlers::read_all).delete(dataset_handlers::reset),
        )
        .route("/api/dataset/export", post(dataset_handlers::export))
        // Ingest
        .route(
            "/api/samples/location",
            post(sample_handlers::push_location),
        )
        .route(
            "/api/samples/motion/{channel}",
            post(sample_handlers::push_motion),
        )
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let bind_addr = config.web.bind.clone();
    let (session, push) = build_session(&config)?;
    log::info!("Recording device {}", session.device_id());

    let session = Arc::new(Mutex::new(session));
    let state = AppState {
        config: Arc::new(config),
        session: session.clone(),
        push,
    };

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down, releasing producers");
    session.lock().await.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
