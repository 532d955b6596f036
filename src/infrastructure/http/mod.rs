use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::controllers::{
    admin::AdminController,
    health,
    relay::RelayController,
};

/// Build the relay router with every route configured.
pub fn build_router(
    relay_controller: Arc<RelayController>,
    admin_controller: Arc<AdminController>,
) -> Router {
    // Task lifecycle and federation routes
    let relay_routes = Router::new()
        .route("/tts", post(RelayController::submit_tts))
        .route("/tts_status/:task_id", get(RelayController::tts_status))
        .route("/download/:task_id", get(RelayController::download))
        .route("/stream/:task_id", get(RelayController::stream))
        .route(
            "/register_client_task",
            post(RelayController::register_client_task),
        )
        .route("/client_tasks", get(RelayController::client_tasks))
        .route("/completed_tasks", get(RelayController::completed_tasks))
        .route(
            "/batch_task_status",
            post(RelayController::batch_task_status),
        )
        .route("/stats", get(RelayController::stats))
        .route("/", get(health::root))
        .with_state(relay_controller);

    // Upstream pass-through routes
    let admin_routes = Router::new()
        .route("/load_character", post(AdminController::load_character))
        .route("/unload_character", post(AdminController::unload_character))
        .route(
            "/set_reference_audio",
            post(AdminController::set_reference_audio),
        )
        .route(
            "/clear_reference_audio_cache",
            post(AdminController::clear_reference_audio_cache),
        )
        .route("/stop", post(AdminController::stop))
        .with_state(admin_controller);

    // LAN clients talk to the relay from arbitrary origins.
    Router::new()
        .merge(relay_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process exits.
pub async fn start_http_server(
    host: &str,
    port: u16,
    relay_controller: Arc<RelayController>,
    admin_controller: Arc<AdminController>,
) -> anyhow::Result<()> {
    let app = build_router(relay_controller, admin_controller);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
