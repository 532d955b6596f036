use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tts_relay::controllers::{admin::AdminController, relay::RelayController};
use tts_relay::domain::poller::{select_target, PollerConfig};
use tts_relay::domain::{federation::FederationRegistry, relay::RelayService, task::TaskStore};
use tts_relay::infrastructure::config::{Config, LogFormat};
use tts_relay::infrastructure::http::start_http_server;
use tts_relay::infrastructure::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting TTS relay on {}:{} (upstream: {})",
        config.host,
        config.port,
        config.upstream_url
    );

    // The relay writes synthesized audio here and serves downloads from it.
    tokio::fs::create_dir_all(&config.cache_dir).await?;
    tracing::info!(cache_dir = %config.cache_dir.display(), "Audio cache directory ready");

    if config.connect_master {
        match &config.master_url {
            Some(master) => tracing::info!(
                master_url = %master,
                client_id = %config.client_id,
                "Master chaining enabled"
            ),
            None => tracing::warn!(
                "CONNECT_MASTER is set but MASTER_URL is empty; submissions stay local"
            ),
        }
    }

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Upstream client (shared by the relay service and pass-throughs)
    let upstream = Arc::new(UpstreamClient::new(config.upstream_url.clone()));

    // 2. Process-local state: task store and federation registry
    let store = Arc::new(TaskStore::new());
    let registry = Arc::new(FederationRegistry::new());

    // 3. Relay service (owns the task lifecycle)
    let mut relay_service = RelayService::new(
        store,
        registry,
        upstream.clone(),
        config.cache_dir.clone(),
        config.public_base_url(),
    );
    let local_base = config.public_base_url();
    let target = select_target(config.connect_master, config.master_url.as_deref(), &local_base);
    if target != local_base {
        relay_service = relay_service.with_master(
            target.to_string(),
            PollerConfig {
                max_attempts: config.poll_max_attempts,
                client_id: config.client_id.clone(),
                register_with_master: true,
                ..PollerConfig::default()
            },
        );
    }
    let relay_service = Arc::new(relay_service);

    // 4. Controllers
    let request_count = Arc::new(AtomicU64::new(0));
    let relay_controller = Arc::new(RelayController::new(
        relay_service,
        config.upstream_url.clone(),
        request_count.clone(),
    ));
    let admin_controller = Arc::new(AdminController::new(upstream, request_count));

    // Start HTTP server with all routes
    start_http_server(&config.host, config.port, relay_controller, admin_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tts_relay=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tts_relay=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
