use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use board_api::auth::credentials::CredentialVerifier;
use board_api::config::Config;
use board_api::db::usage::{PgUsageStore, UsageCounterStore};
use board_api::gateway::presence::PresenceGateway;
use board_api::maintenance::schedule::TriggerRule;
use board_api::maintenance::scheduler::MaintenanceScheduler;
use board_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present; env vars may be set externally.
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let db = board_api::db::pool::connect(&config.database_url)
        .expect("failed to build connection pool");
    let usage: Arc<dyn UsageCounterStore> = Arc::new(PgUsageStore::new(db));

    let rule = TriggerRule::monthly_usage_reset().expect("invalid maintenance schedule");
    let maintenance = Arc::new(MaintenanceScheduler::new(rule, usage));
    tracing::info!(next = ?maintenance.next_trigger(), "usage reset scheduled");

    let state = AppState {
        credentials: CredentialVerifier::new(&config.jwt_secret),
        gateway: Arc::new(PresenceGateway::new()),
        maintenance: maintenance.clone(),
        config: Arc::new(config),
    };

    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(maintenance.run(shutdown.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(board_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "board-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            signal.cancel();
        })
        .await
        .expect("server error");

    shutdown.cancel();
    let _ = scheduler_task.await;
}
