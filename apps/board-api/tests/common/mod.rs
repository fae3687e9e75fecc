use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::NaiveDate;
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use board_api::auth::credentials::{Claims, CredentialVerifier};
use board_api::config::{Config, DEFAULT_HEARTBEAT_INTERVAL_MS};
use board_api::db::usage::{MemoryUsageStore, UsageCounter, UsageCounterStore};
use board_api::gateway::presence::PresenceGateway;
use board_api::maintenance::schedule::TriggerRule;
use board_api::maintenance::scheduler::MaintenanceScheduler;
use board_api::AppState;

pub const TEST_SECRET: &str = "test-secret-do-not-use-in-production";

/// Mint a credential the way the identity provider does.
pub fn mint_token(user_id: Option<&str>, role: Option<&str>, ttl_secs: i64) -> String {
    let now = chrono::Utc::now();
    let claims = Claims {
        user_id: user_id.map(str::to_string),
        role: role.map(str::to_string),
        exp: (now + chrono::Duration::seconds(ttl_secs)).timestamp(),
        iat: Some(now.timestamp()),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("mint test token")
}

pub fn user_token(user_id: &str) -> String {
    mint_token(Some(user_id), None, 600)
}

pub fn admin_token() -> String {
    mint_token(Some("usr_admin"), Some("admin"), 600)
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        port: 0,
        heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
    }
}

/// Build an AppState around an arbitrary usage store.
pub fn build_state(config: Config, usage: Arc<dyn UsageCounterStore>) -> AppState {
    let rule = TriggerRule::monthly_usage_reset().expect("usage reset rule");
    AppState {
        credentials: CredentialVerifier::new(&config.jwt_secret),
        gateway: Arc::new(PresenceGateway::new()),
        maintenance: Arc::new(MaintenanceScheduler::new(rule, usage)),
        config: Arc::new(config),
    }
}

/// Build a test AppState backed by an in-memory usage store.
pub fn test_state() -> (AppState, Arc<MemoryUsageStore>) {
    let usage = Arc::new(MemoryUsageStore::new());
    (build_state(test_config(), usage.clone()), usage)
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState, Arc<MemoryUsageStore>) {
    let (state, usage) = test_state();
    let app = board_api::routes::router().with_state(state.clone());
    (app, state, usage)
}

/// Router over a caller-supplied usage store.
pub fn app_with_store(usage: Arc<dyn UsageCounterStore>) -> (Router, AppState) {
    let state = build_state(test_config(), usage);
    let app = board_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the background.
pub async fn start_ws_server() -> (SocketAddr, AppState) {
    start_ws_server_with(test_config()).await
}

pub async fn start_ws_server_with(config: Config) -> (SocketAddr, AppState) {
    let state = build_state(config, Arc::new(MemoryUsageStore::new()));
    let app = board_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Seed a recruiter's usage counter.
pub fn seed_counter(store: &MemoryUsageStore, recruiter_id: &str, posts_used: i32) {
    store.upsert(UsageCounter {
        recruiter_id: recruiter_id.to_string(),
        posts_used,
        period_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
    });
}
