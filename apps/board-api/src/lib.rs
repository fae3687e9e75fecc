pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod maintenance;
pub mod routes;

use std::sync::Arc;

use auth::credentials::CredentialVerifier;
use config::Config;
use gateway::presence::PresenceGateway;
use maintenance::scheduler::MaintenanceScheduler;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: CredentialVerifier,
    pub gateway: Arc<PresenceGateway>,
    pub maintenance: Arc<MaintenanceScheduler>,
}
