//! Admin endpoints: manual maintenance trigger and presence introspection.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::middleware::AdminUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::maintenance::scheduler::RunOutcome;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/maintenance/usage-reset", post(reset_usage))
        .route("/admin/presence", get(presence))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsageResetResponse {
    /// `"completed"`.
    pub status: String,
    pub period_start: NaiveDate,
    pub records_reset: usize,
    /// When the scheduler will next run on its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_scheduled: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/maintenance/usage-reset",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Usage counters reset", body = UsageResetResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
        (status = 409, description = "A reset is already running", body = ApiErrorBody),
        (status = 503, description = "Usage store unavailable", body = ApiErrorBody),
    ),
)]
pub async fn reset_usage(
    admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<UsageResetResponse>, ApiError> {
    tracing::info!(admin = admin.user_id.as_deref().unwrap_or("-"), "manual usage reset requested");

    // Run detached so a dropped request cannot interrupt the update.
    let scheduler = state.maintenance.clone();
    let outcome = tokio::spawn(async move { scheduler.trigger().await })
        .await
        .map_err(|e| {
            tracing::error!(?e, "usage reset task aborted");
            ApiError::unavailable("Usage reset aborted")
        })?;

    match outcome {
        RunOutcome::Completed(summary) => Ok(Json(UsageResetResponse {
            status: "completed".to_string(),
            period_start: summary.period_start,
            records_reset: summary.records_reset,
            next_scheduled: state.maintenance.next_trigger(),
        })),
        RunOutcome::Skipped => Err(ApiError::conflict("A usage reset is already running")),
        RunOutcome::Failed => Err(ApiError::unavailable("Usage store unavailable")),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresenceResponse {
    /// Users currently reachable for push delivery.
    pub connected: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/presence",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Presence summary", body = PresenceResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
    ),
)]
pub async fn presence(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        connected: state.gateway.connected_count(),
    })
}
