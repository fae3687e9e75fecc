//! Bearer credential extraction for the admin routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::AppState;

/// Caller authenticated via `Authorization: Bearer <token>` with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Option<String>,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("Bearer credential required"))?;

        let claims = state.credentials.verify(token)?;

        if !claims.is_admin() {
            tracing::debug!(user_id = claims.user_id.as_deref().unwrap_or("-"), "admin route refused");
            return Err(ApiError::forbidden("Admin role required"));
        }

        Ok(AdminUser {
            user_id: claims.user_id,
        })
    }
}
