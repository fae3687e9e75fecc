//! Credential verification for gateway admission.
//!
//! Credentials are HS256 JWTs issued by the external identity provider and
//! signed with a secret shared with this process. The gateway reads them from
//! the `auth` handshake header, formatted `"<scheme> <token>"`.

use axum::http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Handshake header carrying the credential.
pub const AUTH_HEADER: &str = "auth";

/// Claims decoded from a verified credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity used as the push-delivery key.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Optional role; `"admin"` unlocks the admin routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Issued-at (unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// Why a connection attempt was refused. The `Display` text is the reason
/// sent back to the connecting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("must sign in")]
    MustSignIn,
    #[error("session expired, please sign in again")]
    SessionExpired,
}

/// Verifies credentials against the shared secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl CredentialVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry of a bare token.
    pub fn verify(&self, token: &str) -> Result<Claims, AdmissionError> {
        jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AdmissionError::SessionExpired,
                _ => {
                    tracing::debug!(?e, "credential rejected");
                    AdmissionError::MustSignIn
                }
            })
    }

    /// Admission check for a connection handshake.
    pub fn admit(&self, headers: &HeaderMap) -> Result<Claims, AdmissionError> {
        let token = credential_from_headers(headers)?;
        self.verify(token)
    }
}

/// Extract the token portion of the `auth` header.
pub fn credential_from_headers(headers: &HeaderMap) -> Result<&str, AdmissionError> {
    let raw = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AdmissionError::MustSignIn)?;

    let (_scheme, token) = raw
        .trim()
        .split_once(' ')
        .ok_or(AdmissionError::MustSignIn)?;

    let token = token.trim();
    if token.is_empty() {
        return Err(AdmissionError::MustSignIn);
    }
    Ok(token)
}
