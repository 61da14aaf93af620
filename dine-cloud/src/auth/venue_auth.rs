//! Staff JWT authentication
//!
//! Tokens are issued by the external auth service (HS256, shared secret).
//! This service only verifies them; it never mints tokens.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use shared::error::AppError;

use crate::state::AppState;

/// JWT claims of the external auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID
    pub sub: String,
    /// User email (absent for phone / anonymous sign-ins)
    #[serde(default)]
    pub email: Option<String>,
    /// Audience
    pub aud: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    #[serde(default)]
    pub iat: usize,
}

/// Authenticated user identity extracted from JWT
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Verify a bearer token and return the identity it carries
pub fn verify_token(token: &str, secret: &str, audience: &str) -> Result<UserIdentity, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    let token_data = jsonwebtoken::decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::invalid_token("Token has no subject"));
    }

    Ok(UserIdentity {
        user_id: token_data.claims.sub,
        email: token_data.claims.email,
    })
}

/// Middleware that extracts and verifies the staff JWT from the Authorization header
pub async fn venue_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format").into_response())?;

    let identity = verify_token(token, &state.jwt_secret, &state.jwt_audience)
        .map_err(IntoResponse::into_response)?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
pub(crate) fn issue_test_token(user_id: &str, secret: &str, audience: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header};
    let now = chrono::Utc::now().timestamp();
    let claims = UserClaims {
        sub: user_id.to_string(),
        email: Some(format!("{user_id}@example.com")),
        aud: audience.to_string(),
        exp: (now + ttl_secs) as usize,
        iat: now as usize,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn valid_token_yields_identity() {
        let token = issue_test_token("user-1", "s3cret", "authenticated", 600);
        let identity = verify_token(&token, "s3cret", "authenticated").unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("user-1@example.com"));
    }

    #[test]
    fn wrong_secret_or_audience_is_rejected() {
        let token = issue_test_token("user-1", "s3cret", "authenticated", 600);
        assert_eq!(
            verify_token(&token, "other", "authenticated").unwrap_err().code,
            ErrorCode::TokenInvalid
        );
        assert_eq!(
            verify_token(&token, "s3cret", "service_role").unwrap_err().code,
            ErrorCode::TokenInvalid
        );
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let token = issue_test_token("user-1", "s3cret", "authenticated", -3600);
        assert_eq!(
            verify_token(&token, "s3cret", "authenticated").unwrap_err().code,
            ErrorCode::TokenExpired
        );
    }
}
