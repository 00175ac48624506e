pub mod handlers;
pub mod jwt;
pub mod password;
pub mod wallet;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;
use crate::users::queries;

/// The authenticated caller. Extracting it rejects the request with 401 when
/// the bearer token is missing, invalid, expired, or names a deleted user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRow);

/// Token part of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::Unauthorized)?;

        let claims = jwt::verify_token(token, &state.config.jwt_secret).map_err(|e| {
            warn!("Rejected bearer token: {e}");
            AppError::Unauthorized
        })?;

        let user = queries::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!("Token subject {} no longer exists", claims.sub);
                AppError::Unauthorized
            })?;

        Ok(AuthUser(user))
    }
}
