use std::sync::Arc;

use axum::{extract::FromRequestParts, http::header};

use crate::{
    auth::{AccessClaims, AuthError},
    error::AppError,
    state::AppState,
};

// Auth guard: validate the bearer access token and return its claims.
impl FromRequestParts<Arc<AppState>> for AccessClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<AccessClaims>().cloned() {
            return Ok(claims);
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing/invalid Authorization header"))?;

        let claims = state.codec.verify_access(token).map_err(|err| {
            let err = AuthError::from(err);
            tracing::debug!(kind = err.kind(), "access token rejected");
            AppError::from(err)
        })?;

        parts.extensions.insert(claims.clone());
        Ok(claims)
    }
}

pub type AuthGuard = AccessClaims;
