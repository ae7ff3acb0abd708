use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AccountInfo, AuthError, RequestMeta, Role, TokenPair},
    error::AppError,
    middleware::AuthGuard,
    response::ApiResult,
    services::AuthService,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub message: &'static str,
    pub revoked: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .with_state(state)
}

async fn login(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let outcome = AuthService::from_state(&state)
        .login(&body.username, &body.password, &meta)
        .await
        .map_err(|err| rejected("login", err))?;

    Ok(Json(LoginResponse {
        tokens: outcome.tokens.into(),
        user: outcome.account.into(),
    }))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<TokenResponse> {
    let tokens = AuthService::from_state(&state)
        .refresh(&body.refresh_token, &meta)
        .await
        .map_err(|err| rejected("refresh", err))?;
    Ok(Json(tokens.into()))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<MessageResponse> {
    AuthService::from_state(&state)
        .logout(&body.refresh_token)
        .await
        .map_err(|err| rejected("logout", err))?;
    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

async fn logout_all(
    State(state): State<Arc<AppState>>,
    claims: AuthGuard,
) -> ApiResult<LogoutAllResponse> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| rejected("logout_all", AuthError::InvalidToken))?;
    let revoked = AuthService::from_state(&state)
        .logout_all(user_id)
        .await
        .map_err(|err| rejected("logout_all", err))?;
    Ok(Json(LogoutAllResponse {
        message: "Logged out from all sessions",
        revoked,
    }))
}

// The precise kind stays in the logs; the client only sees the generic error.
fn rejected(operation: &'static str, err: AuthError) -> AppError {
    match &err {
        AuthError::TokenReused | AuthError::Storage(_) | AuthError::Signing(_) => {}
        _ => tracing::info!(operation, kind = err.kind(), "auth request rejected"),
    }
    err.into()
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }
    }
}

impl From<AccountInfo> for UserView {
    fn from(account: AccountInfo) -> Self {
        Self {
            id: account.id,
            username: account.username,
            role: account.role,
        }
    }
}
