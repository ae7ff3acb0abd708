use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::{
    auth::Role,
    middleware::AuthGuard,
    response::ApiResult,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/me", get(me)).with_state(state)
}

async fn me(claims: AuthGuard) -> ApiResult<MeResponse> {
    Ok(Json(MeResponse {
        sub: claims.sub,
        role: claims.role,
        exp: claims.exp,
    }))
}
