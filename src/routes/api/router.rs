use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{auth, protected};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/auth", auth::router(state.clone()))
        .merge(protected::router(state))
}
