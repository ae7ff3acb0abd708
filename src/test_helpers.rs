use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{Router, middleware};
use uuid::Uuid;

use crate::{
    auth::{AccountInfo, Accounts, AuthError, Role, store::RefreshTokenStore},
    config::{AppConfig, AuthConfig},
    middleware::{catch_panic_layer, json_error_middleware},
    routes::router,
    state::AppState,
};

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        ..AuthConfig::default()
    }
}

/// Account directory backed by a fixed map. Passwords are compared verbatim.
#[derive(Clone, Default)]
pub struct StaticAccounts {
    users: HashMap<String, (AccountInfo, String)>,
}

impl StaticAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, password: &str, role: Role) -> Self {
        let account = AccountInfo {
            id: Uuid::new_v4(),
            username: username.to_string(),
            role,
        };
        self.users
            .insert(username.to_string(), (account, password.to_string()));
        self
    }

    pub fn id_of(&self, username: &str) -> Option<Uuid> {
        self.users.get(username).map(|(account, _)| account.id)
    }
}

#[async_trait]
impl Accounts for StaticAccounts {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AccountInfo>, AuthError> {
        Ok(self
            .users
            .get(username)
            .filter(|(_, expected)| expected == password)
            .map(|(account, _)| account.clone()))
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<AccountInfo>, AuthError> {
        Ok(self
            .users
            .values()
            .find(|(account, _)| account.id == id)
            .map(|(account, _)| account.clone()))
    }
}

pub fn test_state(
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    accounts: StaticAccounts,
) -> Arc<AppState> {
    let cfg = AppConfig {
        auth: test_auth_config(),
        ..AppConfig::default()
    };
    AppState::new(cfg, refresh_tokens, Arc::new(accounts))
}

/// Full API router with the same error layers the binary installs.
pub fn test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(router(state))
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
}
