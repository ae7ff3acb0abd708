use std::sync::Arc;

use crate::{
    auth::{Accounts, TokenCodec, store::RefreshTokenStore},
    config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub codec: TokenCodec,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub accounts: Arc<dyn Accounts>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        accounts: Arc<dyn Accounts>,
    ) -> Arc<Self> {
        let codec = TokenCodec::new(&config.auth);
        Arc::new(Self {
            config,
            codec,
            refresh_tokens,
            accounts,
        })
    }
}
