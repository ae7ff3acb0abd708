//! Consumer side of the token lifecycle: keeps a session's tokens, attaches
//! the access token to calls and refreshes it at most once per refresh token.

mod config;
mod coordinator;
mod error;
mod http;

use async_trait::async_trait;
use serde::Deserialize;

pub use config::ClientConfig;
pub use coordinator::RefreshCoordinator;
pub use error::ClientError;
pub use http::HttpAuthClient;

/// Token pair as returned by the login and refresh endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[async_trait]
pub trait RefreshTransport: Send + Sync + 'static {
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ClientError>;
}
