use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

use super::{ClientConfig, ClientError, RefreshCoordinator, RefreshTransport, SessionTokens};

const API_PREFIX: &str = "/api/v1";

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct LogoutAllBody {
    revoked: u64,
}

/// Talks to the token endpoints over HTTP.
#[derive(Clone)]
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(base_url: impl Into<String>, config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionTokens, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        check(response).await.map(|_| ())
    }

    pub async fn logout_all(&self, access_token: &str) -> Result<u64, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/logout-all"))
            .bearer_auth(access_token)
            .send()
            .await?;
        read_json::<LogoutAllBody>(response)
            .await
            .map(|body| body.revoked)
    }

    pub async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<R, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl RefreshTransport for HttpAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        read_json(response).await
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R, ClientError> {
    Ok(check(response).await?.json::<R>().await?)
}

/// Session helpers for a coordinator that talks HTTP.
impl RefreshCoordinator<HttpAuthClient> {
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let tokens = self.transport().login(username, password).await?;
        self.set_tokens(tokens);
        Ok(())
    }

    /// Ends this session locally even when the server cannot be reached.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let refresh_token = self.refresh_token();
        self.clear();
        match refresh_token {
            Some(token) => self.transport().logout(&token).await,
            None => Ok(()),
        }
    }

    pub async fn logout_all(&self) -> Result<u64, ClientError> {
        let revoked = self
            .call(|token| async move { self.transport().logout_all(&token).await })
            .await?;
        self.clear();
        Ok(revoked)
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.call(|token| async move { self.transport().get_json(path, &token).await })
            .await
    }
}
