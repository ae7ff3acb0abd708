use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures_util::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::time::Instant;

use super::{ClientConfig, ClientError, RefreshTransport, SessionTokens};

type InflightRefresh = Shared<BoxFuture<'static, Result<String, ClientError>>>;

#[derive(Debug, Clone)]
struct StoredTokens {
    access_token: String,
    refresh_token: String,
    access_expires_at: Instant,
}

impl StoredTokens {
    fn from_session(tokens: SessionTokens) -> Self {
        let ttl = Duration::from_secs(u64::try_from(tokens.expires_in).unwrap_or(0));
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: Instant::now() + ttl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    Always,
    IfStale,
}

struct Inflight {
    refresh_token: String,
    future: InflightRefresh,
}

/// Holds one session's tokens and refreshes them on behalf of every caller.
///
/// Concurrent callers that need a refresh share a single in-flight request,
/// keyed by the refresh token it consumes. A failed or timed-out refresh ends
/// the session; callers then get [`ClientError::ReauthenticationRequired`].
pub struct RefreshCoordinator<T: RefreshTransport> {
    transport: Arc<T>,
    tokens: Arc<Mutex<Option<StoredTokens>>>,
    inflight: Arc<tokio::sync::Mutex<Option<Inflight>>>,
    config: ClientConfig,
}

impl<T: RefreshTransport> Clone for RefreshCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            tokens: self.tokens.clone(),
            inflight: self.inflight.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: RefreshTransport> RefreshCoordinator<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            tokens: Arc::new(Mutex::new(None)),
            inflight: Arc::new(tokio::sync::Mutex::new(None)),
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_tokens(&self, tokens: SessionTokens) {
        *lock(&self.tokens) = Some(StoredTokens::from_session(tokens));
    }

    pub fn clear(&self) {
        *lock(&self.tokens) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.tokens).is_some()
    }

    pub fn refresh_token(&self) -> Option<String> {
        lock(&self.tokens)
            .as_ref()
            .map(|tokens| tokens.refresh_token.clone())
    }

    fn current(&self) -> Option<StoredTokens> {
        lock(&self.tokens).clone()
    }

    /// Current access token, refreshed first when it is about to expire.
    pub async fn access_token(&self) -> Result<String, ClientError> {
        let tokens = self
            .current()
            .ok_or(ClientError::ReauthenticationRequired)?;

        if self.is_stale(&tokens) {
            tracing::debug!("access token close to expiry; refreshing");
            return self.refresh_with(RefreshMode::IfStale).await;
        }
        Ok(tokens.access_token)
    }

    fn is_stale(&self, tokens: &StoredTokens) -> bool {
        tokens
            .access_expires_at
            .saturating_duration_since(Instant::now())
            < self.config.refresh_threshold
    }

    /// Runs `op` with the access token. On `Unauthorized` the token is
    /// refreshed and `op` is retried exactly once.
    pub async fn call<F, Fut, R>(&self, mut op: F) -> Result<R, ClientError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<R, ClientError>>,
    {
        let token = self.access_token().await?;
        match op(token.clone()).await {
            Err(ClientError::Unauthorized) => {
                let fresh = self.refresh_after_failure(&token).await?;
                op(fresh).await
            }
            other => other,
        }
    }

    /// Returns a usable access token after `failed` was rejected. When another
    /// caller already replaced it, the replacement is returned without a refresh.
    pub async fn refresh_after_failure(&self, failed: &str) -> Result<String, ClientError> {
        let tokens = self
            .current()
            .ok_or(ClientError::ReauthenticationRequired)?;
        if tokens.access_token != failed {
            return Ok(tokens.access_token);
        }
        self.refresh().await
    }

    /// Refreshes the session, joining an in-flight refresh of the same token.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        self.refresh_with(RefreshMode::Always).await
    }

    async fn refresh_with(&self, mode: RefreshMode) -> Result<String, ClientError> {
        let mut guard = self.inflight.lock().await;
        let tokens = self
            .current()
            .ok_or(ClientError::ReauthenticationRequired)?;
        let refresh_token = tokens.refresh_token.clone();

        if let Some(inflight) = guard.as_ref()
            && inflight.refresh_token == refresh_token
        {
            let future = inflight.future.clone();
            drop(guard);
            return future.await;
        }

        // Another caller may have finished a refresh while this one waited.
        if mode == RefreshMode::IfStale && !self.is_stale(&tokens) {
            return Ok(tokens.access_token);
        }

        let future = self.refresh_future(refresh_token.clone());
        *guard = Some(Inflight {
            refresh_token: refresh_token.clone(),
            future: future.clone(),
        });
        drop(guard);

        let result = future.await;

        let mut guard = self.inflight.lock().await;
        if guard
            .as_ref()
            .is_some_and(|inflight| inflight.refresh_token == refresh_token)
        {
            *guard = None;
        }
        result
    }

    fn refresh_future(&self, refresh_token: String) -> InflightRefresh {
        let transport = self.transport.clone();
        let tokens = self.tokens.clone();
        let timeout = self.config.request_timeout;

        let future: BoxFuture<'static, Result<String, ClientError>> = Box::pin(async move {
            let outcome = match tokio::time::timeout(timeout, transport.refresh(&refresh_token))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout),
            };

            match outcome {
                Ok(session) => {
                    let access_token = session.access_token.clone();
                    *lock(&tokens) = Some(StoredTokens::from_session(session));
                    Ok(access_token)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "token refresh failed; clearing session");
                    *lock(&tokens) = None;
                    Err(ClientError::ReauthenticationRequired)
                }
            }
        });
        future.shared()
    }
}

fn lock(tokens: &Mutex<Option<StoredTokens>>) -> MutexGuard<'_, Option<StoredTokens>> {
    tokens.lock().unwrap_or_else(PoisonError::into_inner)
}
