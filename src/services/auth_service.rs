use std::sync::Arc;

use uuid::Uuid;

use super::{FamilyRevocationService, RotationService};
use crate::{
    auth::{
        AccessClaims, AccountInfo, Accounts, AuthError, RequestMeta, TokenCodec, TokenPair,
        store::{NewRefreshToken, RefreshTokenStore, hash_token},
    },
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub account: AccountInfo,
}

#[derive(Clone)]
pub struct AuthService {
    codec: TokenCodec,
    store: Arc<dyn RefreshTokenStore>,
    accounts: Arc<dyn Accounts>,
}

impl AuthService {
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn RefreshTokenStore>,
        accounts: Arc<dyn Accounts>,
    ) -> Self {
        Self {
            codec,
            store,
            accounts,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.codec.clone(),
            state.refresh_tokens.clone(),
            state.accounts.clone(),
        )
    }

    fn rotation(&self) -> RotationService<'_> {
        RotationService::new(&self.codec, self.store.as_ref(), self.accounts.as_ref())
    }

    fn revocation(&self) -> FamilyRevocationService<'_> {
        FamilyRevocationService::new(self.store.as_ref())
    }

    /// Verifies credentials and opens a new token family.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        meta: &RequestMeta,
    ) -> Result<LoginOutcome, AuthError> {
        let account = self
            .accounts
            .verify_credentials(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let family = Uuid::new_v4();
        let token_id = Uuid::new_v4();
        let refresh = self.codec.issue_refresh_token(account.id, family, token_id)?;
        self.store
            .create(NewRefreshToken {
                id: token_id,
                user_id: account.id,
                token_hash: hash_token(&refresh.token),
                token_family: family,
                expires_at: refresh.expires_at,
                meta: meta.clone(),
            })
            .await?;

        let access = self.codec.issue_access_token(account.id, account.role)?;
        tracing::info!(user_id = %account.id, %family, "user logged in");

        Ok(LoginOutcome {
            tokens: TokenPair {
                access_token: access.token,
                refresh_token: refresh.token,
                token_type: "Bearer",
                expires_in: self.codec.access_ttl_secs(),
            },
            account,
        })
    }

    pub async fn refresh(
        &self,
        refresh_token: &str,
        meta: &RequestMeta,
    ) -> Result<TokenPair, AuthError> {
        self.rotation().rotate(refresh_token, meta).await
    }

    /// Revokes the presented token. Unknown or already revoked tokens succeed silently.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        match self.store.find_by_hash(&hash_token(refresh_token)).await? {
            Some(record) => self.revocation().revoke_token(record.id).await,
            None => Ok(()),
        }
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        self.revocation().revoke_all_for_user(user_id).await
    }

    pub fn verify_access(&self, access_token: &str) -> Result<AccessClaims, AuthError> {
        Ok(self.codec.verify_access(access_token)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::AuthService;
    use crate::{
        auth::{AuthError, RequestMeta, Role, TokenCodec, store::InMemoryRefreshTokenStore},
        test_helpers::{StaticAccounts, test_auth_config},
    };

    fn service(store: Arc<InMemoryRefreshTokenStore>) -> AuthService {
        let accounts = StaticAccounts::new().with_user("root", "password123", Role::Admin);
        AuthService::new(
            TokenCodec::new(&test_auth_config()),
            store,
            Arc::new(accounts),
        )
    }

    #[tokio::test]
    async fn login_issues_a_pair_and_persists_only_the_digest() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let service = service(store.clone());
        let meta = RequestMeta {
            ip_address: Some("192.0.2.10".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let outcome = service
            .login("root", "password123", &meta)
            .await
            .expect("login should succeed");
        assert_eq!(outcome.account.role, Role::Admin);
        assert_eq!(outcome.tokens.expires_in, 15 * 60);

        let claims = service
            .verify_access(&outcome.tokens.access_token)
            .expect("access token should verify");
        assert_eq!(claims.role, Role::Admin);

        assert_eq!(store.len(), 1);
        let record = crate::auth::store::RefreshTokenStore::find_by_hash(
            store.as_ref(),
            &crate::auth::store::hash_token(&outcome.tokens.refresh_token),
        )
        .await
        .expect("lookup should succeed")
        .expect("record should exist");
        assert_ne!(record.token_hash, outcome.tokens.refresh_token);
        assert_eq!(record.ip_address, meta.ip_address);
        assert_eq!(record.user_agent, meta.user_agent);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_without_persisting() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let service = service(store.clone());

        for (username, password) in [("root", "wrong-password"), ("nobody", "password123")] {
            let err = service
                .login(username, password, &RequestMeta::default())
                .await
                .expect_err("login should fail");
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn refresh_tokens_are_not_access_tokens() {
        let service = service(Arc::new(InMemoryRefreshTokenStore::new()));
        let outcome = service
            .login("root", "password123", &RequestMeta::default())
            .await
            .expect("login should succeed");

        let err = service
            .verify_access(&outcome.tokens.refresh_token)
            .expect_err("refresh token must not pass as access token");
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
