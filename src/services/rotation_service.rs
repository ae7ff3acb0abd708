use chrono::Utc;
use uuid::Uuid;

use super::FamilyRevocationService;
use crate::auth::{
    Accounts, AuthError, RefreshClaims, RequestMeta, TokenCodec, TokenPair,
    store::{NewRefreshToken, RefreshTokenRecord, RefreshTokenStore, hash_token},
};

/// Exchanges a refresh token for a new pair in the same family.
///
/// A record can be exchanged once. Presenting it again, or losing the race
/// for it, is treated as theft: the whole family is revoked.
#[derive(Clone, Copy)]
pub struct RotationService<'a> {
    codec: &'a TokenCodec,
    store: &'a dyn RefreshTokenStore,
    accounts: &'a dyn Accounts,
}

impl<'a> RotationService<'a> {
    pub fn new(
        codec: &'a TokenCodec,
        store: &'a dyn RefreshTokenStore,
        accounts: &'a dyn Accounts,
    ) -> Self {
        Self {
            codec,
            store,
            accounts,
        }
    }

    fn revocation(&self) -> FamilyRevocationService<'a> {
        FamilyRevocationService::new(self.store)
    }

    pub async fn rotate(&self, raw_token: &str, meta: &RequestMeta) -> Result<TokenPair, AuthError> {
        let claims = self.codec.verify_refresh(raw_token)?;

        let record = self
            .store
            .find_by_hash(&hash_token(raw_token))
            .await?
            .filter(|record| matches_claims(record, &claims))
            .ok_or(AuthError::InvalidToken)?;

        if record.is_revoked() {
            return Err(AuthError::TokenRevoked);
        }

        if record.is_replaced() {
            return self.reject_reuse(record, meta).await;
        }

        // A successor that slipped past a concurrent revocation is still dead.
        if self.store.family_has_revoked_member(record.token_family).await? {
            self.revocation()
                .revoke_family(record.token_family, "revoked_family_member")
                .await?;
            return Err(AuthError::TokenRevoked);
        }

        if record.is_expired(Utc::now()) {
            return Err(AuthError::ExpiredToken);
        }

        let account = self
            .accounts
            .find_account(record.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let successor_id = Uuid::new_v4();
        let refresh =
            self.codec
                .issue_refresh_token(account.id, record.token_family, successor_id)?;
        let successor = NewRefreshToken {
            id: successor_id,
            user_id: account.id,
            token_hash: hash_token(&refresh.token),
            token_family: record.token_family,
            expires_at: refresh.expires_at,
            meta: meta.clone(),
        };

        let Some(successor) = self.store.rotate(record.id, successor).await? else {
            let latest = self.store.find_by_id(record.id).await?.unwrap_or(record);
            return self.reject_reuse(latest, meta).await;
        };

        let access = self.codec.issue_access_token(account.id, account.role)?;
        tracing::debug!(
            user_id = %account.id,
            family = %successor.token_family,
            token_id = %successor.id,
            "rotated refresh token"
        );
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer",
            expires_in: self.codec.access_ttl_secs(),
        })
    }

    async fn reject_reuse(
        &self,
        reused: RefreshTokenRecord,
        meta: &RequestMeta,
    ) -> Result<TokenPair, AuthError> {
        let revoked = self
            .revocation()
            .revoke_family(reused.token_family, "refresh_token_reuse")
            .await?;

        let successor = match reused.replaced_by_token_id {
            Some(id) => self.store.find_by_id(id).await?,
            None => None,
        };

        tracing::warn!(
            target: "security",
            event = "refresh_token_reuse",
            family = %reused.token_family,
            user_id = %reused.user_id,
            request_ip = ?meta.ip_address,
            request_user_agent = ?meta.user_agent,
            reused_token_id = %reused.id,
            reused_issued_at = %reused.created_at,
            reused_ip = ?reused.ip_address,
            reused_user_agent = ?reused.user_agent,
            successor_token_id = ?successor.as_ref().map(|s| s.id),
            successor_issued_at = ?successor.as_ref().map(|s| s.created_at),
            successor_ip = ?successor.as_ref().and_then(|s| s.ip_address.as_deref()),
            successor_user_agent = ?successor.as_ref().and_then(|s| s.user_agent.as_deref()),
            revoked,
            "refresh token reuse detected; family revoked"
        );

        Err(AuthError::TokenReused)
    }
}

fn matches_claims(record: &RefreshTokenRecord, claims: &RefreshClaims) -> bool {
    record.id == claims.jti
        && record.token_family == claims.family
        && record.user_id.to_string() == claims.sub
}
