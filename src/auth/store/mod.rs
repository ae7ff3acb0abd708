//! Refresh-token persistence.
//!
//! Only the SHA-256 digest of a token is ever stored. Records move one way:
//! a token can be claimed, replaced or revoked, and none of those marks is
//! ever cleared.

mod memory;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{auth::RequestMeta, db::dao::DaoResult};

pub use memory::InMemoryRefreshTokenStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub token_family: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub replaced_by_token_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RefreshTokenRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_replaced(&self) -> bool {
        self.replaced_by_token_id.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_replaced() && !self.is_expired(now)
    }

    fn is_claimable(&self) -> bool {
        self.revoked_at.is_none() && self.replaced_by_token_id.is_none() && self.claimed_at.is_none()
    }
}

/// A record about to be persisted. The id is chosen by the caller so it can be
/// embedded in the signed token before the row exists.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub token_family: Uuid,
    pub expires_at: DateTime<Utc>,
    pub meta: RequestMeta,
}

impl NewRefreshToken {
    pub fn into_record(self, created_at: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: self.id,
            user_id: self.user_id,
            token_hash: self.token_hash,
            token_family: self.token_family,
            expires_at: self.expires_at,
            revoked_at: None,
            claimed_at: None,
            replaced_by_token_id: None,
            created_at,
            ip_address: self.meta.ip_address,
            user_agent: self.meta.user_agent,
        }
    }
}

pub fn hash_token(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(raw.as_bytes()))
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: NewRefreshToken) -> DaoResult<RefreshTokenRecord>;

    async fn find_by_hash(&self, token_hash: &str) -> DaoResult<Option<RefreshTokenRecord>>;

    async fn find_by_id(&self, id: Uuid) -> DaoResult<Option<RefreshTokenRecord>>;

    /// Marks the record claimed if nothing has claimed, replaced or revoked it yet.
    /// Exactly one caller can ever receive `true` for a given record.
    async fn try_claim(&self, id: Uuid) -> DaoResult<bool>;

    async fn set_replaced_by(&self, id: Uuid, successor_id: Uuid) -> DaoResult<()>;

    async fn revoke(&self, id: Uuid) -> DaoResult<()>;

    /// Returns how many records were newly revoked.
    async fn revoke_family(&self, family: Uuid) -> DaoResult<u64>;

    async fn revoke_all_for_user(&self, user_id: Uuid) -> DaoResult<u64>;

    async fn family_has_revoked_member(&self, family: Uuid) -> DaoResult<bool>;

    /// Claims `id`, persists `successor` and links the two as one unit.
    /// `None` means another caller already claimed the record.
    async fn rotate(
        &self,
        id: Uuid,
        successor: NewRefreshToken,
    ) -> DaoResult<Option<RefreshTokenRecord>>;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{NewRefreshToken, hash_token};
    use crate::auth::RequestMeta;

    #[test]
    fn hash_is_deterministic_url_safe_and_unpadded() {
        let digest = hash_token("some.refresh.token");
        assert_eq!(digest, hash_token("some.refresh.token"));
        assert_ne!(digest, hash_token("some.refresh.tokem"));
        assert_eq!(digest.len(), 43);
        assert!(!digest.contains(['+', '/', '=']));
    }

    #[test]
    fn usability_tracks_revocation_replacement_and_expiry() {
        let now = Utc::now();
        let record = NewRefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: hash_token("t"),
            token_family: Uuid::new_v4(),
            expires_at: now + Duration::minutes(5),
            meta: RequestMeta::default(),
        }
        .into_record(now);
        assert!(record.is_usable(now));
        assert!(!record.is_usable(now + Duration::minutes(5)));

        let mut replaced = record.clone();
        replaced.replaced_by_token_id = Some(Uuid::new_v4());
        assert!(!replaced.is_usable(now));

        let mut revoked = record;
        revoked.revoked_at = Some(now);
        assert!(!revoked.is_usable(now));
    }
}
