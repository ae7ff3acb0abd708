use uuid::Uuid;

use crate::auth::{AuthError, store::RefreshTokenStore};

/// Bulk revocation. Every operation is idempotent and reports how many
/// records it newly revoked.
#[derive(Clone, Copy)]
pub struct FamilyRevocationService<'a> {
    store: &'a dyn RefreshTokenStore,
}

impl<'a> FamilyRevocationService<'a> {
    pub fn new(store: &'a dyn RefreshTokenStore) -> Self {
        Self { store }
    }

    pub async fn revoke_family(&self, family: Uuid, reason: &'static str) -> Result<u64, AuthError> {
        let revoked = self.store.revoke_family(family).await?;
        tracing::info!(%family, revoked, reason, "revoked refresh token family");
        Ok(revoked)
    }

    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self.store.revoke_all_for_user(user_id).await?;
        tracing::info!(%user_id, revoked, "revoked all refresh tokens for user");
        Ok(revoked)
    }

    pub async fn revoke_token(&self, id: Uuid) -> Result<(), AuthError> {
        self.store.revoke(id).await?;
        tracing::info!(token_id = %id, "revoked refresh token");
        Ok(())
    }
}
