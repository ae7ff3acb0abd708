use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use uuid::Uuid;

use super::{NewRefreshToken, RefreshTokenRecord, RefreshTokenStore};
use crate::db::dao::{DaoLayerError, DaoResult};

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, RefreshTokenRecord>,
    by_hash: HashMap<String, Uuid>,
}

impl Inner {
    fn insert(&mut self, token: NewRefreshToken) -> DaoResult<RefreshTokenRecord> {
        if self.by_hash.contains_key(&token.token_hash) || self.records.contains_key(&token.id) {
            return Err(DaoLayerError::Db(DbErr::Custom(
                "refresh token already exists".to_string(),
            )));
        }

        let record = token.into_record(Utc::now());
        self.by_hash.insert(record.token_hash.clone(), record.id);
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn revoke_where(&mut self, predicate: impl Fn(&RefreshTokenRecord) -> bool) -> u64 {
        let now = Utc::now();
        let mut revoked = 0;
        for record in self.records.values_mut() {
            if record.revoked_at.is_none() && predicate(record) {
                record.revoked_at = Some(now);
                revoked += 1;
            }
        }
        revoked
    }
}

/// Process-local store. One mutex guards every record, which makes each
/// operation (rotation included) atomic with respect to all others.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    inner: Mutex<Inner>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn family(&self, family: Uuid) -> Vec<RefreshTokenRecord> {
        let mut members: Vec<_> = self
            .lock()
            .records
            .values()
            .filter(|record| record.token_family == family)
            .cloned()
            .collect();
        members.sort_by_key(|record| record.created_at);
        members
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, token: NewRefreshToken) -> DaoResult<RefreshTokenRecord> {
        self.lock().insert(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> DaoResult<Option<RefreshTokenRecord>> {
        let inner = self.lock();
        Ok(inner
            .by_hash
            .get(token_hash)
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DaoResult<Option<RefreshTokenRecord>> {
        Ok(self.lock().records.get(&id).cloned())
    }

    async fn try_claim(&self, id: Uuid) -> DaoResult<bool> {
        let mut inner = self.lock();
        match inner.records.get_mut(&id) {
            Some(record) if record.is_claimable() => {
                record.claimed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_replaced_by(&self, id: Uuid, successor_id: Uuid) -> DaoResult<()> {
        if let Some(record) = self.lock().records.get_mut(&id)
            && record.replaced_by_token_id.is_none()
        {
            record.replaced_by_token_id = Some(successor_id);
        }
        Ok(())
    }

    async fn revoke(&self, id: Uuid) -> DaoResult<()> {
        self.lock().revoke_where(|record| record.id == id);
        Ok(())
    }

    async fn revoke_family(&self, family: Uuid) -> DaoResult<u64> {
        Ok(self
            .lock()
            .revoke_where(|record| record.token_family == family))
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        Ok(self.lock().revoke_where(|record| record.user_id == user_id))
    }

    async fn family_has_revoked_member(&self, family: Uuid) -> DaoResult<bool> {
        Ok(self
            .lock()
            .records
            .values()
            .any(|record| record.token_family == family && record.is_revoked()))
    }

    async fn rotate(
        &self,
        id: Uuid,
        successor: NewRefreshToken,
    ) -> DaoResult<Option<RefreshTokenRecord>> {
        let mut inner = self.lock();
        let claimable = inner
            .records
            .get(&id)
            .is_some_and(RefreshTokenRecord::is_claimable);
        if !claimable {
            return Ok(None);
        }

        let successor = inner.insert(successor)?;
        if let Some(record) = inner.records.get_mut(&id) {
            let now = Utc::now();
            record.claimed_at = Some(now);
            record.replaced_by_token_id = Some(successor.id);
        }
        Ok(Some(successor))
    }
}
