use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    auth::Role,
    db::dao::{DaoBase, DaoLayerError, DaoResult, UserDao},
    db::entities::user,
};

#[derive(Clone)]
pub struct UserService {
    user_dao: UserDao,
}

impl UserService {
    pub fn new(user_dao: UserDao) -> Self {
        Self { user_dao }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DaoResult<Option<user::Model>> {
        match self.user_dao.find_by_id(id).await {
            Ok(model) => Ok(Some(model)),
            Err(DaoLayerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> DaoResult<Option<user::Model>> {
        self.user_dao.find_by_username(username).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> DaoResult<user::Model> {
        self.user_dao
            .create_user(username, password_hash, role.as_str())
            .await
    }

    pub async fn set_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DaoResult<()> {
        self.user_dao.set_last_login(user_id, at).await
    }
}
