use async_trait::async_trait;
use uuid::Uuid;

use super::{AccountInfo, AuthError, Role, password::verify_password};
use crate::{
    db::{dao::DaoLayerError, entities::user},
    services::user_service::UserService,
};

/// Account directory consulted by login and rotation.
#[async_trait]
pub trait Accounts: Send + Sync {
    /// `None` when the username is unknown or the password does not match.
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AccountInfo>, AuthError>;

    async fn find_account(&self, id: Uuid) -> Result<Option<AccountInfo>, AuthError>;
}

#[derive(Clone)]
pub struct LocalAccounts {
    users: UserService,
}

impl LocalAccounts {
    pub fn new(users: UserService) -> Self {
        Self { users }
    }
}

fn to_account(model: user::Model) -> AccountInfo {
    AccountInfo {
        id: model.id,
        role: Role::try_from(model.role.as_str()).unwrap_or(Role::User),
        username: model.username,
    }
}

#[async_trait]
impl Accounts for LocalAccounts {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AccountInfo>, AuthError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            return Ok(None);
        };

        if !verify_password(password, &user.password_hash) {
            return Ok(None);
        }

        // The row can vanish between lookup and stamp; that login is simply invalid.
        match self.users.set_last_login(user.id, chrono::Utc::now()).await {
            Ok(()) => Ok(Some(to_account(user))),
            Err(DaoLayerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<AccountInfo>, AuthError> {
        Ok(self.users.find_by_id(id).await?.map(to_account))
    }
}
