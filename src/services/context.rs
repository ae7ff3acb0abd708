use sea_orm::DatabaseConnection;

use crate::{
    auth::LocalAccounts,
    db::dao::{DaoContext, RefreshTokenDao},
    services::user_service::UserService,
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            daos: DaoContext::new(db),
        }
    }

    pub fn user(&self) -> UserService {
        UserService::new(self.daos.user())
    }

    pub fn accounts(&self) -> LocalAccounts {
        LocalAccounts::new(self.user())
    }

    pub fn refresh_token_dao(&self) -> RefreshTokenDao {
        self.daos.refresh_token()
    }
}
