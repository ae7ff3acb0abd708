use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::{
    auth::store::{NewRefreshToken, RefreshTokenRecord, RefreshTokenStore},
    db::entities::refresh_token::{self, Column, Entity as RefreshToken},
};

#[derive(Clone)]
pub struct RefreshTokenDao {
    db: DatabaseConnection,
}

impl DaoBase for RefreshTokenDao {
    type Entity = RefreshToken;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl From<refresh_token::Model> for RefreshTokenRecord {
    fn from(model: refresh_token::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            token_hash: model.token_hash,
            token_family: model.token_family,
            expires_at: model.expires_at.to_utc(),
            revoked_at: model.revoked_at.map(|at| at.to_utc()),
            claimed_at: model.claimed_at.map(|at| at.to_utc()),
            replaced_by_token_id: model.replaced_by_token_id,
            created_at: model.created_at.to_utc(),
            ip_address: model.ip_address,
            user_agent: model.user_agent,
        }
    }
}

async fn insert<C: ConnectionTrait>(
    conn: &C,
    token: NewRefreshToken,
) -> Result<refresh_token::Model, DbErr> {
    let model = refresh_token::ActiveModel {
        id: Set(token.id),
        user_id: Set(token.user_id),
        token_hash: Set(token.token_hash),
        token_family: Set(token.token_family),
        expires_at: Set(token.expires_at.fixed_offset()),
        revoked_at: Set(None),
        claimed_at: Set(None),
        replaced_by_token_id: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
        ip_address: Set(token.meta.ip_address),
        user_agent: Set(token.meta.user_agent),
        ..Default::default()
    };
    model.insert(conn).await
}

// Conditional update: the row only changes while nothing has claimed,
// replaced or revoked it, so concurrent callers cannot both succeed.
async fn claim<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<bool, DbErr> {
    let result = RefreshToken::update_many()
        .col_expr(Column::ClaimedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Id.eq(id))
        .filter(Column::RevokedAt.is_null())
        .filter(Column::ReplacedByTokenId.is_null())
        .filter(Column::ClaimedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn link<C: ConnectionTrait>(conn: &C, id: Uuid, successor_id: Uuid) -> Result<(), DbErr> {
    RefreshToken::update_many()
        .col_expr(Column::ReplacedByTokenId, Expr::value(successor_id))
        .filter(Column::Id.eq(id))
        .filter(Column::ReplacedByTokenId.is_null())
        .exec(conn)
        .await?;
    Ok(())
}

impl RefreshTokenDao {
    async fn revoke_where(&self, condition: sea_orm::Condition) -> DaoResult<u64> {
        let result = RefreshToken::update_many()
            .col_expr(Column::RevokedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(condition)
            .filter(Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenDao {
    async fn create(&self, token: NewRefreshToken) -> DaoResult<RefreshTokenRecord> {
        Ok(insert(&self.db, token).await?.into())
    }

    async fn find_by_hash(&self, token_hash: &str) -> DaoResult<Option<RefreshTokenRecord>> {
        let model = RefreshToken::find()
            .filter(Column::TokenHash.eq(token_hash))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> DaoResult<Option<RefreshTokenRecord>> {
        match DaoBase::find_by_id(self, id).await {
            Ok(model) => Ok(Some(model.into())),
            Err(DaoLayerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn try_claim(&self, id: Uuid) -> DaoResult<bool> {
        Ok(claim(&self.db, id).await?)
    }

    async fn set_replaced_by(&self, id: Uuid, successor_id: Uuid) -> DaoResult<()> {
        Ok(link(&self.db, id, successor_id).await?)
    }

    async fn revoke(&self, id: Uuid) -> DaoResult<()> {
        self.revoke_where(sea_orm::Condition::all().add(Column::Id.eq(id)))
            .await
            .map(|_| ())
    }

    async fn revoke_family(&self, family: Uuid) -> DaoResult<u64> {
        self.revoke_where(sea_orm::Condition::all().add(Column::TokenFamily.eq(family)))
            .await
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        self.revoke_where(sea_orm::Condition::all().add(Column::UserId.eq(user_id)))
            .await
    }

    async fn family_has_revoked_member(&self, family: Uuid) -> DaoResult<bool> {
        let revoked = RefreshToken::find()
            .filter(Column::TokenFamily.eq(family))
            .filter(Column::RevokedAt.is_not_null())
            .one(&self.db)
            .await?;
        Ok(revoked.is_some())
    }

    async fn rotate(
        &self,
        id: Uuid,
        successor: NewRefreshToken,
    ) -> DaoResult<Option<RefreshTokenRecord>> {
        let txn = self.db.begin().await?;
        if !claim(&txn, id).await? {
            txn.rollback().await?;
            return Ok(None);
        }

        let successor = insert(&txn, successor).await?;
        link(&txn, id, successor.id).await?;
        txn.commit().await?;
        Ok(Some(successor.into()))
    }
}
