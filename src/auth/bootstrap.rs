use crate::{
    auth::{Role, password::hash_password},
    config::AuthConfig,
    services::user_service::UserService,
};

/// Creates the configured admin account unless it already exists.
/// Without `admin_password` there is nothing to seed.
pub async fn seed_admin(cfg: &AuthConfig, users: &UserService) -> anyhow::Result<()> {
    let Some(password) = cfg.admin_password.as_deref() else {
        tracing::debug!("no admin password configured; skipping admin seed");
        return Ok(());
    };

    if let Some(existing) = users.find_by_username(&cfg.admin_username).await? {
        tracing::info!(username = %existing.username, "admin user already present");
        return Ok(());
    }

    let hash = hash_password(password).map_err(|e| anyhow::anyhow!("admin seed hash error: {e}"))?;
    let user = users
        .create_user(&cfg.admin_username, &hash, Role::Admin)
        .await?;
    tracing::info!(username = %user.username, "seeded admin user");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    use super::seed_admin;
    use crate::{config::AuthConfig, db::entities::user, services::ServiceContext};

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn admin(password_hash: &str) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            password_hash: password_hash.to_string(),
            role: "admin".to_string(),
            created_at: ts(),
            updated_at: ts(),
            last_login_at: None,
        }
    }

    fn cfg(password: Option<&str>) -> AuthConfig {
        AuthConfig {
            admin_password: password.map(str::to_string),
            ..AuthConfig::default()
        }
    }

    #[tokio::test]
    async fn skips_when_no_password_is_configured() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let users = ServiceContext::new(&db).user();

        seed_admin(&cfg(None), &users)
            .await
            .expect("seed should not touch the database");
    }

    #[tokio::test]
    async fn leaves_an_existing_admin_untouched() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin("existing-hash")]])
            .into_connection();
        let users = ServiceContext::new(&db).user();

        seed_admin(&cfg(Some("password123")), &users)
            .await
            .expect("seed should not insert a second admin");
    }

    #[tokio::test]
    async fn creates_the_admin_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[admin("new-hash")]])
            .into_connection();
        let users = ServiceContext::new(&db).user();

        seed_admin(&cfg(Some("password123")), &users)
            .await
            .expect("seed should insert the admin");
    }
}
