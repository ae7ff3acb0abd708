use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tempfile::TempDir;
use uuid::Uuid;

use backoffice_auth::{
    auth::{
        Accounts, AuthError, RequestMeta, Role, TokenCodec,
        password::hash_password,
        store::{RefreshTokenStore, hash_token},
    },
    config::DatabaseConfig,
    db::{connect, entities::refresh_token},
    services::{AuthService, ServiceContext},
    test_helpers::test_auth_config,
};

struct SqliteApp {
    _dir: TempDir,
    db: DatabaseConnection,
    store: Arc<dyn RefreshTokenStore>,
    service: AuthService,
}

async fn sqlite_app() -> SqliteApp {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("auth.db");
    let db = connect(&DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 4,
        min_idle: 1,
    })
    .await
    .unwrap();

    let services = ServiceContext::new(&db);
    services
        .user()
        .create_user("alice", &hash_password("password123").unwrap(), Role::User)
        .await
        .unwrap();

    let store: Arc<dyn RefreshTokenStore> = Arc::new(services.refresh_token_dao());
    let accounts: Arc<dyn Accounts> = Arc::new(services.accounts());
    let service = AuthService::new(
        TokenCodec::new(&test_auth_config()),
        store.clone(),
        accounts,
    );
    SqliteApp {
        _dir: dir,
        db,
        store,
        service,
    }
}

async fn family_of(app: &SqliteApp, raw: &str) -> Uuid {
    app.store
        .find_by_hash(&hash_token(raw))
        .await
        .unwrap()
        .expect("token is persisted")
        .token_family
}

async fn family_members(app: &SqliteApp, family: Uuid) -> Vec<refresh_token::Model> {
    refresh_token::Entity::find()
        .filter(refresh_token::Column::TokenFamily.eq(family))
        .all(&app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn rotation_links_successor_in_the_database() {
    let app = sqlite_app().await;
    let meta = RequestMeta::default();
    let r1 = app
        .service
        .login("alice", "password123", &meta)
        .await
        .unwrap()
        .tokens
        .refresh_token;

    let r2 = app.service.refresh(&r1, &meta).await.unwrap().refresh_token;
    let family = family_of(&app, &r1).await;
    assert_eq!(family_of(&app, &r2).await, family);

    let old = app.store.find_by_hash(&hash_token(&r1)).await.unwrap().unwrap();
    let new = app.store.find_by_hash(&hash_token(&r2)).await.unwrap().unwrap();
    assert_eq!(old.replaced_by_token_id, Some(new.id));
    assert!(new.is_usable(chrono::Utc::now()));

    let reuse = app.service.refresh(&r1, &meta).await;
    assert!(matches!(reuse, Err(AuthError::TokenReused)));
    assert!(
        family_members(&app, family)
            .await
            .iter()
            .all(|member| member.revoked_at.is_some())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_of_one_token_have_a_single_winner() {
    let app = sqlite_app().await;

    for _ in 0..5 {
        let r1 = app
            .service
            .login("alice", "password123", &RequestMeta::default())
            .await
            .unwrap()
            .tokens
            .refresh_token;

        let spawn_refresh = |service: AuthService, raw: String| {
            tokio::spawn(async move { service.refresh(&raw, &RequestMeta::default()).await })
        };
        let first = spawn_refresh(app.service.clone(), r1.clone());
        let second = spawn_refresh(app.service.clone(), r1.clone());
        let outcomes = [first.await.unwrap(), second.await.unwrap()];

        let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let reused = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(AuthError::TokenReused)))
            .count();
        assert_eq!((winners, reused), (1, 1), "outcomes: {outcomes:?}");

        let members = family_members(&app, family_of(&app, &r1).await).await;
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|member| member.revoked_at.is_some()));
    }
}
