use std::sync::Arc;

use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for `oneshot`

use backoffice_auth::{
    auth::{
        Role,
        store::{InMemoryRefreshTokenStore, RefreshTokenStore, hash_token},
    },
    routes::API_PREFIX,
    test_helpers::{StaticAccounts, test_router, test_state},
};

struct TestApp {
    router: Router,
    store: Arc<InMemoryRefreshTokenStore>,
}

fn app() -> TestApp {
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let accounts = StaticAccounts::new()
        .with_user("alice", "password123", Role::User)
        .with_user("root", "adminpassword", Role::Admin);
    let router = test_router(test_state(store.clone(), accounts));
    TestApp { router, store }
}

fn api_path(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.router.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let body = body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(app: &TestApp, path: &str, payload: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(api_path(path))
            .header("content-type", "application/json")
            .header("user-agent", "auth-flow-tests")
            .header("x-forwarded-for", "203.0.113.5")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await
}

async fn with_bearer(app: &TestApp, method: &str, path: &str, token: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(api_path(path))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

async fn login(app: &TestApp, username: &str, password: &str) -> Value {
    let (status, body) = post_json(
        app,
        "/auth/login",
        json!({"username": username, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body
}

async fn refresh(app: &TestApp, refresh_token: &str) -> (StatusCode, Value) {
    post_json(app, "/auth/refresh", json!({"refreshToken": refresh_token})).await
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().unwrap_or_else(|| panic!("missing {field} in {body}"))
}

#[tokio::test]
async fn login_returns_camel_case_pair_and_user() {
    let app = app();
    let body = login(&app, "root", "adminpassword").await;

    assert!(body["accessToken"].as_str().is_some());
    assert!(body["refreshToken"].as_str().is_some());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 900);
    assert_eq!(body["user"]["username"], "root");
    assert_eq!(body["user"]["role"], "admin");

    let record = app
        .store
        .find_by_hash(&hash_token(str_field(&body, "refreshToken")))
        .await
        .unwrap()
        .expect("refresh token should be persisted");
    assert_eq!(record.ip_address.as_deref(), Some("203.0.113.5"));
    assert_eq!(record.user_agent.as_deref(), Some("auth-flow-tests"));
}

#[tokio::test]
async fn bad_credentials_are_rejected_generically() {
    let app = app();
    for payload in [
        json!({"username": "alice", "password": "wrong-password"}),
        json!({"username": "nobody", "password": "password123"}),
    ] {
        let (status, body) = post_json(&app, "/auth/login", payload).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Invalid credentials");
    }
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn alice_reuse_scenario_revokes_the_family() {
    let app = app();
    let first = login(&app, "alice", "password123").await;
    let r1 = str_field(&first, "refreshToken").to_string();

    let (status, second) = refresh(&app, &r1).await;
    assert_eq!(status, StatusCode::OK);
    let r2 = str_field(&second, "refreshToken").to_string();
    let a2 = str_field(&second, "accessToken").to_string();
    assert_ne!(r1, r2);

    let r1_record = app
        .store
        .find_by_hash(&hash_token(&r1))
        .await
        .unwrap()
        .expect("r1 is recorded");
    let r2_record = app
        .store
        .find_by_hash(&hash_token(&r2))
        .await
        .unwrap()
        .expect("r2 is recorded");
    assert_eq!(r1_record.token_family, r2_record.token_family);
    assert_eq!(r1_record.replaced_by_token_id, Some(r2_record.id));

    let (status, reuse) = refresh(&app, &r1).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reuse["status"], 401);
    assert!(
        app.store
            .family(r1_record.token_family)
            .iter()
            .all(|record| record.is_revoked())
    );

    let (status, revoked) = refresh(&app, &r2).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(revoked["message"], reuse["message"]);

    // The access token stays valid until it expires; only refresh is cut off.
    let (status, me) = with_bearer(&app, "GET", "/me", &a2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "user");

    let again = login(&app, "alice", "password123").await;
    let (status, _) = refresh(&app, str_field(&again, "refreshToken")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_is_idempotent_and_final() {
    let app = app();
    let body = login(&app, "alice", "password123").await;
    let r1 = str_field(&body, "refreshToken").to_string();

    for _ in 0..2 {
        let (status, body) = post_json(&app, "/auth/logout", json!({"refreshToken": r1})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out");
    }
    let (status, _) = post_json(&app, "/auth/logout", json!({"refreshToken": "garbage"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = refresh(&app, &r1).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_all_revokes_every_device() {
    let app = app();
    let laptop = login(&app, "alice", "password123").await;
    let phone = login(&app, "alice", "password123").await;

    let (status, body) = with_bearer(
        &app,
        "POST",
        "/auth/logout-all",
        str_field(&phone, "accessToken"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], 2);

    for session in [&laptop, &phone] {
        let (status, _) = refresh(&app, str_field(session, "refreshToken")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn protected_routes_require_an_access_token() {
    let app = app();
    let body = login(&app, "alice", "password123").await;

    let (status, json) = send(
        &app,
        Request::builder()
            .uri(api_path("/me"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);

    let (status, _) = with_bearer(&app, "GET", "/me", str_field(&body, "refreshToken")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        with_bearer(&app, "POST", "/auth/logout-all", str_field(&body, "refreshToken")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = app();
    let (status, body) = post_json(&app, "/auth/refresh", json!({"token": "x"})).await;
    assert!(status.is_client_error());
    assert_eq!(body["status"], status.as_u16());
}
