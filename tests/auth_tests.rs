//! End-to-end tests for login throttling, sessions and first-run setup.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use ditchfork::config::Config;
use ditchfork::state::SharedState;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "password123";

async fn spawn_app() -> (Arc<SharedState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("ditchfork-auth-test-{}.db", uuid::Uuid::new_v4()));
    let upload_dir =
        std::env::temp_dir().join(format!("ditchfork-auth-uploads-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.storage.upload_dir = upload_dir.display().to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = Arc::new(
        SharedState::new(config, None)
            .await
            .expect("failed to create app state"),
    );
    let router = ditchfork::web::router(state.clone());
    (state, router)
}

async fn spawn_app_with_admin() -> (Arc<SharedState>, Router) {
    let (state, router) = spawn_app().await;
    state
        .auth
        .create_user("admin", PASSWORD)
        .await
        .expect("failed to create admin");
    (state, router)
}

async fn login(app: &Router, address: &str, username: &str, password: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-forwarded-for", address)
                .body(Body::from(format!(
                    "username={username}&password={password}"
                )))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("ditchfork_session={token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn session_token(response: &Response) -> String {
    set_cookie(response)
        .strip_prefix("ditchfork_session=")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or_default()
        .to_string()
}

async fn body_text(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).into_owned()
}

#[tokio::test]
async fn login_sets_hardened_session_cookie() {
    let (_, app) = spawn_app_with_admin().await;

    let response = login(&app, "203.0.113.1", "admin", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/");

    let cookie = set_cookie(&response);
    assert!(cookie.contains("HttpOnly"), "{cookie}");
    assert!(cookie.contains("SameSite=Strict"), "{cookie}");
    assert!(cookie.contains("Secure"), "{cookie}");
    assert!(cookie.contains("Path=/admin"), "{cookie}");
    assert!(cookie.contains("Max-Age=86400"), "{cookie}");

    let token = session_token(&response);
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let dashboard = get(&app, "/admin/", Some(&token)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    assert!(body_text(dashboard).await.contains("Dashboard"));
}

#[tokio::test]
async fn unknown_user_and_wrong_password_get_the_same_answer() {
    let (_, app) = spawn_app_with_admin().await;

    let wrong = login(&app, "203.0.113.2", "admin", "not-the-password").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&wrong).is_empty());
    assert!(body_text(wrong).await.contains("Invalid credentials"));

    let unknown = login(&app, "203.0.113.3", "nobody", PASSWORD).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(unknown).await.contains("Invalid credentials"));
}

#[tokio::test]
async fn three_failures_lock_out_only_that_address() {
    let (_, app) = spawn_app_with_admin().await;

    for _ in 0..3 {
        let response = login(&app, "198.51.100.7", "admin", "wrong-password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let locked = login(&app, "198.51.100.7", "admin", PASSWORD).await;
    assert_eq!(locked.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        locked
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("1")
    );
    assert!(set_cookie(&locked).is_empty());
    assert!(
        body_text(locked)
            .await
            .contains("Too many attempts. Try again in 1s.")
    );

    let other = login(&app, "198.51.100.8", "admin", PASSWORD).await;
    assert_eq!(other.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn successful_login_resets_the_failure_count() {
    let (state, app) = spawn_app_with_admin().await;
    let address = "192.0.2.50";

    for _ in 0..2 {
        login(&app, address, "admin", "wrong-password").await;
    }
    let response = login(&app, address, "admin", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(state.limiter.failure_count(address), 0);

    // A fresh streak gets its free attempts again
    for _ in 0..3 {
        let response = login(&app, address, "admin", "wrong-password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = login(&app, address, "admin", "wrong-password").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let (_, app) = spawn_app_with_admin().await;

    for uri in ["/admin/", "/admin/settings", "/admin/reviews/new", "/admin/metrics"] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/admin/login", "{uri}");

        let response = get(&app, uri, Some("deadbeef")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/admin/login", "{uri}");
    }

    let response = get(&app, "/admin/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_session_redirects_and_is_removed() {
    let (state, app) = spawn_app_with_admin().await;
    let user = state
        .store
        .get_credential("admin")
        .await
        .unwrap()
        .unwrap()
        .user;

    state
        .store
        .create_session("expired-token", user.id, Utc::now() - chrono::Duration::minutes(1))
        .await
        .unwrap();

    let response = get(&app, "/admin/", Some("expired-token")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    assert!(state.store.get_session("expired-token").await.unwrap().is_none());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (state, app) = spawn_app_with_admin().await;
    let token = session_token(&login(&app, "203.0.113.4", "admin", PASSWORD).await);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .header(header::COOKIE, format!("ditchfork_session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie(&response).contains("Max-Age=0"));

    assert!(state.store.get_session(&token).await.unwrap().is_none());
    let response = get(&app, "/admin/", Some(&token)).await;
    assert_eq!(location(&response), "/admin/login");
}

#[tokio::test]
async fn logout_with_unknown_token_still_clears_cookie() {
    let (_, app) = spawn_app_with_admin().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .header(header::COOKIE, "ditchfork_session=never-issued")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("ditchfork_session=;"), "{cookie}");
    assert!(cookie.contains("Max-Age=0"), "{cookie}");
}

#[tokio::test]
async fn setup_is_forced_until_an_admin_exists() {
    let (state, app) = spawn_app().await;

    for uri in ["/", "/admin/login", "/music/albums/anything"] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/setup", "{uri}");
    }

    assert_eq!(get(&app, "/static/style.css", None).await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/setup", None).await.status(), StatusCode::OK);

    let post_setup = |body: &'static str| {
        app.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/setup")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
    };

    let mismatch = post_setup("username=admin&password=password123&password_confirm=password124")
        .await
        .unwrap();
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

    let short = post_setup("username=admin&password=short&password_confirm=short")
        .await
        .unwrap();
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);
    assert!(!state.auth.has_users().await.unwrap());
    assert_eq!(
        state.store.get_settings().await.unwrap().site_title(),
        "Ditchfork"
    );

    let created = post_setup(
        "username=admin&password=password123&password_confirm=password123&site_title=+Pitch+Fork+",
    )
    .await
    .unwrap();
    assert_eq!(created.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&created), "/admin/login");
    assert_eq!(
        state.store.get_settings().await.unwrap().site_title(),
        "Pitch Fork"
    );

    let home = get(&app, "/", None).await;
    assert_eq!(home.status(), StatusCode::OK);
    assert!(body_text(home).await.contains("Pitch Fork"));

    let again = get(&app, "/setup", None).await;
    assert_eq!(again.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&again), "/");

    let response = login(&app, "203.0.113.5", "admin", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn health_endpoint_reports_database() {
    let (_, app) = spawn_app().await;

    let response = get(&app, "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}
