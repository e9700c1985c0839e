//! 인증 API 통합 테스트
//!
//! 인메모리 협력자와 고정 시계로 라우터 전체를 구동합니다.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use analyzer_api::{create_api_router, AppState, Collaborators};
use analyzer_core::{
    AppConfig, AuthenticatedIdentity, ClaimsBuilder, DatabaseConfig, FixedClock, HashingConfig,
    LoggingConfig, MailerError, PasswordHasher, RedisConfig, ResetMailer, Scope, SecurityConfig,
    ServerConfig, TokenCodec, UserRecord,
};
use analyzer_data::{MemoryTokenStore, MemoryUserRepository};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "integration-secret-key-with-enough-length";
const ISSUER: &str = "http://localhost:8000";
const AUDIENCE: &str = "http://localhost:8000/api/v1/auth/login";
const NOW: i64 = 1_700_000_000;
const PASSWORD: &str = "Password123";

/// 발송된 재설정 토큰을 보관하는 메일러
#[derive(Default)]
struct CapturingMailer {
    tokens: Mutex<Vec<String>>,
}

impl CapturingMailer {
    fn last_token(&self) -> Option<String> {
        self.tokens.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ResetMailer for CapturingMailer {
    async fn send_reset_link(
        &self,
        _email: &str,
        _username: &str,
        token: &str,
    ) -> Result<(), MailerError> {
        self.tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

struct Harness {
    app: Router,
    clock: Arc<FixedClock>,
    store: Arc<MemoryTokenStore>,
    users: Arc<MemoryUserRepository>,
    mailer: Arc<CapturingMailer>,
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        security: SecurityConfig {
            secret_key: SecretString::new(SECRET.into()),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_minutes: 60 * 24 * 7,
            audience: AUDIENCE.to_string(),
            issuer: ISSUER.to_string(),
            email_reset_token_expire_hours: 48,
            hashing: cheap_hashing(),
        },
        redis: RedisConfig::default(),
        database: DatabaseConfig::default(),
        logging: LoggingConfig::default(),
    }
}

fn cheap_hashing() -> HashingConfig {
    HashingConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

async fn harness() -> Harness {
    let hasher = PasswordHasher::new(&cheap_hashing()).unwrap();
    let users = Arc::new(MemoryUserRepository::new());
    users
        .insert(UserRecord {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            hashed_password: hasher.hash(PASSWORD).unwrap(),
            is_active: true,
        })
        .await;
    users
        .insert(UserRecord {
            id: 2,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            hashed_password: hasher.hash(PASSWORD).unwrap(),
            is_active: false,
        })
        .await;

    let clock = Arc::new(FixedClock::at(NOW));
    let store = Arc::new(MemoryTokenStore::new());
    let mailer = Arc::new(CapturingMailer::default());
    let config = Arc::new(test_config());

    let state = AppState::new(
        Arc::clone(&config),
        Collaborators {
            users: users.clone(),
            tokens: store.clone(),
            mailer: mailer.clone(),
            clock: clock.clone(),
            database: None,
        },
    )
    .unwrap();

    let app = create_api_router(&config.server.api_prefix).with_state(Arc::new(state));

    Harness {
        app,
        clock,
        store,
        users,
        mailer,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "grant_type=password&username={}&password={}",
            username, password
        )))
        .unwrap()
}

fn test_token_request(token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login/test-token")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn token_field(body: &Value, field: &str) -> String {
    body[field].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_active_user_returns_token_pair() {
    let h = harness().await;

    let (status, body) = send(&h.app, login_request("alice", PASSWORD)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(!token_field(&body, "access_token").is_empty());
    assert!(!token_field(&body, "refresh_token").is_empty());
    assert_eq!(h.store.live_count().await, 1);
}

#[tokio::test]
async fn test_login_inactive_user_is_bad_request() {
    let h = harness().await;

    let (status, body) = send(&h.app, login_request("bob", PASSWORD)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Inactive user");
    assert_eq!(h.store.live_count().await, 0);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let h = harness().await;

    let (wrong_status, wrong_body) = send(&h.app, login_request("alice", "Wrong12345")).await;
    let (unknown_status, unknown_body) = send(&h.app, login_request("nobody", PASSWORD)).await;

    assert_eq!(wrong_status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_status, StatusCode::NOT_FOUND);
    assert_eq!(wrong_body["code"], unknown_body["code"]);
    assert_eq!(wrong_body["message"], unknown_body["message"]);
}

#[tokio::test]
async fn test_empty_password_does_not_reveal_known_usernames() {
    let h = harness().await;

    let (known_status, known_body) = send(&h.app, login_request("alice", "")).await;
    let (unknown_status, unknown_body) = send(&h.app, login_request("nobody", "")).await;

    assert_eq!(known_status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_status, StatusCode::NOT_FOUND);
    assert_eq!(known_body["code"], "INVALID_CREDENTIALS");
    assert_eq!(known_body["code"], unknown_body["code"]);
    assert_eq!(known_body["message"], unknown_body["message"]);
}

#[tokio::test]
async fn test_test_token_echoes_identity() {
    let h = harness().await;
    let (_, body) = send(&h.app, login_request("alice", PASSWORD)).await;
    let access = token_field(&body, "access_token");

    let (status, identity) = send(&h.app, test_token_request(&access)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(identity["id"], 1);
    assert_eq!(identity["username"], "alice");
    assert_eq!(identity["email"], "alice@example.com");
}

#[tokio::test]
async fn test_expired_access_token_is_unauthorized() {
    let h = harness().await;
    let (_, body) = send(&h.app, login_request("alice", PASSWORD)).await;
    let access = token_field(&body, "access_token");

    // exp가 1초 지난 시점
    h.clock.advance(30 * 60 + 1);
    let (status, error) = send(&h.app, test_token_request(&access)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "TOKEN_EXPIRED");
    assert_eq!(error["message"], "Token expired");
}

#[tokio::test]
async fn test_wrong_audience_token_is_forbidden() {
    let h = harness().await;

    let foreign = TokenCodec::new(
        SECRET,
        "HS256",
        ISSUER,
        "http://elsewhere/login",
        h.clock.clone(),
    )
    .unwrap();
    let identity = AuthenticatedIdentity {
        id: 1,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
    };
    let claims = ClaimsBuilder::new(ISSUER, "http://elsewhere/login").build(
        &identity,
        Scope::AccessToken,
        chrono::DateTime::from_timestamp(NOW, 0).unwrap(),
        Duration::from_secs(600),
    );
    let token = foreign.encode(&claims).unwrap();

    let (status, error) = send(&h.app, test_token_request(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["message"], "Could not validate credentials");
}

#[tokio::test]
async fn test_login_fails_when_store_unreachable() {
    let h = harness().await;
    h.store.set_unavailable(true);

    let (status, body) = send(&h.app, login_request("alice", PASSWORD)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("access_token").is_none());
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn test_refresh_rotates_and_old_token_is_rejected() {
    let h = harness().await;
    let (_, body) = send(&h.app, login_request("alice", PASSWORD)).await;
    let refresh = token_field(&body, "refresh_token");

    let (status, rotated) = send(
        &h.app,
        json_request("/api/v1/auth/refresh", serde_json::json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(token_field(&rotated, "refresh_token"), refresh);
    assert_eq!(h.store.live_count().await, 1);

    let (status, _) = send(
        &h.app,
        json_request("/api/v1/auth/refresh", serde_json::json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let h = harness().await;
    let (_, body) = send(&h.app, login_request("alice", PASSWORD)).await;
    let access = token_field(&body, "access_token");

    let (status, _) = send(
        &h.app,
        json_request("/api/v1/auth/refresh", serde_json::json!({ "refresh_token": access })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_revokes_only_that_session() {
    let h = harness().await;
    let (_, first) = send(&h.app, login_request("alice", PASSWORD)).await;
    let (_, second) = send(&h.app, login_request("alice", PASSWORD)).await;
    assert_eq!(h.store.live_count().await, 2);

    let first_refresh = token_field(&first, "refresh_token");
    let (status, body) = send(
        &h.app,
        json_request("/api/v1/auth/logout", serde_json::json!({ "refresh_token": first_refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Logged out");
    assert_eq!(h.store.live_count().await, 1);

    let (status, _) = send(
        &h.app,
        json_request("/api/v1/auth/refresh", serde_json::json!({ "refresh_token": first_refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &h.app,
        json_request(
            "/api/v1/auth/refresh",
            serde_json::json!({ "refresh_token": token_field(&second, "refresh_token") }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_is_single_use() {
    let h = harness().await;

    let (status, body) = send(
        &h.app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/password-recovery/alice@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Password recovery email sent");

    let token = h.mailer.last_token().unwrap();
    let reset = serde_json::json!({ "token": token, "password": "NewPassword9" });

    let (status, body) =
        send(&h.app, json_request("/api/v1/auth/reset-password", reset.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["msg"],
        "Password updated successfully for alice@example.com"
    );

    let (status, body) = send(&h.app, json_request("/api/v1/auth/reset-password", reset)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid token");

    let (status, _) = send(&h.app, login_request("alice", "NewPassword9")).await;
    assert_eq!(status, StatusCode::OK);
    let stored = h.users.get(1).await.unwrap();
    assert!(!stored.hashed_password.is_empty());
}

#[tokio::test]
async fn test_reset_token_survives_repository_outage() {
    let h = harness().await;
    send(
        &h.app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/password-recovery/alice@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let token = h.mailer.last_token().unwrap();
    let reset = serde_json::json!({ "token": token, "password": "NewPassword9" });

    h.users.set_failing(true);
    let (status, _) =
        send(&h.app, json_request("/api/v1/auth/reset-password", reset.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    h.users.set_failing(false);
    let (status, body) = send(&h.app, json_request("/api/v1/auth/reset-password", reset)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["msg"],
        "Password updated successfully for alice@example.com"
    );
}

#[tokio::test]
async fn test_password_recovery_unknown_email() {
    let h = harness().await;

    let (status, _) = send(
        &h.app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/password-recovery/ghost@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.mailer.last_token().is_none());
}

#[tokio::test]
async fn test_reset_token_is_not_a_session_token() {
    let h = harness().await;
    send(
        &h.app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/password-recovery/alice@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let token = h.mailer.last_token().unwrap();

    let (status, _) = send(&h.app, test_token_request(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_readiness_reports_store_outage() {
    let h = harness().await;
    let ready = || {
        Request::builder()
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&h.app, ready()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    h.store.set_unavailable(true);
    let (status, body) = send(&h.app, ready()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["components"]["token_store"]["status"], "down");
}
