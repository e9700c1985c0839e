//! 인증 endpoint.
//!
//! - `POST /login`: 폼 자격 증명으로 토큰 쌍 발급
//! - `POST /login/test-token`: Bearer 토큰의 신원 확인
//! - `POST /refresh`: refresh 토큰 회전
//! - `POST /logout`: refresh 세션 즉시 폐기
//! - `POST /password-recovery/{email}`: 재설정 메일 발송
//! - `POST /reset-password`: 재설정 토큰으로 비밀번호 교체

use std::sync::Arc;

use analyzer_core::AuthenticatedIdentity;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Path, State,
    },
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::auth::{CurrentUser, IssuedSession};
use crate::error::{ApiResult, AuthApiError};
use crate::instrument::instrumented;
use crate::metrics::{record_login, record_token_rejection};
use crate::state::AppState;

/// 로그인 폼 (`application/x-www-form-urlencoded`).
///
/// `grant_type`, `scope` 등 추가 필드는 무시합니다.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// 토큰 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
}

impl From<IssuedSession> for TokenResponse {
    fn from(issued: IssuedSession) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: "bearer".to_string(),
            refresh_token: issued.refresh_token,
        }
    }
}

/// refresh 토큰 요청.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// 비밀번호 재설정 요청.
#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 30))]
    pub token: String,
    #[validate(length(min = 8, max = 14))]
    pub password: String,
}

/// 단순 메시지 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct Msg {
    pub msg: String,
}

impl Msg {
    fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self { msg: msg.into() })
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AuthApiError::Validation(rejection.body_text()))
}

/// 로그인.
///
/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Form(form) = form.map_err(|rejection| AuthApiError::Validation(rejection.body_text()))?;

    match instrumented("login", state.sessions.login(&form.username, &form.password)).await {
        Ok(issued) => {
            record_login("success");
            Ok(Json(issued.into()))
        }
        Err(e) => {
            record_login(e.outcome());
            Err(e.into())
        }
    }
}

/// 현재 토큰의 신원 확인.
///
/// POST /auth/login/test-token
async fn test_token(CurrentUser(identity): CurrentUser) -> Json<AuthenticatedIdentity> {
    Json(identity)
}

/// refresh 토큰 회전.
///
/// POST /auth/refresh
async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let request = json_body(payload)?;

    let issued = instrumented("refresh", state.sessions.refresh(&request.refresh_token))
        .await
        .map_err(|e| {
            record_token_rejection(e.outcome());
            AuthApiError::from(e)
        })?;

    Ok(Json(issued.into()))
}

/// 로그아웃.
///
/// POST /auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<Msg>> {
    let request = json_body(payload)?;
    state.sessions.logout(&request.refresh_token).await?;

    Ok(Msg::new("Logged out"))
}

/// 비밀번호 복구 메일 발송.
///
/// POST /auth/password-recovery/{email}
async fn recover_password(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<Json<Msg>> {
    if !email.validate_email() {
        return Err(AuthApiError::Validation("Invalid email address".to_string()));
    }

    instrumented("password_recovery", state.recovery.recover(&email)).await?;
    Ok(Msg::new("Password recovery email sent"))
}

/// 비밀번호 재설정.
///
/// POST /auth/reset-password
async fn reset_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Msg>> {
    let request = json_body(payload)?;
    request
        .validate()
        .map_err(|e| AuthApiError::Validation(e.to_string()))?;

    let email = instrumented(
        "password_reset",
        state.recovery.reset(&request.token, &request.password),
    )
    .await?;

    Ok(Msg::new(format!("Password updated successfully for {}", email)))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/login/test-token", post(test_token))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/password-recovery/{email}", post(recover_password))
        .route("/reset-password", post(reset_password))
}
