//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 같은 JSON 형식을 사용합니다.
//! 토큰, 비밀번호, 해시, 내부 에러 내용은 응답에 포함되지 않습니다.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{RecoveryError, ResolveError, SessionError};
use analyzer_core::TokenError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "TOKEN_EXPIRED",
///   "message": "Token expired",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_CREDENTIALS", "TOKEN_EXPIRED")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 인증 API 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Inactive user")]
    InactiveUser,
    #[error("Could not insert data in Authentication database")]
    SessionNotPersisted,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Token expired")]
    TokenExpired,
    /// 클레임 불일치 (403)
    #[error("Could not validate credentials")]
    CredentialsForbidden,
    /// 형식/서명 오류, 알 수 없는 사용자 (401)
    #[error("Could not validate credentials")]
    CredentialsRejected,
    #[error("Invalid token")]
    InvalidResetToken,
    #[error("The user with this email does not exist in the system.")]
    UserNotFound,
    #[error("There was an issue with the request")]
    BadRequest,
    #[error("{0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal,
}

impl AuthApiError {
    /// HTTP 상태 코드와 에러 코드.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentials => (StatusCode::NOT_FOUND, "INVALID_CREDENTIALS"),
            Self::InactiveUser => (StatusCode::BAD_REQUEST, "INACTIVE_USER"),
            Self::SessionNotPersisted => (StatusCode::BAD_REQUEST, "SESSION_NOT_PERSISTED"),
            Self::NotAuthenticated => (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::CredentialsForbidden => (StatusCode::FORBIDDEN, "INVALID_CLAIMS"),
            Self::CredentialsRejected => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::InvalidResetToken => (StatusCode::BAD_REQUEST, "INVALID_RESET_TOKEN"),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            Self::BadRequest => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = Json(ApiErrorResponse::new(code, self.to_string()));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<TokenError> for AuthApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::TokenExpired,
            TokenError::ClaimsInvalid(_) => Self::CredentialsForbidden,
            TokenError::Malformed => Self::CredentialsRejected,
            TokenError::Configuration(_) | TokenError::Encoding => {
                error!(error = %e, "Token signing failed");
                Self::Internal
            }
        }
    }
}

impl From<SessionError> for AuthApiError {
    fn from(e: SessionError) -> Self {
        match e {
            // 사용자 존재 여부를 드러내지 않음
            SessionError::UnknownUser | SessionError::IncorrectPassword => Self::InvalidCredentials,
            SessionError::InactiveUser => Self::InactiveUser,
            SessionError::Token(token) => token.into(),
            SessionError::Revoked => Self::CredentialsRejected,
            SessionError::Store(_) | SessionError::NotPersisted => Self::SessionNotPersisted,
            SessionError::Repository(_) => Self::BadRequest,
            SessionError::Password(inner) => {
                error!(error = %inner, "Password verification failed");
                Self::Internal
            }
        }
    }
}

impl From<ResolveError> for AuthApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unauthenticated => Self::NotAuthenticated,
            ResolveError::Expired => Self::TokenExpired,
            ResolveError::ClaimsInvalid(_) => Self::CredentialsForbidden,
            ResolveError::Rejected => Self::CredentialsRejected,
        }
    }
}

impl From<RecoveryError> for AuthApiError {
    fn from(e: RecoveryError) -> Self {
        match e {
            RecoveryError::Repository(_) | RecoveryError::Store(_) => Self::BadRequest,
            RecoveryError::UserNotFound => Self::UserNotFound,
            RecoveryError::InvalidToken => Self::InvalidResetToken,
            RecoveryError::WeakPassword(message) => Self::Validation(message.to_string()),
            other => {
                error!(error = %other, "Password recovery failed");
                Self::Internal
            }
        }
    }
}

/// API 핸들러 결과 타입.
pub type ApiResult<T> = Result<T, AuthApiError>;
