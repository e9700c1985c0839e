//! JWT 클레임 집합.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AuthenticatedIdentity, SessionKey};

/// `sub` 클레임 접두사. 전체 형식은 `"username:<user_id>"`.
pub const SUBJECT_PREFIX: &str = "username:";

/// 토큰 용도.
///
/// access 토큰을 refresh 토큰 자리에 (또는 그 반대로) 사용할 수 없도록
/// 디코딩 시 항상 대조합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// 짧은 수명의 API 호출용 토큰
    AccessToken,
    /// 새 access 토큰 발급용 토큰
    RefreshToken,
}

impl Scope {
    /// 직렬화 값과 같은 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// 세션 토큰 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer - 발급자 URL
    pub iss: String,
    /// Audience - 수신자 (로그인 엔드포인트 URL)
    pub aud: String,
    /// Subject - `"username:<user_id>"`
    pub sub: String,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Not Before (Unix timestamp)
    pub nbf: i64,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// JWT ID - 토큰마다 새로 생성
    pub jti: Uuid,
    /// 토큰 용도
    pub scope: Scope,
    /// 별칭
    pub nickname: String,
    /// 선호 사용자 이름 (요청 시 사용자 조회 키)
    pub preferred_username: String,
    /// 이메일
    pub email: String,
}

impl Claims {
    /// `sub`에서 사용자 ID 추출.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.strip_prefix(SUBJECT_PREFIX)?.parse().ok()
    }

    /// 이 토큰의 세션 키 (`"<user_id>:<jti>"`).
    pub fn session_key(&self) -> Option<SessionKey> {
        self.user_id().map(|user_id| SessionKey::new(user_id, self.jti))
    }
}

/// 클레임 빌더.
///
/// 발급자와 audience는 설정에서 한 번 정해지고, 호출마다 새 `jti`를 생성합니다.
/// 같은 로그인에서 발급되는 access/refresh 토큰도 서로 다른 `jti`를 가집니다.
#[derive(Debug, Clone)]
pub struct ClaimsBuilder {
    issuer: String,
    audience: String,
}

impl ClaimsBuilder {
    /// 새 빌더 생성.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// 발급자 URL.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// 기대 audience.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// 주체에 대한 클레임 생성.
    ///
    /// `exp = iat + ttl`, `nbf = iat - 1` (발급 직후 사용 시 시계 오차 흡수).
    ///
    /// # Arguments
    ///
    /// * `identity` - 토큰 주체
    /// * `scope` - 토큰 용도
    /// * `issued_at` - 발급 시각
    /// * `ttl` - 수명 (초 단위로 절삭, 최소 1초)
    pub fn build(
        &self,
        identity: &AuthenticatedIdentity,
        scope: Scope,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Claims {
        let iat = issued_at.timestamp();
        // exp는 항상 iat보다 뒤
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);

        Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: format!("{}{}", SUBJECT_PREFIX, identity.id),
            exp: iat.saturating_add(ttl_secs),
            nbf: iat - 1,
            iat,
            jti: Uuid::new_v4(),
            scope,
            nickname: identity.username.clone(),
            preferred_username: identity.username.clone(),
            email: identity.email.clone(),
        }
    }
}
