//! 요청별 현재 사용자 확인.
//!
//! `Authorization: Bearer <token>` 헤더의 access 토큰을 검증하고 사용자
//! 저장소에서 신원을 조회합니다. 호출자에게는 실패 종류만 전달되고 내부
//! 에러 내용은 노출되지 않습니다.

use std::sync::Arc;

use analyzer_core::{
    AuthenticatedIdentity, ClaimsMismatch, Scope, TokenCodec, TokenError, UserRepository,
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use crate::error::AuthApiError;
use crate::instrument::instrumented;
use crate::metrics::record_token_rejection;
use crate::state::AppState;

/// 사용자 확인 실패 (종단 상태).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Bearer 토큰 없음
    #[error("인증 토큰이 없습니다")]
    Unauthenticated,
    /// 만료된 토큰
    #[error("토큰이 만료되었습니다")]
    Expired,
    /// audience/issuer/scope/nbf 불일치
    #[error("토큰 클레임 불일치: {0}")]
    ClaimsInvalid(ClaimsMismatch),
    /// 그 밖의 모든 실패
    #[error("자격 증명을 확인할 수 없습니다")]
    Rejected,
}

impl ResolveError {
    /// 메트릭 라벨.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "missing",
            Self::Expired => "expired",
            Self::ClaimsInvalid(_) => "claims_invalid",
            Self::Rejected => "rejected",
        }
    }
}

/// `Authorization` 헤더 값에서 Bearer 토큰을 꺼냅니다.
///
/// 스킴은 대소문자를 구분하지 않습니다.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// 현재 사용자 확인기.
pub struct CurrentUserResolver {
    codec: TokenCodec,
    users: Arc<dyn UserRepository>,
}

impl CurrentUserResolver {
    pub fn new(codec: TokenCodec, users: Arc<dyn UserRepository>) -> Self {
        Self { codec, users }
    }

    /// `Authorization` 헤더 값으로 신원을 확인합니다.
    pub async fn resolve(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedIdentity, ResolveError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(ResolveError::Unauthenticated)?;

        let claims = self
            .codec
            .decode(token, Scope::AccessToken)
            .map_err(|e| match e {
                TokenError::Expired => ResolveError::Expired,
                TokenError::ClaimsInvalid(mismatch) => ResolveError::ClaimsInvalid(mismatch),
                other => {
                    debug!(kind = other.kind(), "Token rejected");
                    ResolveError::Rejected
                }
            })?;

        if claims.preferred_username.is_empty() {
            return Err(ResolveError::Rejected);
        }

        let user = self
            .users
            .find_by_username(&claims.preferred_username)
            .await
            .map_err(|e| {
                warn!(error = %e, "User lookup failed during token resolution");
                ResolveError::Rejected
            })?
            .ok_or(ResolveError::Rejected)?;

        Ok(user.identity())
    }
}

/// 인증된 현재 사용자 추출기.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> Json<AuthenticatedIdentity> {
///     Json(identity)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let identity = instrumented("resolve_current_user", state.resolver.resolve(header))
            .await
            .map_err(|e| {
                record_token_rejection(e.kind());
                AuthApiError::from(e)
            })?;

        Ok(CurrentUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_core::{ClaimsBuilder, Clock, FixedClock, UserRecord};
    use analyzer_data::MemoryUserRepository;
    use std::time::Duration;

    const SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";
    const ISSUER: &str = "http://localhost:8000";
    const AUDIENCE: &str = "http://localhost:8000/api/v1/auth/login";
    const NOW: i64 = 1_700_000_000;

    async fn setup() -> (CurrentUserResolver, TokenCodec, Arc<MemoryUserRepository>) {
        let clock = Arc::new(FixedClock::at(NOW));
        let codec = TokenCodec::new(SECRET, "HS256", ISSUER, AUDIENCE, clock).unwrap();
        let users = Arc::new(MemoryUserRepository::new());
        users
            .insert(UserRecord {
                id: 5,
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                hashed_password: "unused".to_string(),
                is_active: true,
            })
            .await;

        (CurrentUserResolver::new(codec.clone(), users.clone()), codec, users)
    }

    fn token_for(codec: &TokenCodec, username: &str, scope: Scope) -> String {
        let identity = AuthenticatedIdentity {
            id: 5,
            username: username.to_string(),
            email: "alice@example.com".to_string(),
        };
        let claims = ClaimsBuilder::new(ISSUER, AUDIENCE).build(
            &identity,
            scope,
            codec.clock().now(),
            Duration::from_secs(600),
        );
        codec.encode(&claims).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[tokio::test]
    async fn test_resolves_identity() {
        let (resolver, codec, _) = setup().await;
        let header = format!("Bearer {}", token_for(&codec, "alice", Scope::AccessToken));

        let identity = resolver.resolve(Some(&header)).await.unwrap();
        assert_eq!(identity.id, 5);
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let (resolver, _, _) = setup().await;
        assert_eq!(resolver.resolve(None).await, Err(ResolveError::Unauthenticated));
        assert_eq!(
            resolver.resolve(Some("Token abc")).await,
            Err(ResolveError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_accepted() {
        let (resolver, codec, _) = setup().await;
        let header = format!("Bearer {}", token_for(&codec, "alice", Scope::RefreshToken));

        assert_eq!(
            resolver.resolve(Some(&header)).await,
            Err(ResolveError::ClaimsInvalid(ClaimsMismatch::Scope))
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let (resolver, codec, _) = setup().await;
        let header = format!("Bearer {}", token_for(&codec, "mallory", Scope::AccessToken));

        assert_eq!(resolver.resolve(Some(&header)).await, Err(ResolveError::Rejected));
    }

    #[tokio::test]
    async fn test_repository_failure_is_rejected() {
        let (resolver, codec, users) = setup().await;
        users.set_failing(true);
        let header = format!("Bearer {}", token_for(&codec, "alice", Scope::AccessToken));

        assert_eq!(resolver.resolve(Some(&header)).await, Err(ResolveError::Rejected));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let (resolver, _, _) = setup().await;
        assert_eq!(
            resolver.resolve(Some("Bearer not.a.token")).await,
            Err(ResolveError::Rejected)
        );
    }
}
