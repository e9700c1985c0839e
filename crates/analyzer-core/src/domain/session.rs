//! 세션 키와 리프레시 토큰 저장소 인터페이스.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

/// 리프레시 토큰 세션 키 (`"<user_id>:<jti>"`).
///
/// 로그인 응답의 세션 이름이자 KV 저장소의 키입니다.
/// 같은 사용자의 동시 로그인도 `jti`가 다르므로 서로 독립된 키를 가집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// 사용자 ID
    pub user_id: i64,
    /// 리프레시 토큰의 JWT ID
    pub jti: Uuid,
}

impl SessionKey {
    /// 새 세션 키 생성.
    pub fn new(user_id: i64, jti: Uuid) -> Self {
        Self { user_id, jti }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.jti)
    }
}

/// 세션 키 파싱 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("잘못된 세션 키 형식: {0}")]
pub struct SessionKeyParseError(pub String);

impl FromStr for SessionKey {
    type Err = SessionKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_id, jti) = s
            .split_once(':')
            .ok_or_else(|| SessionKeyParseError(s.to_string()))?;
        let user_id = user_id
            .parse::<i64>()
            .map_err(|_| SessionKeyParseError(s.to_string()))?;
        let jti = Uuid::parse_str(jti).map_err(|_| SessionKeyParseError(s.to_string()))?;
        Ok(Self { user_id, jti })
    }
}

/// 리프레시 토큰 KV 저장소.
///
/// 만료는 저장소의 네이티브 TTL에 전적으로 위임합니다. TTL 경과에 의한 축출이
/// 곧 폐기 메커니즘이며, 즉시 로그아웃을 위해 `delete`를 별도로 제공합니다.
///
/// 연결/인증/권한/타임아웃 장애는 구현체 경계에서 [`StoreError`]로 변환되어야
/// 하며, 저장소 내부에서 재시도하지 않습니다.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// `key`에 토큰을 `ttl` 동안 저장합니다.
    ///
    /// 저장소가 쓰기를 수락하지 않은 경우 `Ok(false)`를 반환합니다.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// 키가 없을 때만 저장합니다. 이미 있으면 `Ok(false)`.
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// 저장된 토큰 조회. 만료되었거나 없으면 `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 키를 즉시 삭제합니다. 삭제된 키가 있었으면 `Ok(true)`.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// 저장소 연결 상태 확인.
    async fn ping(&self) -> Result<(), StoreError>;
}
