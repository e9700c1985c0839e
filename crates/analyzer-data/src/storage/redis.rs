//! Redis 리프레시 토큰 저장소.
//!
//! 연결은 첫 명령 시점에 한 번만 수립되고 이후 `ConnectionManager`가
//! 재연결을 관리합니다. 모든 명령은 설정된 타임아웃으로 제한되며,
//! Redis 에러는 이 모듈 밖으로 나가기 전에 [`StoreError`]로 변환됩니다.

use std::future::Future;
use std::time::Duration;

use analyzer_core::{RedisConfig, RefreshTokenStore, StoreError, StoreFault};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, ErrorKind, RedisError, RedisResult};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Redis 기반 [`RefreshTokenStore`].
pub struct RedisTokenStore {
    url: String,
    command_timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // URL에 비밀번호가 포함될 수 있음
        f.debug_struct("RedisTokenStore")
            .field("command_timeout", &self.command_timeout)
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisTokenStore {
    /// 저장소 생성. 연결은 첫 사용 시 수립됩니다.
    pub fn new(config: &RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            command_timeout: config.command_timeout(),
            connection: OnceCell::new(),
        }
    }

    /// 연결을 미리 수립합니다 (서버 시작 시 워밍업).
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                info!("Connecting to Redis...");

                let client = Client::open(self.url.as_str()).map_err(into_store_error)?;
                let manager =
                    tokio::time::timeout(self.command_timeout, ConnectionManager::new(client))
                        .await
                        .map_err(|_| {
                            StoreError::unavailable(StoreFault::Timeout, "Redis 연결 시간 초과")
                        })?
                        .map_err(into_store_error)?;

                info!("Redis connection established");
                Ok::<_, StoreError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }

    /// 명령 하나를 타임아웃 안에서 실행합니다.
    async fn bounded<T, F>(&self, command: &'static str, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let error = into_store_error(e);
                warn!(command, fault = %error.fault(), "Redis command failed");
                Err(error)
            }
            Err(_) => {
                warn!(
                    command,
                    timeout_ms = self.command_timeout.as_millis() as u64,
                    "Redis command timed out"
                );
                Err(StoreError::unavailable(
                    StoreFault::Timeout,
                    format!("{} 명령 시간 초과", command),
                ))
            }
        }
    }
}

/// TTL을 초 단위로 변환합니다. `EX 0`은 Redis가 거부하므로 최소 1초.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Redis 에러 분류.
fn classify(error: &RedisError) -> StoreFault {
    if error.is_timeout() {
        return StoreFault::Timeout;
    }
    if error.kind() == ErrorKind::AuthenticationFailed {
        return StoreFault::Authentication;
    }
    match error.code() {
        Some("NOAUTH") | Some("WRONGPASS") => return StoreFault::Authentication,
        Some("NOPERM") => return StoreFault::Permission,
        _ => {}
    }
    if error.is_io_error() || error.is_connection_refusal() || error.is_connection_dropped() {
        return StoreFault::Connection;
    }
    StoreFault::Protocol
}

fn into_store_error(error: RedisError) -> StoreError {
    StoreError::unavailable(classify(&error), error.to_string())
}

#[async_trait]
impl RefreshTokenStore for RedisTokenStore {
    #[instrument(skip(self, value), fields(ttl_secs = ttl.as_secs()))]
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = self
            .bounded("SET", conn.set_ex(key, value, ttl_secs(ttl)))
            .await?;

        debug!(accepted = reply.is_some(), "Stored refresh token");
        Ok(reply.as_deref() == Some("OK"))
    }

    #[instrument(skip(self, value), fields(ttl_secs = ttl.as_secs()))]
    async fn put_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let mut command = redis::cmd("SET");
        command
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl));

        // NX 조건 불충족 시 nil
        let reply: Option<String> = self.bounded("SET NX", command.query_async(&mut conn)).await?;
        Ok(reply.as_deref() == Some("OK"))
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded("GET", conn.get(key)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let deleted: i64 = self.bounded("DEL", conn.del(key)).await?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let reply: String = self.bounded("PING", redis::cmd("PING").query_async(&mut conn)).await?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::unavailable(
                StoreFault::Protocol,
                format!("예상하지 못한 PING 응답: {}", reply),
            ))
        }
    }
}
