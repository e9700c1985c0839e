//! 인메모리 리프레시 토큰 저장소.
//!
//! 테스트와 로컬 개발용입니다. 만료는 `tokio::time::Instant` 기준이므로
//! `tokio::time::pause`/`advance`로 TTL 경과를 재현할 수 있습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use analyzer_core::{RefreshTokenStore, StoreError, StoreFault};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// 단일 키의 최대 보존 기간.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// 인메모리 [`RefreshTokenStore`].
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 장애 상태 전환. 켜져 있으면 모든 명령이 연결 장애로 실패합니다.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 만료되지 않은 키 개수.
    pub async fn live_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::unavailable(
                StoreFault::Connection,
                "in-memory store marked unavailable",
            ))
        } else {
            Ok(())
        }
    }

    fn entry(value: &str, ttl: Duration, now: Instant) -> Entry {
        Entry {
            value: value.to_string(),
            expires_at: now + ttl.clamp(Duration::from_secs(1), MAX_TTL),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryTokenStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.check()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        // 쓰기마다 만료된 키 정리
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), Self::entry(value, ttl, now));
        Ok(true)
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| entry.is_live(now));
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Self::entry(value, ttl, now));
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        let now = Instant::now();
        let entries = self.entries.read().await;

        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check()?;
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}
