//! 주입 가능한 시계.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// 현재 시각 제공자.
///
/// 토큰 발급과 만료 검증이 같은 시계를 보도록 주입합니다.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// 현재 UTC 시각.
    fn now(&self) -> DateTime<Utc>;

    /// 현재 Unix timestamp (초).
    fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 고정 시계 (테스트용).
///
/// 초 단위로 고정되며 `advance`/`set`으로 이동할 수 있습니다.
#[derive(Debug, Default)]
pub struct FixedClock {
    secs: AtomicI64,
}

impl FixedClock {
    /// 주어진 Unix timestamp로 고정된 시계 생성.
    pub fn at(timestamp: i64) -> Self {
        Self {
            secs: AtomicI64::new(timestamp),
        }
    }

    /// 시각 변경.
    pub fn set(&self, timestamp: i64) {
        self.secs.store(timestamp, Ordering::SeqCst);
    }

    /// 초 단위로 시각을 앞당깁니다 (음수면 뒤로).
    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_moves() {
        let clock = FixedClock::at(1_700_000_000);
        assert_eq!(clock.timestamp(), 1_700_000_000);

        clock.advance(90);
        assert_eq!(clock.timestamp(), 1_700_000_090);

        clock.set(10);
        assert_eq!(clock.timestamp(), 10);
    }
}
