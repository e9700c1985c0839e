//! 인증 데이터 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - Redis 기반 리프레시 토큰 저장소 (지연 연결, 명령별 타임아웃)
//! - 테스트/로컬 개발용 인메모리 토큰 저장소
//! - PostgreSQL 사용자 저장소
//! - 인메모리 사용자 저장소

pub mod repository;
pub mod storage;

pub use repository::memory::MemoryUserRepository;
pub use repository::postgres::{Database, PgUserRepository};
pub use storage::memory::MemoryTokenStore;
pub use storage::redis::RedisTokenStore;
