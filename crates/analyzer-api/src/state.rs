//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! 설정, 해셔, 코덱 등은 프로세스 시작 시 한 번 생성되어 `Arc`로 공유됩니다.

use std::sync::Arc;

use analyzer_core::{
    AppConfig, ClaimsBuilder, Clock, PasswordError, PasswordHasher, RefreshTokenStore,
    ResetMailer, ResetTokenCodec, TokenCodec, TokenError, UserRepository,
};
use analyzer_data::Database;

use crate::auth::{CurrentUserResolver, PasswordRecovery, SessionIssuer};

/// 상태 구성 에러.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("비밀번호 해셔 구성 실패: {0}")]
    Hasher(#[from] PasswordError),
    #[error("토큰 코덱 구성 실패: {0}")]
    Codec(#[from] TokenError),
}

/// 상태 생성에 필요한 외부 협력자.
pub struct Collaborators {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn RefreshTokenStore>,
    pub mailer: Arc<dyn ResetMailer>,
    pub clock: Arc<dyn Clock>,
    /// 설정된 경우의 데이터베이스 (헬스 체크용)
    pub database: Option<Database>,
}

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
pub struct AppState {
    /// 애플리케이션 설정
    pub config: Arc<AppConfig>,

    /// 로그인/갱신/로그아웃
    pub sessions: Arc<SessionIssuer>,

    /// Bearer 토큰 → 신원
    pub resolver: Arc<CurrentUserResolver>,

    /// 비밀번호 복구/재설정
    pub recovery: Arc<PasswordRecovery>,

    /// refresh 토큰 저장소 (헬스 체크용)
    pub tokens: Arc<dyn RefreshTokenStore>,

    /// 데이터베이스 (미설정 시 None)
    pub database: Option<Database>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 설정과 협력자로 상태를 구성합니다.
    pub fn new(config: Arc<AppConfig>, collaborators: Collaborators) -> Result<Self, StateError> {
        let Collaborators {
            users,
            tokens,
            mailer,
            clock,
            database,
        } = collaborators;
        let security = &config.security;

        let hasher = PasswordHasher::new(&security.hashing)?;
        let codec = TokenCodec::from_config(security, Arc::clone(&clock))?;
        let reset_codec = ResetTokenCodec::from_config(security, Arc::clone(&clock))?;
        let claims = ClaimsBuilder::new(security.issuer.clone(), security.audience.clone());

        let sessions = SessionIssuer::new(
            Arc::clone(&users),
            Arc::clone(&tokens),
            hasher.clone(),
            claims,
            codec.clone(),
            clock,
            security.access_ttl(),
            security.refresh_ttl(),
        );
        let resolver = CurrentUserResolver::new(codec, Arc::clone(&users));
        let recovery = PasswordRecovery::new(
            users,
            Arc::clone(&tokens),
            mailer,
            reset_codec,
            hasher,
        );

        Ok(Self {
            config,
            sessions: Arc::new(sessions),
            resolver: Arc::new(resolver),
            recovery: Arc::new(recovery),
            tokens,
            database,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 AppState 생성 (인메모리 협력자, 낮은 해싱 비용).
#[cfg(test)]
pub fn create_test_state() -> AppState {
    use analyzer_core::{
        DatabaseConfig, HashingConfig, LogOnlyMailer, LoggingConfig, RedisConfig, SecurityConfig,
        ServerConfig, SystemClock,
    };
    use analyzer_data::{MemoryTokenStore, MemoryUserRepository};

    let config = AppConfig {
        server: ServerConfig::default(),
        security: SecurityConfig {
            secret_key: secrecy::SecretString::new(
                "test-secret-key-for-jwt-testing-minimum-32-chars".into(),
            ),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_minutes: 60 * 24 * 7,
            audience: "http://localhost:8000/api/v1/auth/login".to_string(),
            issuer: "http://localhost:8000".to_string(),
            email_reset_token_expire_hours: 48,
            hashing: HashingConfig {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
        },
        redis: RedisConfig::default(),
        database: DatabaseConfig::default(),
        logging: LoggingConfig::default(),
    };

    AppState::new(
        Arc::new(config),
        Collaborators {
            users: Arc::new(MemoryUserRepository::new()),
            tokens: Arc::new(MemoryTokenStore::new()),
            mailer: Arc::new(LogOnlyMailer),
            clock: Arc::new(SystemClock),
            database: None,
        },
    )
    .expect("test state")
}
