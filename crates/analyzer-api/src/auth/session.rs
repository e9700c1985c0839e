//! 로그인/갱신/로그아웃 세션 발급.
//!
//! 로그인 흐름: 사용자 조회 → 비밀번호 검증 → 활성 상태 확인 → access/refresh
//! 클레임 생성 → 서명 → refresh 토큰 저장. 각 단계는 앞 단계의 결과에
//! 의존하므로 순차 실행됩니다.

use std::sync::Arc;
use std::time::Duration;

use analyzer_core::{
    ClaimsBuilder, Clock, PasswordError, PasswordHasher, RefreshTokenStore, RepositoryError,
    Scope, SessionKey, StoreError, TokenCodec, TokenError, UserRecord, UserRepository,
};
use tracing::{info, warn};

use super::hashing::verify_password;

/// 세션 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("존재하지 않는 사용자")]
    UnknownUser,
    #[error("비밀번호 불일치")]
    IncorrectPassword,
    #[error("비활성 사용자")]
    InactiveUser,
    #[error("토큰 오류: {0}")]
    Token(#[from] TokenError),
    #[error("폐기되었거나 알 수 없는 세션")]
    Revoked,
    #[error("저장소 장애: {0}")]
    Store(#[from] StoreError),
    #[error("세션이 저장되지 않았습니다")]
    NotPersisted,
    #[error("사용자 저장소 오류: {0}")]
    Repository(#[from] RepositoryError),
    #[error("비밀번호 처리 오류: {0}")]
    Password(#[from] PasswordError),
}

impl SessionError {
    /// 메트릭 라벨.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::UnknownUser => "unknown_user",
            Self::IncorrectPassword => "incorrect_password",
            Self::InactiveUser => "inactive_user",
            Self::Token(_) => "invalid_token",
            Self::Revoked => "revoked",
            Self::Store(_) | Self::NotPersisted => "store_unavailable",
            Self::Repository(_) => "repository_error",
            Self::Password(_) => "hashing_error",
        }
    }
}

/// 발급된 토큰 쌍.
#[derive(Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    /// KV 저장소 키이자 세션 이름
    pub session: SessionKey,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// 세션 발급기.
pub struct SessionIssuer {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RefreshTokenStore>,
    hasher: PasswordHasher,
    claims: ClaimsBuilder,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionIssuer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RefreshTokenStore>,
        hasher: PasswordHasher,
        claims: ClaimsBuilder,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            claims,
            codec,
            clock,
            access_ttl,
            refresh_ttl,
        }
    }

    /// 자격 증명으로 로그인합니다.
    ///
    /// refresh 토큰이 저장되지 않으면 로그인 전체가 실패하며 토큰은
    /// 호출자에게 반환되지 않습니다.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, SessionError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(SessionError::UnknownUser)?;

        // 빈 입력이나 손상된 해시도 비밀번호 불일치와 같은 응답
        let verification = verify_password(&self.hasher, &user.hashed_password, password).await;
        let verified = match verification {
            Ok(verified) => verified,
            Err(PasswordError::InvalidInput) => false,
            Err(PasswordError::InvalidHashFormat) => {
                warn!(user_id = user.id, "Stored password hash is unreadable");
                false
            }
            Err(e) => return Err(e.into()),
        };
        if !verified {
            warn!(user_id = user.id, "Incorrect password");
            return Err(SessionError::IncorrectPassword);
        }

        if !user.is_active {
            warn!(user_id = user.id, "Inactive user");
            return Err(SessionError::InactiveUser);
        }

        let issued = self.issue(&user).await?;
        info!(user_id = user.id, session = %issued.session, "Login succeeded");
        Ok(issued)
    }

    /// refresh 토큰으로 새 토큰 쌍을 발급합니다 (회전).
    ///
    /// 저장소에 같은 토큰이 살아 있어야 하며, 기존 세션 키는 삭제됩니다.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedSession, SessionError> {
        let claims = self.codec.decode(refresh_token, Scope::RefreshToken)?;
        let key = claims.session_key().ok_or(TokenError::Malformed)?;
        let key_str = key.to_string();

        match self.tokens.get(&key_str).await? {
            Some(stored) if stored == refresh_token => {}
            _ => {
                warn!(session = %key, "Refresh token is not live");
                return Err(SessionError::Revoked);
            }
        }

        let user = self
            .users
            .find_by_username(&claims.preferred_username)
            .await?
            .filter(|user| user.id == key.user_id)
            .ok_or(SessionError::Revoked)?;

        if !user.is_active {
            return Err(SessionError::InactiveUser);
        }

        // 동시 갱신 시 삭제에 성공한 쪽만 진행
        if !self.tokens.delete(&key_str).await? {
            return Err(SessionError::Revoked);
        }

        let issued = self.issue(&user).await?;
        info!(user_id = user.id, old = %key, new = %issued.session, "Session rotated");
        Ok(issued)
    }

    /// refresh 토큰의 세션을 즉시 폐기합니다.
    ///
    /// 세션이 아직 살아 있었으면 `true`.
    pub async fn logout(&self, refresh_token: &str) -> Result<bool, SessionError> {
        let claims = self.codec.decode(refresh_token, Scope::RefreshToken)?;
        let key = claims.session_key().ok_or(TokenError::Malformed)?;

        let revoked = self.tokens.delete(&key.to_string()).await?;
        info!(session = %key, revoked, "Logout");
        Ok(revoked)
    }

    async fn issue(&self, user: &UserRecord) -> Result<IssuedSession, SessionError> {
        let identity = user.identity();
        let now = self.clock.now();

        let access = self
            .claims
            .build(&identity, Scope::AccessToken, now, self.access_ttl);
        let refresh = self
            .claims
            .build(&identity, Scope::RefreshToken, now, self.refresh_ttl);

        let access_token = self.codec.encode(&access)?;
        let refresh_token = self.codec.encode(&refresh)?;
        let session = SessionKey::new(user.id, refresh.jti);

        self.persist(session, &refresh_token).await?;

        Ok(IssuedSession {
            access_token,
            refresh_token,
            session,
        })
    }

    /// refresh 토큰을 저장합니다.
    ///
    /// 쓰기는 별도 태스크에서 실행되므로 요청이 취소되어도 완료되거나
    /// 명확히 실패합니다.
    async fn persist(&self, session: SessionKey, refresh_token: &str) -> Result<(), SessionError> {
        let tokens = Arc::clone(&self.tokens);
        let key = session.to_string();
        let value = refresh_token.to_owned();
        let ttl = self.refresh_ttl;

        let stored = tokio::spawn(async move { tokens.put(&key, &value, ttl).await })
            .await
            .map_err(|_| SessionError::NotPersisted)?;

        match stored {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(session = %session, "Store rejected refresh token");
                Err(SessionError::NotPersisted)
            }
            Err(e) => {
                warn!(session = %session, fault = %e.fault(), "Could not persist refresh token");
                Err(SessionError::Store(e))
            }
        }
    }
}
