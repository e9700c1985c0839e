//! 비밀번호 복구와 재설정.

use std::sync::Arc;

use analyzer_core::{
    validate_password_strength, MailerError, PasswordError, PasswordHasher, RefreshTokenStore,
    RepositoryError, ResetMailer, ResetTokenCodec, StoreError, TokenError, UserRepository,
};
use tracing::{info, warn};

use super::hashing::hash_password;

/// 사용 완료된 재설정 토큰 표시 키 접두사.
const USED_RESET_PREFIX: &str = "password-reset:";

/// 복구/재설정 에러.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("사용자 저장소 오류: {0}")]
    Repository(#[from] RepositoryError),
    #[error("해당 이메일의 사용자가 없습니다")]
    UserNotFound,
    #[error("유효하지 않은 재설정 토큰")]
    InvalidToken,
    #[error("약한 비밀번호: {0}")]
    WeakPassword(&'static str),
    #[error("토큰 발급 실패: {0}")]
    Token(#[from] TokenError),
    #[error("메일 발송 실패: {0}")]
    Mailer(#[from] MailerError),
    #[error("저장소 장애: {0}")]
    Store(#[from] StoreError),
    #[error("비밀번호 처리 오류: {0}")]
    Password(#[from] PasswordError),
}

/// 비밀번호 복구 서비스.
pub struct PasswordRecovery {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RefreshTokenStore>,
    mailer: Arc<dyn ResetMailer>,
    codec: ResetTokenCodec,
    hasher: PasswordHasher,
}

impl PasswordRecovery {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RefreshTokenStore>,
        mailer: Arc<dyn ResetMailer>,
        codec: ResetTokenCodec,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            codec,
            hasher,
        }
    }

    /// 재설정 토큰을 발급해 메일러에 전달합니다.
    pub async fn recover(&self, email: &str) -> Result<(), RecoveryError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(RecoveryError::UserNotFound)?;

        let token = self.codec.issue(&user.email)?;
        self.mailer
            .send_reset_link(&user.email, &user.username, &token)
            .await?;

        info!(user_id = user.id, "Password recovery issued");
        Ok(())
    }

    /// 재설정 토큰으로 비밀번호를 교체합니다.
    ///
    /// 토큰은 한 번만 사용할 수 있으며, 성공 시 대상 이메일을 반환합니다.
    pub async fn reset(&self, token: &str, new_password: &str) -> Result<String, RecoveryError> {
        validate_password_strength(new_password).map_err(RecoveryError::WeakPassword)?;

        let claims = self.codec.verify(token).map_err(|e| {
            warn!(kind = e.kind(), "Reset token rejected");
            RecoveryError::InvalidToken
        })?;

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or(RecoveryError::UserNotFound)?;
        let hashed = hash_password(&self.hasher, new_password).await?;

        let marker = format!("{}{}", USED_RESET_PREFIX, ResetTokenCodec::signature(token));
        let claimed = self
            .tokens
            .put_if_absent(&marker, &claims.sub, self.codec.remaining(&claims))
            .await?;
        if !claimed {
            warn!("Reset token reused");
            return Err(RecoveryError::InvalidToken);
        }

        // 갱신 실패 시 표시를 되돌려 같은 토큰으로 재시도 가능
        let updated = match self.users.update_password(user.id, &hashed).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(RecoveryError::UserNotFound),
            Err(e) => Err(RecoveryError::Repository(e)),
        };
        if let Err(e) = updated {
            if let Err(release) = self.tokens.delete(&marker).await {
                warn!(fault = %release.fault(), "Could not release reset token marker");
            }
            return Err(e);
        }

        info!(user_id = user.id, "Password reset");
        Ok(user.email)
    }
}
