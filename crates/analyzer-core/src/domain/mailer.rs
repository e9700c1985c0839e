//! 비밀번호 재설정 메일 발송 인터페이스.

use async_trait::async_trait;
use tracing::info;

use crate::error::MailerError;

/// 비밀번호 재설정 링크 발송 협력자.
///
/// 메일 전송(SMTP, 템플릿 렌더링)은 이 코어의 범위 밖입니다.
#[async_trait]
pub trait ResetMailer: Send + Sync {
    /// 재설정 토큰을 사용자에게 전달합니다.
    async fn send_reset_link(
        &self,
        email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), MailerError>;
}

/// 발송 대신 로그만 남기는 메일러 (개발 환경용).
///
/// 토큰 값 자체는 기록하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyMailer;

#[async_trait]
impl ResetMailer for LogOnlyMailer {
    async fn send_reset_link(
        &self,
        email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), MailerError> {
        info!(
            email = %email,
            username = %username,
            token_len = token.len(),
            "Password reset mail suppressed (no mail transport configured)"
        );
        Ok(())
    }
}
