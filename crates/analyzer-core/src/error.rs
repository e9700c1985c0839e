//! 외부 협력자 경계의 에러 타입.
//!
//! KV 저장소, 사용자 저장소, 메일 발송기에서 발생하는 장애는 모두 이 모듈의
//! 타입으로 변환된 뒤 세션/인증 계층으로 전달됩니다. 원시 네트워크 에러는
//! 이 경계를 넘지 않습니다.

use thiserror::Error;

/// KV 저장소 장애 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// 연결 실패 또는 연결 끊김
    Connection,
    /// 인증 실패
    Authentication,
    /// 권한 부족 (ACL)
    Permission,
    /// 명령 타임아웃
    Timeout,
    /// 예상하지 못한 응답
    Protocol,
}

impl StoreFault {
    /// 메트릭/로그 라벨.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
        }
    }
}

impl std::fmt::Display for StoreFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 리프레시 토큰 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 저장소를 사용할 수 없음
    #[error("token store unavailable ({fault}): {message}")]
    Unavailable {
        /// 장애 종류
        fault: StoreFault,
        /// 상세 메시지 (토큰 값은 포함하지 않음)
        message: String,
    },
}

impl StoreError {
    /// 새 Unavailable 에러 생성.
    pub fn unavailable(fault: StoreFault, message: impl Into<String>) -> Self {
        Self::Unavailable {
            fault,
            message: message.into(),
        }
    }

    /// 장애 종류 반환.
    pub fn fault(&self) -> StoreFault {
        match self {
            Self::Unavailable { fault, .. } => *fault,
        }
    }
}

/// 사용자 저장소 에러.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 데이터베이스 연결/쿼리 실패
    #[error("database error: {0}")]
    Database(String),

    /// 저장된 레코드가 도메인 규칙을 위반함
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// 메일 발송 에러.
#[derive(Debug, Error)]
pub enum MailerError {
    /// 발송 실패
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_fault() {
        let err = StoreError::unavailable(StoreFault::Timeout, "SETEX timed out");
        assert_eq!(err.fault(), StoreFault::Timeout);
        assert!(err.to_string().contains("timeout"));
    }
}
