//! 비밀번호 재설정 토큰.
//!
//! 세션 토큰과 같은 비밀 키로 서명하지만 `typ` 헤더가 다르므로 서로의 자리에
//! 사용할 수 없습니다. audience/issuer는 검사하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::codec::{ClaimsMismatch, SigningKeys, TokenError};
use crate::settings::SecurityConfig;

/// 재설정 토큰의 `typ` 헤더.
pub const RESET_TOKEN_TYPE: &str = "reset+jwt";

/// 재설정 토큰 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub exp: i64,
    pub nbf: i64,
    /// 대상 이메일
    pub sub: String,
}

/// 재설정 토큰 코덱.
#[derive(Clone)]
pub struct ResetTokenCodec {
    keys: SigningKeys,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResetTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetTokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ResetTokenCodec {
    pub fn new(
        secret: &str,
        algorithm: &str,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        Ok(Self {
            keys: SigningKeys::new(secret, algorithm)?,
            ttl,
            clock,
        })
    }

    pub fn from_config(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        Self::new(
            config.secret_key.expose_secret(),
            &config.algorithm,
            config.reset_ttl(),
            clock,
        )
    }

    /// 토큰 수명.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 이메일 주소에 대한 재설정 토큰 발급.
    pub fn issue(&self, email: &str) -> Result<String, TokenError> {
        let now = self.clock.timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX).max(1);

        let claims = ResetClaims {
            exp: now.saturating_add(ttl_secs),
            nbf: now,
            sub: email.to_string(),
        };
        self.keys.sign(RESET_TOKEN_TYPE, &claims)
    }

    /// 재설정 토큰 검증.
    ///
    /// `typ` 헤더가 다르면 서명이 맞아도 형식 오류로 취급합니다.
    pub fn verify(&self, token: &str) -> Result<ResetClaims, TokenError> {
        let data = self.keys.verify::<ResetClaims>(token)?;
        if data.header.typ.as_deref() != Some(RESET_TOKEN_TYPE) {
            return Err(TokenError::Malformed);
        }

        let claims = data.claims;
        let now = self.clock.timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf {
            return Err(TokenError::ClaimsInvalid(ClaimsMismatch::NotYetValid));
        }

        Ok(claims)
    }

    /// 남은 수명 (초). 만료되었으면 0.
    pub fn remaining(&self, claims: &ResetClaims) -> Duration {
        let left = claims.exp.saturating_sub(self.clock.timestamp()).max(0);
        Duration::from_secs(left as u64)
    }

    /// 사용 기록 키에 쓰는 서명 부분.
    pub fn signature(token: &str) -> &str {
        token.rsplit_once('.').map(|(_, sig)| sig).unwrap_or(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthenticatedIdentity;
    use crate::security::{ClaimsBuilder, FixedClock, Scope, TokenCodec};

    const SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";
    const NOW: i64 = 1_700_000_000;

    fn codec(clock: Arc<FixedClock>) -> ResetTokenCodec {
        ResetTokenCodec::new(SECRET, "HS256", Duration::from_secs(48 * 3600), clock).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let clock = Arc::new(FixedClock::at(NOW));
        let codec = codec(clock.clone());

        let token = codec.issue("user@example.com").unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.nbf, NOW);
        assert_eq!(claims.exp, NOW + 48 * 3600);
        assert_eq!(codec.remaining(&claims), Duration::from_secs(48 * 3600));
    }

    #[test]
    fn test_expired_reset_token() {
        let clock = Arc::new(FixedClock::at(NOW));
        let codec = codec(clock.clone());
        let token = codec.issue("user@example.com").unwrap();

        clock.advance(48 * 3600);
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_session_token_is_not_a_reset_token() {
        let clock = Arc::new(FixedClock::at(NOW));
        let reset = codec(clock.clone());
        let session = TokenCodec::new(SECRET, "HS256", "iss", "aud", clock.clone()).unwrap();

        let identity = AuthenticatedIdentity {
            id: 1,
            username: "user".to_string(),
            email: "user@example.com".to_string(),
        };
        let claims = ClaimsBuilder::new("iss", "aud").build(
            &identity,
            Scope::AccessToken,
            clock.now(),
            Duration::from_secs(600),
        );
        let session_token = session.encode(&claims).unwrap();

        assert!(matches!(reset.verify(&session_token), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_reset_token_is_not_a_session_token() {
        let clock = Arc::new(FixedClock::at(NOW));
        let reset = codec(clock.clone());
        let session = TokenCodec::new(SECRET, "HS256", "iss", "aud", clock).unwrap();

        let token = reset.issue("user@example.com").unwrap();
        assert!(matches!(
            session.decode(&token, Scope::AccessToken),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_signature_segment() {
        assert_eq!(ResetTokenCodec::signature("a.b.sig"), "sig");
        assert_eq!(ResetTokenCodec::signature("nodots"), "nodots");
    }
}
