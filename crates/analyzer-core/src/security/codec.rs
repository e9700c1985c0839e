//! 세션 토큰 서명/검증.
//!
//! 표준 compact JWS (`header.claims.signature`, base64url) 형식을 사용합니다.
//! 서명 검증은 `jsonwebtoken`에 맡기고, 시간/audience/issuer/scope 검증은
//! 주입된 [`Clock`] 기준으로 직접 수행해 실패 종류를 정확히 구분합니다.

use std::sync::Arc;

use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{de::DeserializeOwned, Serialize};

use super::claims::{Claims, Scope};
use super::clock::Clock;
use crate::settings::{SecurityConfig, SUPPORTED_ALGORITHMS};

/// 클레임 불일치 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimsMismatch {
    /// `aud`가 기대값과 다름
    Audience,
    /// `iss`가 기대값과 다름
    Issuer,
    /// `scope`가 용도와 다름
    Scope,
    /// `nbf` 이전에 사용됨
    NotYetValid,
}

impl std::fmt::Display for ClaimsMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Audience => "audience",
            Self::Issuer => "issuer",
            Self::Scope => "scope",
            Self::NotYetValid => "not_yet_valid",
        };
        f.write_str(name)
    }
}

/// 토큰 처리 에러.
///
/// 만료, 클레임 불일치, 형식/서명 오류는 호출자가 서로 다른 응답을 내야
/// 하므로 별도 variant로 구분합니다.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("잘못된 서명 설정: {0}")]
    Configuration(String),
    #[error("토큰 인코딩 실패")]
    Encoding,
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("토큰 클레임 불일치: {0}")]
    ClaimsInvalid(ClaimsMismatch),
    #[error("잘못된 토큰 형식 또는 서명")]
    Malformed,
}

impl TokenError {
    /// 메트릭/로그 라벨.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Encoding => "encoding",
            Self::Expired => "expired",
            Self::ClaimsInvalid(_) => "claims_invalid",
            Self::Malformed => "malformed",
        }
    }
}

/// 서명 키와 알고리즘.
///
/// 세션 토큰과 재설정 토큰 코덱이 공유하는 저수준 서명/검증 도구입니다.
#[derive(Clone)]
pub(crate) struct SigningKeys {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKeys {
    /// 비밀 키와 알고리즘 이름으로 생성.
    ///
    /// 빈 비밀 키와 HMAC 이외의 알고리즘은 설정 에러입니다.
    pub(crate) fn new(secret: &str, algorithm: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Configuration("비밀 키가 비어 있습니다".into()));
        }

        let algorithm = match algorithm {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(TokenError::Configuration(format!(
                    "지원하지 않는 알고리즘 {} (허용: {:?})",
                    other, SUPPORTED_ALGORITHMS
                )))
            }
        };

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// 주어진 `typ` 헤더로 서명합니다.
    pub(crate) fn sign<T: Serialize>(&self, typ: &str, claims: &T) -> Result<String, TokenError> {
        let mut header = Header::new(self.algorithm);
        header.typ = Some(typ.to_string());

        encode(&header, claims, &self.encoding_key).map_err(|_| TokenError::Encoding)
    }

    /// 서명과 구조만 검증합니다. 시간/클레임 검증은 호출자 몫입니다.
    pub(crate) fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<TokenData<T>, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<T>(token, &self.decoding_key, &validation).map_err(|_| TokenError::Malformed)
    }
}

/// 세션 토큰 코덱.
///
/// 서명 설정, 기대 audience/issuer, 시계를 한 번 주입받아 공유합니다.
#[derive(Clone)]
pub struct TokenCodec {
    keys: SigningKeys,
    audience: String,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.keys.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// 세션 토큰의 `typ` 헤더.
const SESSION_TOKEN_TYPE: &str = "JWT";

impl TokenCodec {
    /// 새 코덱 생성.
    ///
    /// # Arguments
    ///
    /// * `secret` - 서명 비밀 키 (비어 있으면 설정 에러)
    /// * `algorithm` - 알고리즘 이름 (HS256/HS384/HS512)
    /// * `issuer` - 기대 발급자
    /// * `audience` - 기대 audience
    /// * `clock` - 만료 검증에 사용할 시계
    pub fn new(
        secret: &str,
        algorithm: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        Ok(Self {
            keys: SigningKeys::new(secret, algorithm)?,
            audience: audience.into(),
            issuer: issuer.into(),
            clock,
        })
    }

    /// 보안 설정으로 코덱 생성.
    pub fn from_config(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        use secrecy::ExposeSecret;

        Self::new(
            config.secret_key.expose_secret(),
            &config.algorithm,
            config.issuer.clone(),
            config.audience.clone(),
            clock,
        )
    }

    /// 클레임을 직렬화하고 서명합니다.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        self.keys.sign(SESSION_TOKEN_TYPE, claims)
    }

    /// 토큰을 검증하고 클레임을 반환합니다.
    ///
    /// 검증 순서: 서명 → `exp` → `nbf` → `aud` → `iss` → `scope`.
    /// `exp`는 "이 시각 이후로 거부"이므로 `now >= exp`이면 만료입니다.
    pub fn decode(&self, token: &str, expected_scope: Scope) -> Result<Claims, TokenError> {
        let claims = self.keys.verify::<Claims>(token)?.claims;
        let now = self.clock.timestamp();

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf {
            return Err(TokenError::ClaimsInvalid(ClaimsMismatch::NotYetValid));
        }
        if claims.aud != self.audience {
            return Err(TokenError::ClaimsInvalid(ClaimsMismatch::Audience));
        }
        if claims.iss != self.issuer {
            return Err(TokenError::ClaimsInvalid(ClaimsMismatch::Issuer));
        }
        if claims.scope != expected_scope {
            return Err(TokenError::ClaimsInvalid(ClaimsMismatch::Scope));
        }

        Ok(claims)
    }

    /// 코덱이 사용하는 시계.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
