//! 비밀번호 해싱.
//!
//! Argon2id 기반 비밀번호 해싱 및 검증. 솔트와 비용 파라미터는 PHC 문자열에
//! 함께 기록되므로 별도 솔트 저장소가 필요 없고, 비용을 올려도 기존 해시는
//! 자신의 파라미터로 검증됩니다.

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::settings::HashingConfig;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 또는 해시가 비어 있습니다")]
    InvalidInput,
    #[error("잘못된 해싱 파라미터: {0}")]
    InvalidParams(String),
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("비밀번호 검증 실패")]
    VerificationFailed,
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
}

/// 적응형 비밀번호 해셔.
///
/// 프로세스 시작 시 한 번 생성해 공유합니다. CPU 비용이 큰 연산이므로
/// 비동기 호출자는 blocking 풀에서 실행해야 합니다.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// 비용 파라미터로 해셔 생성.
    pub fn new(config: &HashingConfig) -> Result<Self, PasswordError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// 비밀번호 해싱.
    ///
    /// 솔트는 자동으로 생성됩니다.
    ///
    /// # Returns
    ///
    /// PHC 형식의 해시 문자열 (솔트 포함)
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let hash = hasher.hash("my_secure_password")?;
    /// // "$argon2id$v=19$m=19456,t=2,p=1$..."
    /// ```
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::InvalidInput);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| PasswordError::HashingFailed)?;

        Ok(hash.to_string())
    }

    /// 비밀번호 검증.
    ///
    /// 불일치는 에러가 아니라 `Ok(false)`입니다. 비교는 argon2 구현의
    /// 상수 시간 비교를 따릅니다.
    pub fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, PasswordError> {
        if hash.is_empty() || plaintext.is_empty() {
            return Err(PasswordError::InvalidInput);
        }

        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordError::VerificationFailed),
        }
    }
}

/// 비밀번호 강도 검증.
///
/// # 요구사항
///
/// - 최소 8자 이상
/// - 최소 1개의 숫자 포함
/// - 최소 1개의 영문자 포함
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain at least one letter");
    }

    Ok(())
}
