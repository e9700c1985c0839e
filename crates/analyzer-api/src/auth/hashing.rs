//! 비동기 호출자를 위한 비밀번호 해싱 래퍼.
//!
//! Argon2 연산은 CPU를 오래 점유하므로 blocking 풀에서 실행합니다.

use analyzer_core::{PasswordError, PasswordHasher};

/// blocking 풀에서 비밀번호를 해싱합니다.
pub async fn hash_password(
    hasher: &PasswordHasher,
    plaintext: &str,
) -> Result<String, PasswordError> {
    let hasher = hasher.clone();
    let plaintext = plaintext.to_owned();

    tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(|_| PasswordError::HashingFailed)?
}

/// blocking 풀에서 비밀번호를 검증합니다.
pub async fn verify_password(
    hasher: &PasswordHasher,
    hash: &str,
    plaintext: &str,
) -> Result<bool, PasswordError> {
    let hasher = hasher.clone();
    let hash = hash.to_owned();
    let plaintext = plaintext.to_owned();

    tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
        .await
        .map_err(|_| PasswordError::VerificationFailed)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_core::HashingConfig;

    #[tokio::test]
    async fn test_hash_and_verify_off_runtime() {
        let hasher = PasswordHasher::new(&HashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();

        let hash = hash_password(&hasher, "Password1").await.unwrap();
        assert!(verify_password(&hasher, &hash, "Password1").await.unwrap());
        assert!(!verify_password(&hasher, &hash, "Password2").await.unwrap());
    }
}
