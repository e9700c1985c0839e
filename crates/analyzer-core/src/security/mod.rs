//! 토큰 기반 인증의 순수 구성 요소.
//!
//! # 구성 요소
//!
//! - [`PasswordHasher`]: Argon2id 기반 비밀번호 해싱/검증
//! - [`ClaimsBuilder`]: 주체에 대한 클레임 집합 생성
//! - [`TokenCodec`]: 세션 토큰 서명/검증
//! - [`ResetTokenCodec`]: 비밀번호 재설정 토큰 서명/검증
//! - [`Clock`]: 주입 가능한 현재 시각
//!
//! 이 모듈의 함수는 I/O를 하지 않으며 비밀 값을 로그에 남기지 않습니다.

mod claims;
mod clock;
mod codec;
mod password;
mod reset;

pub use claims::{Claims, ClaimsBuilder, Scope, SUBJECT_PREFIX};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{ClaimsMismatch, TokenCodec, TokenError};
pub use password::{validate_password_strength, PasswordError, PasswordHasher};
pub use reset::{ResetClaims, ResetTokenCodec, RESET_TOKEN_TYPE};
