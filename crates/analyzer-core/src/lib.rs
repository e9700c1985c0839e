//! # Analyzer Core
//!
//! 분석 백엔드의 핵심 도메인 모델과 토큰 보안 구성 요소를 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 사용자/세션 도메인 타입과 외부 협력자 trait
//! - 비밀번호 해싱 (Argon2id)
//! - JWT 클레임 생성 및 서명/검증
//! - 비밀번호 재설정 토큰
//! - 설정 관리
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod security;
pub mod settings;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use security::*;
pub use settings::*;
