//! 인증 및 세션 관리.
//!
//! # 구성 요소
//!
//! - [`SessionIssuer`]: 로그인, refresh 토큰 회전, 로그아웃
//! - [`CurrentUserResolver`]: Bearer 토큰을 인증된 신원으로 변환
//! - [`CurrentUser`]: Axum 핸들러용 현재 사용자 추출기
//! - [`PasswordRecovery`]: 비밀번호 복구 메일과 일회용 재설정
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn protected_handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
//!     format!("Hello, {}!", identity.username)
//! }
//! ```

mod hashing;
mod recovery;
mod resolver;
mod session;

pub use hashing::{hash_password, verify_password};
pub use recovery::{PasswordRecovery, RecoveryError};
pub use resolver::{bearer_token, CurrentUser, CurrentUserResolver, ResolveError};
pub use session::{IssuedSession, SessionError, SessionIssuer};
