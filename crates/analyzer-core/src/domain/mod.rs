//! 인증 도메인 모델.
//!
//! 사용자 신원, 세션 키, 그리고 이 코어가 의존하는 외부 협력자
//! (사용자 저장소, 리프레시 토큰 저장소, 메일 발송기)의 인터페이스.

mod mailer;
mod session;
mod user;

pub use mailer::{LogOnlyMailer, ResetMailer};
pub use session::{RefreshTokenStore, SessionKey, SessionKeyParseError};
pub use user::{AuthenticatedIdentity, UserRecord, UserRepository};
