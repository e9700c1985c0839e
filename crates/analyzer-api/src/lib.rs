//! 인증/세션 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 로그인과 refresh 토큰 회전
//! - Bearer 토큰 기반 현재 사용자 확인
//! - 비밀번호 복구 메일과 1회용 재설정 토큰
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 세션 발급, 토큰 확인, 비밀번호 복구
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod auth;
pub mod error;
pub mod instrument;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{CurrentUser, CurrentUserResolver, PasswordRecovery, SessionIssuer};
pub use error::{ApiErrorResponse, ApiResult, AuthApiError};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::create_api_router;
pub use state::{AppState, Collaborators};
