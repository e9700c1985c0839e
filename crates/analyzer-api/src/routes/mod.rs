//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `{api_prefix}/auth` - 로그인, 토큰 갱신, 로그아웃, 비밀번호 복구

pub mod auth;
pub mod health;

pub use auth::{auth_router, LoginForm, Msg, RefreshRequest, ResetPasswordRequest, TokenResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// `api_prefix`가 비어 있으면 인증 라우트는 `/auth`에 마운트됩니다.
pub fn create_api_router(api_prefix: &str) -> Router<Arc<AppState>> {
    let prefix = api_prefix.trim_end_matches('/');

    Router::new()
        .nest("/health", health_router())
        .nest(&format!("{}/auth", prefix), auth_router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_auth_routes_mounted_under_prefix() {
        let app = create_api_router("/api/v1/").with_state(Arc::new(create_test_state()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/login/test-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_prefix_mounts_auth_at_root() {
        let app = create_api_router("").with_state(Arc::new(create_test_state()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/login/test-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
