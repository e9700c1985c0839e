//! 인증 API 서버.
//!
//! 설정을 로드하고 Redis/PostgreSQL 협력자를 구성한 뒤 Axum 서버를 시작합니다.

use std::sync::Arc;
use std::time::Duration;

use analyzer_core::{
    init_logging, AppConfig, LogConfig, LogOnlyMailer, RefreshTokenStore, SystemClock,
    UserRepository,
};
use analyzer_data::{Database, MemoryUserRepository, PgUserRepository, RedisTokenStore};
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use analyzer_api::metrics::setup_metrics_recorder;
use analyzer_api::middleware::metrics_layer;
use analyzer_api::routes::create_api_router;
use analyzer_api::state::{AppState, Collaborators};

/// CORS 레이어 생성.
///
/// `CORS_ORIGINS` 환경변수(쉼표 구분)가 있으면 해당 origin만 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            // 개발: 모든 origin 허용
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
}

/// Prometheus 메트릭 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let api_router = create_api_router(&state.config.server.api_prefix).with_state(state);

    Router::new()
        .merge(metrics_router)
        .merge(api_router)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

/// 사용자 저장소 구성.
///
/// 데이터베이스 URL이 없으면 빈 인메모리 저장소를 사용합니다.
async fn build_user_repository(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn UserRepository>, Option<Database>)> {
    match Database::connect(&config.database).await? {
        Some(database) => {
            let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(&database));
            Ok((users, Some(database)))
        }
        None => {
            warn!("database.url not set, using in-memory user repository");
            Ok((Arc::new(MemoryUserRepository::new()), None))
        }
    }
}

/// Graceful shutdown 시그널 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = Arc::new(AppConfig::load_default()?);

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    info!("Starting analyzer API server...");

    let metrics_handle = setup_metrics_recorder()?;
    info!("Prometheus metrics recorder initialized");

    // Redis 연결 예열 (실패해도 첫 요청에서 다시 연결 시도)
    let redis = RedisTokenStore::new(&config.redis);
    match redis.connect().await {
        Ok(()) => info!("Redis connection established"),
        Err(e) => warn!(fault = %e.fault(), "Redis unreachable at startup, will retry lazily"),
    }
    let tokens: Arc<dyn RefreshTokenStore> = Arc::new(redis);

    let (users, database) = build_user_repository(&config).await?;

    let state = Arc::new(AppState::new(
        Arc::clone(&config),
        Collaborators {
            users,
            tokens,
            mailer: Arc::new(LogOnlyMailer),
            clock: Arc::new(SystemClock),
            database,
        },
    )?);

    info!(
        version = %state.version,
        has_db = state.database.is_some(),
        "Application state initialized"
    );

    let app = create_router(state, metrics_handle);

    let addr = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        api_prefix = %config.server.api_prefix,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
