//! 호출 지점에서 감싸는 작업 계측.
//!
//! 시작/종료 로그와 소요 시간 히스토그램을 남깁니다. 비즈니스 로직에는
//! 계측 코드를 넣지 않고, 라우트와 추출기에서 이 래퍼로 감쌉니다.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::metrics::record_operation_duration;

/// `future`를 실행하며 소요 시간과 결과를 기록합니다.
///
/// # Example
///
/// ```rust,ignore
/// let session = instrumented("login", state.sessions.login(&username, &password)).await?;
/// ```
pub async fn instrumented<F, T, E>(operation: &'static str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    debug!(operation, "Operation started");
    let start = Instant::now();

    let result = future.await;

    let elapsed = start.elapsed();
    record_operation_duration(operation, elapsed.as_secs_f64());

    let elapsed_ms = elapsed.as_millis() as u64;
    match &result {
        Ok(_) => info!(operation, elapsed_ms, "Operation finished"),
        Err(e) => warn!(operation, elapsed_ms, error = %e, "Operation failed"),
    }

    result
}
