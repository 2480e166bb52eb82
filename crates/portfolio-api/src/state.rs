//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 REST 핸들러가 공유하는 상태입니다.
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use std::time::Instant;

use crate::websocket::SharedHub;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 연결 허브 - 실시간 접속자 및 방문자 분석
    pub hub: SharedHub,

    /// 실행 환경 ("development", "production" 등)
    pub environment: String,

    /// 서버 시작 시각 (업타임 계산용)
    pub started_at: Instant,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 애플리케이션 상태 생성.
    pub fn new(hub: SharedHub, environment: impl Into<String>) -> Self {
        Self {
            hub,
            environment: environment.into(),
            started_at: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임 (초, 소수점 포함).
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// 테스트용 상태 생성.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use portfolio_core::AnalyticsAggregator;

    use crate::websocket::create_hub;

    AppState::new(create_hub(AnalyticsAggregator::new(), 64), "test")
}
