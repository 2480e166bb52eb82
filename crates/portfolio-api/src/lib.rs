//! 포트폴리오 REST API 및 실시간 방문자 분석 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (헬스 체크, 분석, 스킬, 문의)
//! - 실시간 방문자 이벤트를 위한 WebSocket 서버와 롱 폴링 폴백
//! - Prometheus 메트릭
//! - OpenAPI 문서
//!
//! # 모듈 구성
//!
//! - [`app`]: 전체 라우터 조립
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`websocket`]: 연결 허브, 이벤트 라우팅, WebSocket/폴링 전송
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서

pub mod app;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod utils;
pub mod websocket;

pub use app::{build_app, App};
pub use error::{ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use state::AppState;
pub use websocket::{create_hub, ConnectionHub, SharedHub};
