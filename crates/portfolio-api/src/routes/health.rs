//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 업타임 모니터에서 사용합니다.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 서비스 상태 (항상 "healthy")
    pub status: String,

    /// 현재 시간 (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// 서버 업타임 (초)
    pub uptime: f64,

    /// 실행 환경
    pub environment: String,

    /// API 버전
    pub version: String,
}

/// 헬스 체크.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "서버 정상", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
        environment: state.environment.clone(),
        version: state.version.clone(),
    })
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_check))
}
