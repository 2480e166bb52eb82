//! 방문자 분석 endpoint.
//!
//! 실시간 채널과 같은 집계기를 조회합니다. 최근 활동은 WebSocket 스냅샷보다
//! 긴 창(20건)을 돌려줍니다.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use portfolio_core::PageViewRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// REST 응답의 최근 활동 개수.
pub const RECENT_ACTIVITY: usize = 20;

/// 분석 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    /// 누적 페이지 뷰
    pub total_page_views: usize,
    /// 고유 방문자 수 (원격 주소 기준)
    pub unique_visitors: usize,
    /// 현재 접속자 수
    pub realtime_users: usize,
    /// 최근 페이지 뷰 (오래된 것부터)
    pub recent_activity: Vec<PageViewRecord>,
}

/// 분석 스냅샷 조회.
#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "analytics",
    responses(
        (status = 200, description = "방문자 분석 스냅샷", body = AnalyticsResponse),
        (status = 429, description = "요청 한도 초과", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_analytics(State(state): State<Arc<AppState>>) -> Json<AnalyticsResponse> {
    let response = state
        .hub
        .read(|registry, analytics| AnalyticsResponse {
            total_page_views: analytics.total_page_views(),
            unique_visitors: analytics.unique_visitors(),
            realtime_users: registry.live_count(),
            recent_activity: analytics.recent(RECENT_ACTIVITY).to_vec(),
        })
        .await;

    Json(response)
}

/// 분석 라우터 생성.
pub fn analytics_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_analytics))
}
