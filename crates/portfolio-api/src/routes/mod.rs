//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/api/analytics` - 방문자 분석 스냅샷
//! - `/api/portfolio/skills` - 스킬 카테고리
//! - `/api/contact` - 문의 접수

pub mod analytics;
pub mod contact;
pub mod health;
pub mod skills;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub use analytics::{analytics_router, AnalyticsResponse, RECENT_ACTIVITY};
pub use contact::{contact_router, ContactRequest, ContactResponse};
pub use health::{health_router, HealthResponse};
pub use skills::{portfolio_router, SkillsResponse};

/// `/api` 하위 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/analytics", analytics_router())
        .nest("/portfolio", portfolio_router())
        .nest("/contact", contact_router())
}
