//! 스킬 카탈로그 endpoint.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use chrono::{DateTime, Utc};
use portfolio_core::catalog;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// 스킬 카테고리 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkillsResponse {
    pub categories: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// 스킬 카테고리 조회.
#[utoipa::path(
    get,
    path = "/api/portfolio/skills",
    tag = "portfolio",
    responses(
        (status = 200, description = "스킬 카테고리 목록", body = SkillsResponse)
    )
)]
pub async fn get_skills() -> Json<SkillsResponse> {
    Json(SkillsResponse {
        categories: catalog::skill_categories(),
        last_updated: Utc::now(),
    })
}

/// 포트폴리오 라우터 생성.
pub fn portfolio_router() -> Router<Arc<AppState>> {
    Router::new().route("/skills", get(get_skills))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_get_skills() {
        let app = Router::new().route("/api/portfolio/skills", get(get_skills));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/portfolio/skills")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let skills: SkillsResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(skills.categories.len(), 9);
        assert!(skills.categories.contains(&"Web Development".to_string()));
    }
}
