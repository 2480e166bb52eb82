//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성하고
//! `/api-docs/openapi.json`으로 제공합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::{routing::get, Json, Router};
use portfolio_core::PageViewRecord;
use utoipa::OpenApi;

use crate::error::ApiErrorResponse;
use crate::routes::{AnalyticsResponse, ContactRequest, ContactResponse, HealthResponse, SkillsResponse};

/// Portfolio API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portfolio Realtime API",
        description = r#"
# 포트폴리오 실시간 분석 API

포트폴리오 사이트의 방문자 분석과 정적 조회를 위한 REST API입니다.
실시간 이벤트는 `/ws` WebSocket 또는 `/poll` 롱 폴링으로 주고받습니다.

## 요청 한도

`/api` 하위 경로는 IP별 요청 한도가 적용되며, 초과 시 `429`와 `Retry-After` 헤더를 반환합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3001", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "analytics", description = "분석 - 방문자 통계"),
        (name = "portfolio", description = "포트폴리오 - 스킬 카탈로그"),
        (name = "contact", description = "문의 - 접수 확인")
    ),
    components(
        schemas(
            HealthResponse,
            AnalyticsResponse,
            PageViewRecord,
            SkillsResponse,
            ContactRequest,
            ContactResponse,
            ApiErrorResponse,
        )
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::analytics::get_analytics,
        crate::routes::skills::get_skills,
        crate::routes::contact::submit_contact,
    )
)]
pub struct ApiDoc;

/// OpenAPI JSON 라우터 생성.
///
/// `/api-docs/openapi.json` 경로에 스펙을 마운트합니다.
pub fn openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_valid() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&doc).unwrap();

        assert!(json.contains("Portfolio Realtime API"));

        assert!(json.contains("/health"));
        assert!(json.contains("/api/analytics"));
        assert!(json.contains("/api/portfolio/skills"));
        assert!(json.contains("/api/contact"));

        assert!(json.contains("AnalyticsResponse"));
        assert!(json.contains("ApiErrorResponse"));
    }
}
