//! 전체 라우터 조립.
//!
//! 바이너리와 통합 테스트가 같은 라우터를 사용합니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use portfolio_core::AppConfig;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::error::{not_found_handler, PanicResponder};
use crate::middleware::{metrics_layer, rate_limit_middleware, RateLimitConfig, RateLimitState};
use crate::openapi::openapi_router;
use crate::routes::{create_api_router, health_router};
use crate::state::AppState;
use crate::utils::ProxyPolicy;
use crate::websocket::{polling_router, websocket_router, PollState, SharedHub, WsState};

/// 조립된 애플리케이션.
///
/// 백그라운드 태스크(폴링 세션 정리, 버킷 정리)에 필요한 상태를 함께 돌려줍니다.
pub struct App {
    pub router: Router,
    pub poll_state: PollState,
    pub rate_limit: Option<RateLimitState>,
}

/// 전체 라우터 생성.
pub fn build_app(config: &AppConfig, hub: SharedHub, metrics_handle: Option<PrometheusHandle>) -> App {
    let state = Arc::new(AppState::new(hub.clone(), config.server.environment.clone()));
    let poll_state = PollState::new(hub.clone(), &config.polling);
    let ws_state = WsState::new(hub);

    let proxy_policy = ProxyPolicy::from_config(&config.server);
    if proxy_policy.is_enabled() {
        info!(trusted_proxies = ?config.server.trusted_proxies, "Trusting proxy headers from configured peers");
    }

    // REST 라우터 (Rate Limit 조건부 적용). 실시간 전송과 운영 엔드포인트는 제외
    let rate_limit = if config.rate_limit.enabled {
        info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            "Rate limiting configured"
        );
        Some(RateLimitState::new(RateLimitConfig::from_settings(&config.rate_limit)))
    } else {
        info!("Rate limiting DISABLED");
        None
    };

    let rest_router = Router::new()
        .nest("/health", health_router())
        .nest("/api", create_api_router());
    let rest_router = match &rate_limit {
        Some(rate_limit_state) => rest_router.layer(middleware::from_fn_with_state(
            rate_limit_state.clone(),
            rate_limit_middleware,
        )),
        None => rest_router,
    };

    let mut router = rest_router
        .with_state(state)
        .nest("/ws", websocket_router(ws_state))
        .nest("/poll", polling_router(poll_state.clone()))
        .merge(openapi_router());

    // 메트릭 라우터 (별도 상태, Rate Limit 제외)
    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle),
        );
    }

    let router = router
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(PanicResponder::new(
            config.server.is_development(),
        )))
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(cors_layer(config.server.frontend_url.as_deref()))
        .layer(Extension(proxy_policy));

    App {
        router,
        poll_state,
        rate_limit,
    }
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// CORS 레이어.
///
/// 프론트엔드 origin이 설정되면 그 origin만 자격 증명과 함께 허용하고,
/// 없거나 잘못된 값이면 모든 origin을 허용합니다.
fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = frontend_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .and_then(|url| match url.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(frontend_url = url, "Invalid frontend origin, allowing any");
                None
            }
        });

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    match origin {
        Some(origin) => {
            info!(origin = ?origin, "CORS restricted to frontend origin");
            layer
                .allow_origin(AllowOrigin::exact(origin))
                .allow_credentials(true)
        }
        None => {
            warn!("Frontend origin not set, allowing any origin");
            layer.allow_origin(AllowOrigin::any())
        }
    }
}
