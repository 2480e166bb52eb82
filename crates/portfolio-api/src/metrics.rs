//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 실시간 채널 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.
//! 레코더가 설치되지 않은 상태(테스트 등)에서는 모든 기록이 no-op입니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 반환값
///
/// `/metrics` 엔드포인트에서 메트릭을 렌더링하기 위한 `PrometheusHandle`.
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        // HTTP 요청 지속 시간 히스토그램 버킷 설정
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// 요청 한도 검사 카운터 증가.
///
/// `status`: "allowed" | "limited"
pub fn record_rate_limit(status: &'static str) {
    counter!("rate_limit_requests_total", "status" => status).increment(1);
}

// ============================================================================
// 실시간 채널 메트릭 헬퍼 함수
// ============================================================================

/// 실시간 접속자 수 설정.
pub fn set_realtime_connections(count: usize) {
    gauge!("realtime_connections_active").set(count as f64);
}

/// 수신한 클라이언트 이벤트 카운터 증가.
///
/// `outcome`: "handled" | "unknown" | "invalid"
pub fn record_event(event: &str, outcome: &'static str) {
    counter!(
        "realtime_events_total",
        "event" => event.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 기록된 페이지 뷰 카운터 증가.
pub fn record_page_view() {
    counter!("realtime_page_views_total").increment(1);
}

/// 브로드캐스트된 서버 메시지 카운터 증가.
pub fn record_broadcast(event: &'static str) {
    counter!("realtime_broadcasts_total", "event" => event).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        set_realtime_connections(3);
        record_event("page_view", "handled");
        record_page_view();
        record_broadcast("user_count");
        record_rate_limit("limited");
    }
}
