//! Rate limiting middleware.
//!
//! Token Bucket 알고리즘 기반으로 IP별 요청 수를 제한합니다.
//! 버킷 용량은 윈도우당 최대 요청 수이고, 윈도우 길이에 걸쳐 균등하게 리필됩니다.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use portfolio_core::RateLimitSettings;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ApiErrorResponse;
use crate::metrics::record_rate_limit;
use crate::utils::client_ip;

/// Rate Limiter 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 윈도우당 최대 요청 수
    pub max_requests: u32,
    /// 윈도우 길이
    pub window: Duration,
    /// 버킷 정리 간격
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl RateLimitConfig {
    /// 설정 파일 값에서 생성.
    ///
    /// 윈도우 길이만큼 요청이 없던 버킷은 가득 찬 상태이므로 그 주기로 정리합니다.
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        let window = Duration::from_secs(settings.window_secs);
        Self {
            max_requests: settings.max_requests,
            window,
            cleanup_interval: window,
        }
    }

    /// 초당 리필되는 토큰 수.
    fn refill_rate(&self) -> f64 {
        self.max_requests as f64 / self.window.as_secs_f64().max(f64::EPSILON)
    }
}

/// Token Bucket 구조체.
#[derive(Debug)]
struct TokenBucket {
    /// 현재 토큰 수
    tokens: f64,
    /// 마지막 리필 시간
    last_refill: Instant,
    /// 최대 토큰 수 (버킷 용량)
    max_tokens: f64,
    /// 초당 리필되는 토큰 수
    refill_rate: f64,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        let max_tokens = config.max_requests as f64;

        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_rate: config.refill_rate(),
        }
    }

    /// 토큰 소비 시도.
    ///
    /// 성공하면 `true`, Rate limit 초과 시 `false` 반환.
    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// 다음 토큰까지 대기 시간 (초).
    fn time_until_next_token(&self) -> f64 {
        if self.tokens >= 1.0 {
            0.0
        } else {
            (1.0 - self.tokens) / self.refill_rate
        }
    }
}

/// Rate Limiter.
///
/// IP 주소별로 Rate Limiting을 적용합니다.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<RwLock<HashMap<IpAddr, TokenBucket>>>,
}

impl RateLimiter {
    /// 새 Rate Limiter 생성.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 요청 허용 여부 확인.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(&self.config));

        if bucket.try_acquire() {
            RateLimitResult::Allowed
        } else {
            let retry_after = bucket.time_until_next_token().ceil().max(1.0) as u64;
            RateLimitResult::Limited { retry_after }
        }
    }

    /// 오래된 버킷 정리.
    pub async fn cleanup(&self) {
        let mut buckets = self.buckets.write().await;
        let Some(threshold) = Instant::now().checked_sub(self.config.cleanup_interval) else {
            return;
        };

        buckets.retain(|_, bucket| bucket.last_refill > threshold);
    }

    /// 현재 추적 중인 IP 수 반환.
    pub async fn tracked_ips(&self) -> usize {
        self.buckets.read().await.len()
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

/// Rate Limit 확인 결과.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// 요청 허용됨
    Allowed,
    /// Rate limit 초과
    Limited {
        /// 재시도까지 대기 시간 (초)
        retry_after: u64,
    },
}

/// Rate Limit 미들웨어 상태.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: RateLimiter,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Rate Limiting 미들웨어 함수.
///
/// 클라이언트 IP별로 Rate Limiting을 적용합니다.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers(), request.extensions());

    match state.limiter.check(ip).await {
        RateLimitResult::Allowed => {
            record_rate_limit("allowed");
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            record_rate_limit("limited");

            tracing::warn!(
                client_ip = %ip,
                retry_after = retry_after,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );

            let mut response = ApiErrorResponse::new("Too Many Requests")
                .with_message("Too many requests from this IP, please try again later.")
                .with_path(request.uri())
                .with_status(StatusCode::TOO_MANY_REQUESTS)
                .into_response();

            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));

            response
        }
    }
}

/// 주기적으로 오래된 버킷을 정리하는 백그라운드 태스크 시작.
pub fn start_rate_limit_cleanup(state: RateLimitState, shutdown: CancellationToken) -> JoinHandle<()> {
    let period = state.limiter.config().cleanup_interval.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    state.limiter.cleanup().await;
                    let tracked_ips = state.limiter.tracked_ips().await;
                    tracing::debug!(tracked_ips, "Rate limit buckets cleaned up");
                }
            }
        }

        tracing::debug!("Rate limit cleanup task stopped");
    })
}
