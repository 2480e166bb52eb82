//! 설정 관리.
//!
//! 기본값 → `config/default.toml` (선택) → `PORTFOLIO__*` 환경 변수 →
//! 관례적인 단일 환경 변수(`PORT`, `FRONTEND_URL`, `APP_ENV`) 순으로 덮어씁니다.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, PortfolioResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 실시간 브로드캐스트 설정
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// 폴링 전송 설정
    #[serde(default)]
    pub polling: PollingConfig,
    /// 요청 한도 설정
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 실행 환경 ("development", "production" 등)
    pub environment: String,
    /// CORS 허용 origin (없으면 모든 origin 허용)
    #[serde(default)]
    pub frontend_url: Option<String>,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// `X-Forwarded-For`/`X-Real-IP` 헤더 신뢰 여부 (기본: 꺼짐)
    #[serde(default)]
    pub trust_proxy: bool,
    /// 프록시 헤더를 신뢰할 피어 주소 (`trust_proxy`가 켜졌을 때만 사용)
    #[serde(default = "default_trusted_proxies")]
    pub trusted_proxies: Vec<IpAddr>,
}

fn default_trusted_proxies() -> Vec<IpAddr> {
    vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: "development".to_string(),
            frontend_url: Some("http://localhost:3000".to_string()),
            request_timeout_secs: 30,
            trust_proxy: false,
            trusted_proxies: default_trusted_proxies(),
        }
    }
}

impl ServerConfig {
    /// 소켓 주소 문자열 (`host:port`).
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// 실시간 브로드캐스트 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
    /// 브로드캐스트 채널 버퍼 크기
    pub broadcast_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1024,
        }
    }
}

/// 롱 폴링 전송 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// 대기 중인 이벤트가 없을 때 응답을 보류하는 최대 시간 (초)
    pub wait_secs: u64,
    /// 이 시간 동안 폴링이 없으면 세션을 끊음 (초)
    pub idle_timeout_secs: u64,
    /// 유휴 세션 정리 주기 (초)
    pub reap_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            wait_secs: 25,
            idle_timeout_secs: 60,
            reap_interval_secs: 15,
        }
    }
}

/// IP별 요청 한도 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitSettings {
    /// 활성화 여부
    pub enabled: bool,
    /// 윈도우당 최대 요청 수
    pub max_requests: u32,
    /// 윈도우 길이 (초)
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨 필터 (`RUST_LOG`가 우선)
    pub level: String,
    /// 출력 형식 ("pretty" | "json" | "compact")
    pub format: String,
    /// 파일 로그 디렉터리 (없으면 파일 출력 안 함)
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "portfolio_api=info,portfolio_core=info,tower_http=info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없어도 에러가 아닙니다.
    pub fn load<P: AsRef<Path>>(path: P) -> PortfolioResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        let builder = config::Config::builder()
            // 기본값으로 시작
            .add_source(defaults)
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("PORTFOLIO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("server.frontend_url", std::env::var("FRONTEND_URL").ok())?
            .set_override_option("server.environment", std::env::var("APP_ENV").ok())?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> PortfolioResult<Self> {
        Self::load("config/default.toml")
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> PortfolioResult<()> {
        if self.server.environment.trim().is_empty() {
            return Err(PortfolioError::Config("server.environment must not be empty".into()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(PortfolioError::Config("server.request_timeout_secs must be positive".into()));
        }
        if self.server.trust_proxy && self.server.trusted_proxies.is_empty() {
            return Err(PortfolioError::Config(
                "server.trusted_proxies must not be empty when trust_proxy is set".into(),
            ));
        }
        if self.realtime.broadcast_capacity == 0 {
            return Err(PortfolioError::Config("realtime.broadcast_capacity must be positive".into()));
        }
        if self.polling.wait_secs == 0 || self.polling.idle_timeout_secs == 0 {
            return Err(PortfolioError::Config("polling windows must be positive".into()));
        }
        if self.polling.wait_secs >= self.server.request_timeout_secs {
            return Err(PortfolioError::Config(
                "polling.wait_secs must be shorter than server.request_timeout_secs".into(),
            ));
        }
        if self.polling.reap_interval_secs == 0 {
            return Err(PortfolioError::Config("polling.reap_interval_secs must be positive".into()));
        }
        if self.rate_limit.enabled && (self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0) {
            return Err(PortfolioError::Config("rate_limit window and max_requests must be positive".into()));
        }
        Ok(())
    }
}
