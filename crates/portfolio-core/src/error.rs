//! 포트폴리오 서버의 에러 타입.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// 설정 에러
    #[error("configuration error: {0}")]
    Config(String),

    /// 로깅 초기화 에러
    #[error("logging error: {0}")]
    Logging(String),

    /// 잘못된 입력
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("serialization error: {0}")]
    Serialization(String),

    /// 입출력 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 핵심 작업을 위한 Result 타입.
pub type PortfolioResult<T> = Result<T, PortfolioError>;

impl From<serde_json::Error> for PortfolioError {
    fn from(err: serde_json::Error) -> Self {
        PortfolioError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PortfolioError {
    fn from(err: config::ConfigError) -> Self {
        PortfolioError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortfolioError::InvalidInput("page is empty".to_string());
        assert_eq!(err.to_string(), "invalid input: page is empty");
    }

    #[test]
    fn test_from_serde_json() {
        let err: PortfolioError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PortfolioError::Serialization(_)));
    }
}
