//! # Portfolio Core
//!
//! 포트폴리오 실시간 분석 서버의 핵심 도메인 모델을 제공합니다.
//!
//! 이 크레이트는 전송 계층과 무관한 상태를 다룹니다:
//! - 연결 레지스트리 (열린 연결 및 실시간 접속자 수)
//! - 방문자 분석 집계기 (페이지 뷰 로그, 고유 방문자 집합)
//! - 고정 카탈로그 데이터 (스킬 카테고리, 포트폴리오 업데이트)
//! - 설정 관리
//! - 로깅 인프라

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;

pub use analytics::{AggregateSnapshot, AnalyticsAggregator, PageViewRecord, RECENT_PAGE_VIEWS};
pub use config::*;
pub use error::*;
pub use logging::{init_logging, LogConfig, LogFormat, LogGuard};
pub use registry::{Connection, ConnectionId, ConnectionRegistry};
