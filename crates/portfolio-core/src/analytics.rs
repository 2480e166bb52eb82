//! 방문자 분석 집계기.
//!
//! 누적 페이지 뷰 로그와 고유 방문자 집합을 보관하고 요약 통계를 파생합니다.
//! 로그는 프로세스 수명 동안 축출 없이 계속 증가합니다.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{Connection, ConnectionId};

/// 스냅샷에 포함되는 최근 페이지 뷰 수.
pub const RECENT_PAGE_VIEWS: usize = 10;

/// 페이지 뷰 기록.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct PageViewRecord {
    /// 페이지 뷰를 보낸 연결
    pub connection_id: ConnectionId,
    /// 페이지 경로
    pub page: String,
    /// 기록 시각 (RFC 3339)
    pub timestamp: DateTime<Utc>,
    /// 브라우저 User-Agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// 방문자 원격 주소
    pub remote_address: String,
}

impl PageViewRecord {
    /// 연결 정보로부터 기록 생성.
    ///
    /// `user_agent`가 없으면 연결 핸드셰이크의 User-Agent를 사용합니다.
    pub fn from_connection(
        connection: &Connection,
        page: impl Into<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            connection_id: connection.id,
            page: page.into(),
            timestamp: Utc::now(),
            user_agent: user_agent.or_else(|| connection.user_agent.clone()),
            remote_address: connection.remote_address.clone(),
        }
    }
}

/// 집계 스냅샷.
///
/// 요청 시점에 파생되는 읽기 전용 뷰입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct AggregateSnapshot {
    /// 누적 페이지 뷰 수
    pub total_page_views: usize,
    /// 고유 방문자 수 (원격 주소 기준)
    pub unique_visitors: usize,
    /// 현재 열린 연결 수
    #[serde(rename = "realtimeUsers")]
    pub live_connections: usize,
    /// 최근 페이지 뷰 (도착 순서)
    pub recent_page_views: Vec<PageViewRecord>,
}

/// 방문자 분석 집계기.
#[derive(Debug, Default)]
pub struct AnalyticsAggregator {
    page_views: Vec<PageViewRecord>,
    visitors: HashSet<String>,
}

impl AnalyticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 페이지 뷰 기록.
    ///
    /// 로그에 추가하고 원격 주소를 방문자 집합에 넣습니다.
    pub fn record_page_view(&mut self, record: PageViewRecord) {
        self.visitors.insert(record.remote_address.clone());
        self.page_views.push(record);
    }

    pub fn total_page_views(&self) -> usize {
        self.page_views.len()
    }

    pub fn unique_visitors(&self) -> usize {
        self.visitors.len()
    }

    /// 최근 `n`개 기록 (도착 순서).
    pub fn recent(&self, n: usize) -> &[PageViewRecord] {
        let start = self.page_views.len().saturating_sub(n);
        &self.page_views[start..]
    }

    /// 현재 상태의 스냅샷.
    pub fn snapshot(&self, live_connections: usize) -> AggregateSnapshot {
        AggregateSnapshot {
            total_page_views: self.total_page_views(),
            unique_visitors: self.unique_visitors(),
            live_connections,
            recent_page_views: self.recent(RECENT_PAGE_VIEWS).to_vec(),
        }
    }
}
