//! 연결 레지스트리.
//!
//! 현재 열려 있는 클라이언트 연결과 실시간 접속자 수를 추적합니다.
//! 접속자 수는 별도 카운터가 아니라 열린 연결 수에서 파생되므로
//! 음수가 되거나 실제 연결 수와 어긋날 수 없습니다.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 연결 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema), schema(value_type = String))]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 새로운 무작위 식별자 생성.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// 열린 실시간 세션 하나.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// 연결 ID
    pub id: ConnectionId,
    /// 원격 주소 (프록시 헤더 우선)
    pub remote_address: String,
    /// 연결 시각
    pub connected_at: DateTime<Utc>,
    /// 핸드셰이크 요청의 User-Agent
    pub user_agent: Option<String>,
}

/// 연결 레지스트리.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 연결 등록.
    ///
    /// 새 식별자를 발급하고 접속자 수를 1 증가시킵니다.
    pub fn connect(
        &mut self,
        remote_address: impl Into<String>,
        user_agent: Option<String>,
    ) -> Connection {
        let connection = Connection {
            id: ConnectionId::new(),
            remote_address: remote_address.into(),
            connected_at: Utc::now(),
            user_agent,
        };
        self.connections.insert(connection.id, connection.clone());
        connection
    }

    /// 연결 해제.
    ///
    /// 알 수 없는 ID는 아무 일도 하지 않고 `None`을 반환합니다 (멱등).
    pub fn disconnect(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// 현재 열린 연결 수.
    pub fn live_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
