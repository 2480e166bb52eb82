//! 연결 허브.
//!
//! 연결 레지스트리와 분석 집계기를 소유하고, 상태 변경 결과를
//! 모든 연결에 팬아웃합니다.
//!
//! 모든 변경(연결, 해제, 이벤트)은 하나의 쓰기 락 안에서 처리되고
//! 결과 메시지도 락을 쥔 채 브로드캐스트 채널에 넣습니다. 따라서 이벤트는
//! 한 번에 하나씩 전체 순서대로 적용되고, 클라이언트가 받는 메시지 순서도
//! 같습니다. 각 연결은 자기 수신기에서 [`Delivery`] 대상에 맞는 것만 전송합니다.

use std::sync::Arc;

use portfolio_core::{
    AggregateSnapshot, AnalyticsAggregator, Connection, ConnectionId, ConnectionRegistry,
    PageViewRecord,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use super::messages::{ClientEvent, ServerMessage};
use crate::metrics::{record_broadcast, record_page_view, set_realtime_connections};

/// 메시지 전달 대상.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// 모든 연결
    All,
    /// 보낸 연결을 제외한 모든 연결
    AllExcept(ConnectionId),
    /// 보낸 연결만
    Only(ConnectionId),
}

/// 대상이 지정된 아웃바운드 메시지.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub delivery: Delivery,
    pub message: ServerMessage,
}

impl Envelope {
    /// 해당 연결이 이 메시지를 받아야 하는지 확인.
    pub fn reaches(&self, id: &ConnectionId) -> bool {
        match &self.delivery {
            Delivery::All => true,
            Delivery::AllExcept(sender) => sender != id,
            Delivery::Only(target) => target == id,
        }
    }
}

struct HubState {
    registry: ConnectionRegistry,
    analytics: AnalyticsAggregator,
}

/// 연결 허브.
pub struct ConnectionHub {
    /// 메시지 브로드캐스트 채널
    broadcast_tx: broadcast::Sender<Envelope>,
    /// 레지스트리 + 집계기
    state: RwLock<HubState>,
}

impl ConnectionHub {
    /// 새로운 허브 생성.
    ///
    /// # Arguments
    ///
    /// * `analytics` - 프로세스 수명 동안 사용할 집계기
    /// * `capacity` - 브로드캐스트 채널 버퍼 크기
    pub fn new(analytics: AnalyticsAggregator, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            broadcast_tx: tx,
            state: RwLock::new(HubState {
                registry: ConnectionRegistry::new(),
                analytics,
            }),
        }
    }

    /// 새 연결 등록.
    ///
    /// 수신기는 접속자 수 브로드캐스트 전에 구독되므로 새 연결도 자기
    /// 접속 이후의 접속자 수를 받습니다.
    pub async fn connect(
        &self,
        remote_address: impl Into<String>,
        user_agent: Option<String>,
    ) -> (Connection, broadcast::Receiver<Envelope>) {
        let mut state = self.state.write().await;
        let receiver = self.broadcast_tx.subscribe();
        let connection = state.registry.connect(remote_address, user_agent);
        let count = state.registry.live_count();

        info!(
            connection_id = %connection.id,
            remote_address = %connection.remote_address,
            total = count,
            "User connected"
        );
        set_realtime_connections(count);
        self.publish(Delivery::All, ServerMessage::user_count(count));

        (connection, receiver)
    }

    /// 연결 해제.
    ///
    /// 알 수 없는 ID는 no-op이며 아무것도 브로드캐스트하지 않습니다.
    pub async fn disconnect(&self, id: &ConnectionId) -> Option<Connection> {
        let mut state = self.state.write().await;
        let removed = state.registry.disconnect(id)?;
        let count = state.registry.live_count();

        info!(connection_id = %id, total = count, "User disconnected");
        set_realtime_connections(count);
        self.publish(Delivery::All, ServerMessage::user_count(count));

        Some(removed)
    }

    /// 해석된 이벤트 처리.
    ///
    /// 등록되지 않은 연결의 이벤트는 무시하고 `false`를 반환합니다.
    pub async fn handle_event(&self, id: &ConnectionId, event: ClientEvent) -> bool {
        let mut state = self.state.write().await;
        let Some(connection) = state.registry.get(id).cloned() else {
            debug!(connection_id = %id, event = event.name(), "Event from unknown connection ignored");
            return false;
        };

        match event {
            ClientEvent::PageView(payload) => {
                info!(connection_id = %id, page = %payload.page, "Page view");
                let record =
                    PageViewRecord::from_connection(&connection, payload.page, payload.user_agent);
                state.analytics.record_page_view(record);
                record_page_view();

                let snapshot = state.analytics.snapshot(state.registry.live_count());
                self.publish(Delivery::All, ServerMessage::VisitorAnalytics(snapshot));
            }
            ClientEvent::SkillInteraction(payload) => {
                info!(connection_id = %id, skill = %payload.skill, "Skill interaction");
                self.publish(Delivery::AllExcept(*id), ServerMessage::skill_popular(payload.skill));
            }
            ClientEvent::ProjectView(payload) => {
                info!(connection_id = %id, project = %payload.project, "Project viewed");
                self.publish(
                    Delivery::AllExcept(*id),
                    ServerMessage::project_activity(payload.project),
                );
            }
            ClientEvent::ContactForm(payload) => {
                info!(
                    connection_id = %id,
                    has_name = payload.name.is_some(),
                    has_email = payload.email.is_some(),
                    has_message = payload.message.is_some(),
                    "Contact form submission"
                );
                self.publish(Delivery::Only(*id), ServerMessage::contact_received());
            }
            ClientEvent::RequestPortfolioUpdate => {
                debug!(connection_id = %id, "Portfolio update requested");
                self.publish(Delivery::Only(*id), ServerMessage::skills_update());
            }
        }

        true
    }

    /// 현재 분석 스냅샷.
    pub async fn snapshot(&self) -> AggregateSnapshot {
        let state = self.state.read().await;
        state.analytics.snapshot(state.registry.live_count())
    }

    /// 레지스트리와 집계기를 같은 시점으로 읽음.
    pub async fn read<R>(&self, f: impl FnOnce(&ConnectionRegistry, &AnalyticsAggregator) -> R) -> R {
        let state = self.state.read().await;
        f(&state.registry, &state.analytics)
    }

    /// 연결된 클라이언트 수.
    pub async fn live_count(&self) -> usize {
        self.state.read().await.registry.live_count()
    }

    pub async fn is_connected(&self, id: &ConnectionId) -> bool {
        self.state.read().await.registry.contains(id)
    }

    /// 메시지를 브로드캐스트 채널에 넣음.
    ///
    /// 수신기가 하나도 없으면 메시지는 버려집니다.
    fn publish(&self, delivery: Delivery, message: ServerMessage) {
        record_broadcast(message.name());
        let _ = self.broadcast_tx.send(Envelope { delivery, message });
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new(AnalyticsAggregator::new(), 1024) // 기본 버퍼 크기
    }
}

/// 공유 가능한 허브 타입.
pub type SharedHub = Arc<ConnectionHub>;

/// 새로운 공유 허브 생성.
pub fn create_hub(analytics: AnalyticsAggregator, capacity: usize) -> SharedHub {
    Arc::new(ConnectionHub::new(analytics, capacity))
}
