//! 롱 폴링 전송.
//!
//! WebSocket 업그레이드가 불가능한 클라이언트용입니다. 폴링 세션도 허브에
//! 등록된 일반 연결이므로 접속자 수와 팬아웃에 포함됩니다.
//!
//! # 엔드포인트
//!
//! - `POST /poll` - 세션 생성 → `201 {connectionId}`
//! - `GET /poll/{id}` - 대기 중인 이벤트 수신 (없으면 대기 시간만큼 보류)
//! - `POST /poll/{id}` - 인바운드 이벤트 전송 → `202`
//! - `DELETE /poll/{id}` - 세션 종료 → `204`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use portfolio_core::{ConnectionId, PollingConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::hub::{Envelope, SharedHub};
use super::messages::{ClientFrame, ServerMessage};
use super::router::route_frame;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::utils::ClientAddr;

/// 폴링 세션.
pub struct PollSession {
    receiver: broadcast::Receiver<Envelope>,
    last_seen: Instant,
}

impl PollSession {
    fn new(receiver: broadcast::Receiver<Envelope>) -> Self {
        Self {
            receiver,
            last_seen: Instant::now(),
        }
    }

    /// 대기 중인 이벤트를 꺼냄.
    ///
    /// 쌓인 이벤트가 없으면 `wait` 동안 첫 이벤트를 기다립니다.
    async fn drain(&mut self, id: &ConnectionId, wait: Duration) -> Vec<ServerMessage> {
        self.last_seen = Instant::now();

        let mut events = self.take_ready(id);
        if events.is_empty() {
            let deadline = Instant::now() + wait;
            loop {
                match tokio::time::timeout_at(deadline, self.receiver.recv()).await {
                    Err(_) => break,
                    Ok(Ok(envelope)) => {
                        if envelope.reaches(id) {
                            events.push(envelope.message);
                            events.extend(self.take_ready(id));
                            break;
                        }
                    }
                    Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                        warn!(connection_id = %id, skipped = n, "Poll session lagged behind broadcast");
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => break,
                }
            }
        }

        self.last_seen = Instant::now();
        events
    }

    fn take_ready(&mut self, id: &ConnectionId) -> Vec<ServerMessage> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => {
                    if envelope.reaches(id) {
                        events.push(envelope.message);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(connection_id = %id, skipped = n, "Poll session lagged behind broadcast");
                }
                Err(_) => break,
            }
        }
        events
    }
}

/// 폴링 상태.
#[derive(Clone)]
pub struct PollState {
    hub: SharedHub,
    sessions: Arc<RwLock<HashMap<ConnectionId, Arc<Mutex<PollSession>>>>>,
    wait: Duration,
    idle_timeout: Duration,
}

impl PollState {
    pub fn new(hub: SharedHub, config: &PollingConfig) -> Self {
        Self {
            hub,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            wait: Duration::from_secs(config.wait_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }

    /// 새 세션 등록.
    pub async fn open(&self, remote_address: impl Into<String>, user_agent: Option<String>) -> ConnectionId {
        let (connection, receiver) = self.hub.connect(remote_address, user_agent).await;
        self.sessions
            .write()
            .await
            .insert(connection.id, Arc::new(Mutex::new(PollSession::new(receiver))));
        connection.id
    }

    async fn session(&self, id: &ConnectionId) -> Option<Arc<Mutex<PollSession>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// 세션 종료. 알 수 없는 ID면 `false`.
    pub async fn close(&self, id: &ConnectionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            self.hub.disconnect(id).await;
        }
        removed
    }

    /// 유휴 시간을 넘긴 세션을 끊고 끊은 수를 반환.
    ///
    /// 롱 폴링 중인 세션은 건너뜁니다.
    pub async fn reap_idle(&self) -> usize {
        let expired: Vec<ConnectionId> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<ConnectionId> = sessions
                .iter()
                .filter(|(_, session)| {
                    session
                        .try_lock()
                        .map(|s| s.last_seen.elapsed() > self.idle_timeout)
                        .unwrap_or(false)
                })
                .map(|(id, _)| *id)
                .collect();
            for id in &expired {
                sessions.remove(id);
            }
            expired
        };

        for id in &expired {
            info!(connection_id = %id, "Poll session expired");
            self.hub.disconnect(id).await;
        }
        expired.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// 세션 생성 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSessionResponse {
    pub connection_id: ConnectionId,
}

/// 이벤트 수신 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollEventsResponse {
    pub events: Vec<ServerMessage>,
}

fn session_not_found(raw_id: &str) -> (StatusCode, Json<ApiErrorResponse>) {
    ApiErrorResponse::new("Not Found")
        .with_message(format!("Unknown poll session: {}", raw_id))
        .with_status(StatusCode::NOT_FOUND)
}

async fn lookup(state: &PollState, raw_id: &str) -> ApiResult<(ConnectionId, Arc<Mutex<PollSession>>)> {
    let id: ConnectionId = raw_id.parse().map_err(|_| session_not_found(raw_id))?;
    let session = state.session(&id).await.ok_or_else(|| session_not_found(raw_id))?;
    Ok((id, session))
}

/// 세션 생성.
pub async fn open_session(
    ClientAddr(ip): ClientAddr,
    headers: HeaderMap,
    State(state): State<PollState>,
) -> (StatusCode, Json<PollSessionResponse>) {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let connection_id = state.open(ip.to_string(), user_agent).await;
    debug!(connection_id = %connection_id, "Poll session opened");

    (StatusCode::CREATED, Json(PollSessionResponse { connection_id }))
}

/// 대기 중인 이벤트 수신 (롱 폴링).
pub async fn poll_events(
    Path(raw_id): Path<String>,
    State(state): State<PollState>,
) -> ApiResult<Json<PollEventsResponse>> {
    let (id, session) = lookup(&state, &raw_id).await?;
    let events = session.lock().await.drain(&id, state.wait).await;
    Ok(Json(PollEventsResponse { events }))
}

/// 인바운드 이벤트 전송.
pub async fn send_event(
    Path(raw_id): Path<String>,
    State(state): State<PollState>,
    body: Result<Json<ClientFrame>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let (id, _) = lookup(&state, &raw_id).await?;

    let Json(frame) = body.map_err(|rejection| {
        warn!(connection_id = %id, error = %rejection.body_text(), "Dropping malformed poll frame");
        ApiErrorResponse::new("Bad Request")
            .with_message(rejection.body_text())
            .with_status(StatusCode::BAD_REQUEST)
    })?;

    route_frame(&state.hub, &id, frame).await;
    Ok(StatusCode::ACCEPTED)
}

/// 세션 종료.
pub async fn close_session(
    Path(raw_id): Path<String>,
    State(state): State<PollState>,
) -> ApiResult<StatusCode> {
    let id: ConnectionId = raw_id.parse().map_err(|_| session_not_found(&raw_id))?;
    if state.close(&id).await {
        debug!(connection_id = %id, "Poll session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(&raw_id))
    }
}

/// 폴링 라우터 생성.
pub fn polling_router(state: PollState) -> Router {
    Router::new()
        .route("/", post(open_session))
        .route(
            "/{id}",
            get(poll_events).post(send_event).delete(close_session),
        )
        .with_state(state)
}

/// 유휴 세션 정리 태스크 시작.
pub fn start_poll_reaper(state: PollState, every: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let reaped = state.reap_idle().await;
                    if reaped > 0 {
                        let remaining = state.session_count().await;
                        debug!(reaped, remaining, "Idle poll sessions reaped");
                    }
                }
            }
        }

        debug!("Poll reaper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::hub::ConnectionHub;
    use serde_json::json;

    fn test_state() -> PollState {
        let config = PollingConfig {
            wait_secs: 5,
            idle_timeout_secs: 60,
            reap_interval_secs: 15,
        };
        PollState::new(Arc::new(ConnectionHub::default()), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_returns_queued_events_immediately() {
        let state = test_state();
        let id = state.open("10.0.0.1", None).await;

        let session = state.session(&id).await.unwrap();
        let events = session.lock().await.drain(&id, state.wait).await;

        // 자기 접속으로 인한 접속자 수
        assert_eq!(events, vec![ServerMessage::user_count(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_times_out_empty() {
        let state = test_state();
        let id = state.open("10.0.0.1", None).await;
        let session = state.session(&id).await.unwrap();
        session.lock().await.drain(&id, state.wait).await;

        let started = Instant::now();
        let events = session.lock().await.drain(&id, state.wait).await;

        assert!(events.is_empty());
        assert!(started.elapsed() >= state.wait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_wakes_on_event() {
        let state = test_state();
        let id = state.open("10.0.0.1", None).await;
        let session = state.session(&id).await.unwrap();
        session.lock().await.drain(&id, state.wait).await;

        let hub = state.hub.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            route_frame(&hub, &id, ClientFrame::new("request_portfolio_update", json!({}))).await;
        });

        let events = session.lock().await.drain(&id, state.wait).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "portfolio_update");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_sessions() {
        let state = test_state();
        let stale = state.open("10.0.0.1", None).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = state.open("10.0.0.2", None).await;

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(state.reap_idle().await, 1);

        assert!(state.session(&stale).await.is_none());
        assert!(state.session(&fresh).await.is_some());
        assert!(!state.hub.is_connected(&stale).await);
        assert_eq!(state.hub.live_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_task_disconnects_idle_sessions() {
        let state = test_state();
        let id = state.open("10.0.0.1", None).await;

        let shutdown = CancellationToken::new();
        let task = start_poll_reaper(state.clone(), Duration::from_secs(15), shutdown.clone());

        // 60초 유휴 후 다음 주기(75초)에 정리됨
        tokio::time::sleep(Duration::from_secs(76)).await;
        assert_eq!(state.session_count().await, 0);
        assert!(!state.hub.is_connected(&id).await);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let state = test_state();
        assert!(!state.close(&ConnectionId::new()).await);
        assert_eq!(state.hub.live_count().await, 0);
    }
}
