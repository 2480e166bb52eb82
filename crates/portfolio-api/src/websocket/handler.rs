//! WebSocket 연결 handler.
//!
//! Axum WebSocket 엔드포인트 및 메시지 처리.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use portfolio_core::ConnectionId;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::hub::{Envelope, SharedHub};
use super::router::route_text;
use crate::utils::ClientAddr;

/// WebSocket 상태.
#[derive(Clone)]
pub struct WsState {
    /// 연결 허브
    pub hub: SharedHub,
}

impl WsState {
    pub fn new(hub: SharedHub) -> Self {
        Self { hub }
    }
}

/// WebSocket 업그레이드 핸들러.
///
/// HTTP 연결을 WebSocket으로 업그레이드합니다.
///
/// # 엔드포인트
///
/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ClientAddr(ip): ClientAddr,
    headers: HeaderMap,
    State(ws_state): State<WsState>,
) -> impl IntoResponse {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ws.on_upgrade(move |socket| handle_socket(socket, ws_state, ip.to_string(), user_agent))
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, state: WsState, remote_address: String, user_agent: Option<String>) {
    let (connection, mut broadcast_rx) = state.hub.connect(remote_address, user_agent).await;
    let connection_id = connection.id;

    let (mut sender, mut receiver) = socket.split();

    // 클라이언트 메시지 수신 태스크
    let hub = state.hub.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_client_message(&hub, &connection_id, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // 브로드캐스트 메시지 전송 태스크
    let mut send_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(envelope) => {
                    if !deliver(&mut sender, &connection_id, envelope).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(connection_id = %connection_id, skipped = n, "WebSocket lagged behind broadcast");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // 하나의 태스크가 종료되면 다른 것도 종료
    tokio::select! {
        _ = &mut receive_task => {
            debug!(connection_id = %connection_id, "Receive task ended");
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!(connection_id = %connection_id, "Send task ended");
            receive_task.abort();
        }
    }

    state.hub.disconnect(&connection_id).await;
    info!(connection_id = %connection_id, "WebSocket closed");
}

/// 이 연결이 받을 메시지면 전송.
///
/// # Returns
///
/// 소켓에 더 이상 쓸 수 없으면 `false`
async fn deliver<S>(sender: &mut S, id: &ConnectionId, envelope: Envelope) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    if !envelope.reaches(id) {
        return true;
    }

    match envelope.message.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(connection_id = %id, error = %e, "Failed to serialize outbound message");
            true
        }
    }
}

/// 클라이언트 메시지 처리.
///
/// # Returns
///
/// `true`면 연결 유지, `false`면 연결 종료
async fn handle_client_message(hub: &SharedHub, id: &ConnectionId, msg: Message) -> bool {
    match msg {
        Message::Text(text) => {
            route_text(hub, id, text.as_str()).await;
            true
        }
        Message::Binary(_) => {
            debug!(connection_id = %id, "Ignoring binary frame");
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(connection_id = %id, "Close frame received");
            false
        }
    }
}

/// WebSocket 라우터 생성.
pub fn websocket_router(state: WsState) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .with_state(state)
}
