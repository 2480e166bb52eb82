//! 인바운드 이벤트 라우팅.
//!
//! WebSocket과 롱 폴링 전송이 공유합니다. 프레임을 해석해 허브로 넘기고,
//! 잘못된 입력은 로그만 남기고 버립니다. 클라이언트에 에러를 보내지 않습니다.

use portfolio_core::ConnectionId;
use tracing::{debug, warn};

use super::hub::ConnectionHub;
use super::messages::{ClientEvent, ClientFrame, WsError};
use crate::metrics::record_event;

/// 프레임 처리 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// 허브가 이벤트를 적용함
    Handled(&'static str),
    /// 알 수 없는 이벤트 이름 (무시)
    UnknownEvent(String),
    /// 알려진 이벤트지만 페이로드가 맞지 않음 (버림)
    InvalidPayload,
    /// JSON 프레임이 아님 (버림)
    InvalidFrame,
    /// 연결이 이미 해제됨
    UnknownConnection,
}

/// 텍스트 프레임 처리.
pub async fn route_text(hub: &ConnectionHub, id: &ConnectionId, text: &str) -> RouteOutcome {
    match ClientFrame::from_json(text) {
        Ok(frame) => route_frame(hub, id, frame).await,
        Err(e) => {
            warn!(connection_id = %id, error = %e, "Dropping malformed frame");
            RouteOutcome::InvalidFrame
        }
    }
}

/// 해석된 프레임 처리.
pub async fn route_frame(hub: &ConnectionHub, id: &ConnectionId, frame: ClientFrame) -> RouteOutcome {
    let name = frame.event.clone();

    match ClientEvent::parse(frame) {
        Ok(Some(event)) => {
            let event_name = event.name();
            if hub.handle_event(id, event).await {
                record_event(event_name, "handled");
                RouteOutcome::Handled(event_name)
            } else {
                RouteOutcome::UnknownConnection
            }
        }
        Ok(None) => {
            debug!(connection_id = %id, event = %name, "Ignoring unknown event");
            record_event("unknown", "unknown");
            RouteOutcome::UnknownEvent(name)
        }
        Err(WsError::InvalidPayload { event, reason }) => {
            warn!(connection_id = %id, event = %event, reason = %reason, "Dropping event with invalid payload");
            record_event(&event, "invalid");
            RouteOutcome::InvalidPayload
        }
        Err(e) => {
            warn!(connection_id = %id, error = %e, "Dropping frame");
            RouteOutcome::InvalidFrame
        }
    }
}
