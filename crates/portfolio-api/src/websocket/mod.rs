//! 실시간 방문자 채널.
//!
//! WebSocket(`/ws`)과 롱 폴링(`/poll`) 두 전송이 같은 연결 허브를 공유합니다.
//!
//! # 메시지 형식
//!
//! 모든 메시지는 `{"event": "<이름>", "data": {...}}` 형식의 JSON입니다.
//!
//! ## 클라이언트 → 서버
//!
//! ```json
//! {"event": "page_view", "data": {"page": "/home", "userAgent": "..."}}
//! {"event": "skill_interaction", "data": {"skill": "Rust"}}
//! {"event": "project_view", "data": {"project": "portfolio"}}
//! {"event": "contact_form", "data": {"name": "...", "email": "...", "message": "..."}}
//! {"event": "request_portfolio_update"}
//! ```
//!
//! ## 서버 → 클라이언트
//!
//! ```json
//! {"event": "user_count", "data": {"count": 3}}
//! {"event": "visitor_analytics", "data": {"totalPageViews": 1, "uniqueVisitors": 1, "realtimeUsers": 3, "recentPageViews": [...]}}
//! {"event": "skill_popular", "data": {"skill": "Rust", "timestamp": "..."}}
//! ```

pub mod handler;
pub mod hub;
pub mod messages;
pub mod polling;
pub mod router;

pub use handler::{websocket_handler, websocket_router, WsState};
pub use hub::{create_hub, ConnectionHub, Delivery, Envelope, SharedHub};
pub use messages::{ClientEvent, ClientFrame, ServerMessage, WsError};
pub use polling::{polling_router, start_poll_reaper, PollEventsResponse, PollSessionResponse, PollState};
pub use router::{route_frame, route_text, RouteOutcome};
