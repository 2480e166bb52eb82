//! WebSocket 실시간 흐름 통합 테스트
//!
//! 임시 포트에 실제 서버를 띄우고 tokio-tungstenite 클라이언트로 접속합니다.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use portfolio_api::{build_app, create_hub};
use portfolio_core::{AnalyticsAggregator, AppConfig};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;

    let app = build_app(&config, create_hub(AnalyticsAggregator::new(), 256), None);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

/// 클라이언트가 임의로 `X-Forwarded-For`를 붙여 접속
async fn connect_forwarded(addr: SocketAddr, forwarded_for: &str) -> Client {
    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    let (client, _) = connect_async(request).await.unwrap();
    client
}

async fn send(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.unwrap();
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for server message")
            .expect("connection closed")
            .expect("websocket error");

        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn expect_count(client: &mut Client, count: u64) {
    let event = next_event(client).await;
    assert_eq!(event["event"], "user_count");
    assert_eq!(event["data"]["count"], count);
}

/// 세 클라이언트를 차례로 접속시키고 접속자 수 브로드캐스트를 소비
async fn connect_three(addr: SocketAddr) -> (Client, Client, Client) {
    let mut a = connect(addr).await;
    expect_count(&mut a, 1).await;

    let mut b = connect(addr).await;
    expect_count(&mut a, 2).await;
    expect_count(&mut b, 2).await;

    let mut c = connect(addr).await;
    expect_count(&mut a, 3).await;
    expect_count(&mut b, 3).await;
    expect_count(&mut c, 3).await;

    (a, b, c)
}

#[tokio::test]
async fn page_view_reaches_every_client() {
    let addr = spawn_server().await;
    let (mut a, mut b, mut c) = connect_three(addr).await;

    send(&mut a, "page_view", json!({ "page": "/home" })).await;

    for client in [&mut a, &mut b, &mut c] {
        let event = next_event(client).await;
        assert_eq!(event["event"], "visitor_analytics");

        let data = &event["data"];
        assert_eq!(data["totalPageViews"], 1);
        assert_eq!(data["uniqueVisitors"], 1);
        assert_eq!(data["realtimeUsers"], 3);
        assert_eq!(data["recentPageViews"].as_array().unwrap().len(), 1);
        assert_eq!(data["recentPageViews"][0]["page"], "/home");
        assert_eq!(data["recentPageViews"][0]["remoteAddress"], "127.0.0.1");
    }
}

#[tokio::test]
async fn interactions_skip_the_sender() {
    let addr = spawn_server().await;
    let (mut a, mut b, mut c) = connect_three(addr).await;

    send(&mut a, "skill_interaction", json!({ "skill": "Rust" })).await;
    send(&mut a, "project_view", json!({ "project": "portfolio" })).await;

    for client in [&mut b, &mut c] {
        let skill = next_event(client).await;
        assert_eq!(skill["event"], "skill_popular");
        assert_eq!(skill["data"]["skill"], "Rust");
        assert!(skill["data"]["timestamp"].is_string());

        let project = next_event(client).await;
        assert_eq!(project["event"], "project_activity");
        assert_eq!(project["data"]["project"], "portfolio");
    }

    // 보낸 쪽의 다음 메시지는 자기 요청에 대한 응답이어야 함
    send(&mut a, "request_portfolio_update", json!({})).await;
    let update = next_event(&mut a).await;
    assert_eq!(update["event"], "portfolio_update");
    assert_eq!(update["data"]["type"], "skills_update");
    assert_eq!(update["data"]["data"]["newSkills"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn replies_go_only_to_the_sender() {
    let addr = spawn_server().await;
    let (mut a, mut b, _c) = connect_three(addr).await;

    send(
        &mut b,
        "contact_form",
        json!({ "name": "Alice", "email": "a@x.com", "message": "hi" }),
    )
    .await;

    let response = next_event(&mut b).await;
    assert_eq!(response["event"], "contact_response");
    assert_eq!(response["data"]["status"], "received");

    send(&mut a, "request_portfolio_update", json!(null)).await;
    assert_eq!(next_event(&mut a).await["event"], "portfolio_update");
}

#[tokio::test]
async fn bad_frames_are_ignored() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    expect_count(&mut a, 1).await;

    a.send(Message::Text("not json".to_string())).await.unwrap();
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    send(&mut a, "launch_rockets", json!({ "count": 3 })).await;
    send(&mut a, "page_view", json!({ "path": "/missing-page-field" })).await;

    // 연결은 유지되고 다음 이벤트는 정상 처리됨
    send(&mut a, "page_view", json!({ "page": "/about" })).await;
    let event = next_event(&mut a).await;
    assert_eq!(event["event"], "visitor_analytics");
    assert_eq!(event["data"]["totalPageViews"], 1);
}

#[tokio::test]
async fn disconnect_decrements_count() {
    let addr = spawn_server().await;
    let (mut a, mut b, mut c) = connect_three(addr).await;

    c.close(None).await.unwrap();

    expect_count(&mut a, 2).await;
    expect_count(&mut b, 2).await;

    drop(b);
    expect_count(&mut a, 1).await;
}

#[tokio::test]
async fn forwarded_headers_do_not_create_visitors() {
    let addr = spawn_server().await;

    let mut a = connect_forwarded(addr, "203.0.113.1").await;
    expect_count(&mut a, 1).await;
    let mut b = connect_forwarded(addr, "203.0.113.2").await;
    expect_count(&mut a, 2).await;
    expect_count(&mut b, 2).await;

    send(&mut a, "page_view", json!({ "page": "/home" })).await;
    send(&mut b, "page_view", json!({ "page": "/about" })).await;

    let first = next_event(&mut a).await;
    let second = next_event(&mut a).await;
    assert_eq!(first["event"], "visitor_analytics");
    assert_eq!(second["data"]["totalPageViews"], 2);
    assert_eq!(second["data"]["uniqueVisitors"], 1);
    for record in second["data"]["recentPageViews"].as_array().unwrap() {
        assert_eq!(record["remoteAddress"], "127.0.0.1");
    }
}
