//! 롱 폴링 전송 통합 테스트

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use futures::{SinkExt, StreamExt};
use portfolio_api::{build_app, create_hub};
use portfolio_core::{AnalyticsAggregator, AppConfig};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

fn test_router() -> Router {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;
    build_app(&config, create_hub(AnalyticsAggregator::new(), 256), None).router
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn open_session(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/poll", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["connectionId"].as_str().unwrap().to_string()
}

async fn next_ws_event(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> Value {
    match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).unwrap(),
        other => panic!("Unexpected websocket result: {:?}", other),
    }
}

fn event_names(body: &Value) -> Vec<String> {
    body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn poll_session_lifecycle() {
    let app = test_router();
    let id = open_session(&app).await;
    let uri = format!("/poll/{}", id);

    // 자기 접속으로 인한 접속자 수
    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][0], json!({ "event": "user_count", "data": { "count": 1 } }));

    let (status, _) = call(
        &app,
        Method::POST,
        &uri,
        Some(r#"{"event":"page_view","data":{"page":"/home"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(event_names(&body), vec!["visitor_analytics"]);
    assert_eq!(body["events"][0]["data"]["totalPageViews"], 1);
    assert_eq!(body["events"][0]["data"]["realtimeUsers"], 1);

    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");

    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_and_malformed_session_ids() {
    let app = test_router();

    let (status, _) = call(&app, Method::GET, "/poll/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        "/poll/123e4567-e89b-12d3-a456-426614174000",
        Some(r#"{"event":"page_view","data":{"page":"/"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_poll_frame_is_rejected() {
    let app = test_router();
    let id = open_session(&app).await;

    let (status, body) = call(&app, Method::POST, &format!("/poll/{}", id), Some("garbage")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    // 알 수 없는 이벤트는 허용되지만 무시됨
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/poll/{}", id),
        Some(r#"{"event":"launch_rockets"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test(start_paused = true)]
async fn empty_long_poll_times_out() {
    let app = test_router();
    let id = open_session(&app).await;
    let uri = format!("/poll/{}", id);

    call(&app, Method::GET, &uri, None).await;

    let started = tokio::time::Instant::now();
    let (status, body) = call(&app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["events"].as_array().unwrap().is_empty());
    assert!(started.elapsed() >= Duration::from_secs(25));
}

#[tokio::test]
async fn poll_and_websocket_share_the_hub() {
    let app = test_router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, server.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    assert_eq!(next_ws_event(&mut ws).await["data"]["count"], 1);

    // 폴링 세션도 접속자 수에 포함됨
    let id = open_session(&app).await;
    assert_eq!(next_ws_event(&mut ws).await["data"]["count"], 2);

    // WebSocket 클라이언트의 상호작용이 폴링 세션에 전달됨
    ws.send(Message::Text(
        json!({ "event": "skill_interaction", "data": { "skill": "Rust" } }).to_string(),
    ))
    .await
    .unwrap();

    let uri = format!("/poll/{}", id);
    let mut received = Vec::new();
    for _ in 0..3 {
        let (_, body) = call(&app, Method::GET, &uri, None).await;
        received.extend(event_names(&body));
        if received.iter().any(|name| name == "skill_popular") {
            break;
        }
    }
    assert_eq!(received, vec!["user_count", "skill_popular"]);
}
