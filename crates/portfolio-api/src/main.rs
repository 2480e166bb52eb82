//! 포트폴리오 실시간 분석 서버.
//!
//! 설정을 로드하고 REST API, WebSocket, 롱 폴링 엔드포인트를 시작합니다.

use std::net::SocketAddr;
use std::time::Duration;

use portfolio_api::middleware::start_rate_limit_cleanup;
use portfolio_api::websocket::start_poll_reaper;
use portfolio_api::{build_app, create_hub, setup_metrics_recorder};
use portfolio_core::{init_logging, AnalyticsAggregator, AppConfig, LogConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없어도 무시)
    dotenvy::dotenv().ok();

    let config = AppConfig::load_default()?;
    let _log_guard = init_logging(LogConfig::from(&config.logging))?;

    info!(
        environment = %config.server.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Starting portfolio realtime server"
    );

    let metrics_handle = match setup_metrics_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
            None
        }
    };

    // 집계기는 프로세스 수명 동안 하나만 존재
    let hub = create_hub(AnalyticsAggregator::new(), config.realtime.broadcast_capacity);
    let app = build_app(&config, hub, metrics_handle);

    let shutdown_token = CancellationToken::new();
    let mut background_tasks = vec![start_poll_reaper(
        app.poll_state.clone(),
        Duration::from_secs(config.polling.reap_interval_secs),
        shutdown_token.clone(),
    )];
    if let Some(rate_limit) = app.rate_limit.clone() {
        background_tasks.push(start_rate_limit_cleanup(rate_limit, shutdown_token.clone()));
    }

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Server listening");
    info!("WebSocket endpoint: /ws, polling endpoint: /poll");

    axum::serve(
        listener,
        app.router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
    .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    // 정리 작업에 최대 10초 대기
    let cleanup = futures::future::join_all(background_tasks);
    if tokio::time::timeout(Duration::from_secs(10), cleanup).await.is_err() {
        warn!("Background tasks did not stop within 10s");
    }

    info!("Server stopped");
    Ok(())
}

/// 종료 시그널 대기 (Ctrl+C, SIGTERM).
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    // 모든 백그라운드 태스크에 종료 시그널 전파
    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
