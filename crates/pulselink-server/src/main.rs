//! Pulselink Server
//!
//! PPG 数据桥接服务，负责：
//! - BLE 扫描与持久连接管理
//! - 原始 PPG 窗口的单次读取 (HTTP)
//! - 聚合后的连续样本流 (WebSocket)

mod routes;
mod stream;

use anyhow::Result;
use pulselink_core::{AppSettings, BtleTransport, ConnectionSupervisor, LinkRegistry, Transport};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（pulselink-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    // 初始化日志
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pulselink_core=debug")),
        )
        .try_init();

    tracing::info!("Pulselink Server starting...");

    let settings = AppSettings::load();

    let registry = Arc::new(LinkRegistry::new());
    let transport: Arc<dyn Transport> = Arc::new(BtleTransport::new().await?);
    let supervisor = Arc::new(ConnectionSupervisor::new(
        registry.clone(),
        transport.clone(),
    ));

    let state = routes::AppState {
        settings: settings.clone(),
        registry,
        transport,
        supervisor: supervisor.clone(),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;
    tracing::info!("HTTP 服务监听 {}", settings.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 退出前断开所有持久连接，不留下孤儿链路
    supervisor.disconnect_all().await;
    tracing::info!("所有连接已关闭，退出");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("收到 Ctrl-C，准备关闭...");
}
