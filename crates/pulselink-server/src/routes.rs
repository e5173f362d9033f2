//! HTTP API 路由
//!
//! 响应体一律 camelCase JSON；查询参数沿用 snake_case。
//! 每个失败都映射到稳定的 `error` 标识符加可读的 `message`。

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pulselink_core::{
    AppSettings, BleError, ConnectionSupervisor, DeviceScanner, LinkRegistry, Transport,
    WindowReader,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub settings: AppSettings,
    pub registry: Arc<LinkRegistry>,
    pub transport: Arc<dyn Transport>,
    pub supervisor: Arc<ConnectionSupervisor>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ble/scan", get(scan))
        .route("/ble/name", get(addresses_by_name))
        .route("/ble/connect/persistent", post(connect_persistent))
        .route("/ble/disconnect", post(disconnect))
        .route("/ble/status", get(status))
        .route("/ble/connections", get(connections))
        .route("/ppg/read", get(read_window))
        .route("/ppg/stream", get(crate::stream::stream_handler))
        .with_state(state)
}

// -----------------------
// 查询参数
// -----------------------

#[derive(Deserialize)]
pub struct ScanQuery {
    pub timeout: Option<u64>,
}

#[derive(Deserialize)]
pub struct NameQuery {
    pub name: String,
    pub timeout: Option<u64>,
}

#[derive(Deserialize)]
pub struct ConnectQuery {
    pub name: Option<String>,
    pub address: Option<String>,
    pub scan_timeout: Option<u64>,
    pub connect_timeout: Option<u64>,
}

#[derive(Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

#[derive(Deserialize)]
pub struct ReadQuery {
    pub address: String,
    pub channel: Option<Uuid>,
}

// -----------------------
// 响应体
// -----------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicesFound {
    pub name: String,
    pub addresses: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSuccess {
    pub message: String,
    pub address: String,
    pub is_connected: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectFailedBody {
    pub message: String,
    pub name: String,
    pub attempted_addresses: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectBody {
    pub message: String,
    pub address: String,
    pub was_connected: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub address: String,
    pub state: &'static str,
    pub is_connected: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsList {
    pub connections: Vec<ConnectionStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBody {
    pub captured_at: u64,
    pub samples: Vec<u16>,
}

/// 错误 → (状态码, 稳定标识符 + 详情)
pub fn error_response(err: &BleError) -> Response {
    let status = match err {
        BleError::DeviceNotFound(_) | BleError::NotFound(_) | BleError::ChannelNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        BleError::NotConnected(_) => StatusCode::CONFLICT,
        BleError::ConnectFailed { .. }
        | BleError::ConnectTimeout { .. }
        | BleError::IncompleteFrame { .. } => StatusCode::BAD_GATEWAY,
        BleError::ScanTimeout(_) | BleError::NoAdapter => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.kind(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

// -----------------------
// Handlers
// -----------------------

async fn scan(State(state): State<AppState>, Query(q): Query<ScanQuery>) -> Response {
    let scanner = DeviceScanner::new(state.transport.clone());
    let timeout = Duration::from_secs(q.timeout.unwrap_or(state.settings.scan_timeout_secs));

    match scanner.scan(timeout).await {
        Ok(devices) => (StatusCode::OK, Json(devices)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn addresses_by_name(State(state): State<AppState>, Query(q): Query<NameQuery>) -> Response {
    let scanner = DeviceScanner::new(state.transport.clone());
    let timeout = Duration::from_secs(q.timeout.unwrap_or(state.settings.scan_timeout_secs));

    match scanner.find_by_name(&q.name, timeout).await {
        Ok(matches) if matches.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(MessageBody {
                message: format!("No device named '{}' found", q.name),
            }),
        )
            .into_response(),
        Ok(matches) => (
            StatusCode::OK,
            Json(DevicesFound {
                name: q.name,
                addresses: matches.into_iter().map(|d| d.address).collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn connect_persistent(
    State(state): State<AppState>,
    Query(q): Query<ConnectQuery>,
) -> Response {
    let scan_timeout =
        Duration::from_secs(q.scan_timeout.unwrap_or(state.settings.scan_timeout_secs));
    let connect_timeout = Duration::from_secs(
        q.connect_timeout
            .unwrap_or(state.settings.connect_timeout_secs),
    );

    // 优先显式地址；否则按名称扫描（默认目标设备名来自配置）
    let result = if let Some(address) = &q.address {
        state
            .supervisor
            .connect_persistent_by_address(address, connect_timeout)
            .await
    } else {
        let name = q.name.clone().unwrap_or(state.settings.device_name.clone());
        state
            .supervisor
            .connect_persistent_by_name(&name, scan_timeout, connect_timeout)
            .await
    };

    match result {
        Ok(address) => (
            StatusCode::OK,
            Json(ConnectSuccess {
                message: "Persistent connection established".to_string(),
                address,
                is_connected: true,
            }),
        )
            .into_response(),
        Err(BleError::ConnectFailed {
            name,
            attempted,
            reasons,
        }) => (
            StatusCode::BAD_GATEWAY,
            Json(ConnectFailedBody {
                message: "Could not connect to any device with that name".to_string(),
                name,
                attempted_addresses: attempted,
                errors: reasons,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn disconnect(State(state): State<AppState>, Query(q): Query<AddressQuery>) -> Response {
    match state.supervisor.disconnect(&q.address).await {
        Ok(was_connected) => (
            StatusCode::OK,
            Json(DisconnectBody {
                message: if was_connected {
                    "Disconnected".to_string()
                } else {
                    "No active connection for that address".to_string()
                },
                address: q.address,
                was_connected,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn status(State(state): State<AppState>, Query(q): Query<AddressQuery>) -> Response {
    match state.supervisor.status(&q.address).await {
        Ok(link_state) => (
            StatusCode::OK,
            Json(ConnectionStatus {
                address: q.address,
                state: link_state.name(),
                is_connected: link_state.is_connected(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn connections(State(state): State<AppState>) -> Response {
    let connections = state
        .supervisor
        .list_connections()
        .await
        .into_iter()
        .map(|(address, link_state)| ConnectionStatus {
            address,
            state: link_state.name(),
            is_connected: link_state.is_connected(),
        })
        .collect();

    (StatusCode::OK, Json(ConnectionsList { connections })).into_response()
}

/// 单次拉取读取：返回原始窗口，不做聚合
async fn read_window(State(state): State<AppState>, Query(q): Query<ReadQuery>) -> Response {
    let channel = q.channel.unwrap_or(state.settings.ppg_channel);
    let reader = WindowReader::new(state.registry.clone());

    match reader.read_window(&q.address, channel).await {
        Ok(window) => (
            StatusCode::OK,
            Json(WindowBody {
                captured_at: window.captured_at,
                samples: window.samples.to_vec(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
