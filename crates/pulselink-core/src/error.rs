//! 统一错误类型
//!
//! 每种失败映射到一个稳定的标识符 (`kind`) 加可读的详情，
//! 供 HTTP 层直接转成响应。

use std::time::Duration;
use uuid::Uuid;

/// BLE 链路与数据面错误
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    #[error("No Bluetooth adapters found")]
    NoAdapter,

    /// 底层传输无法启动扫描（扫描到 0 个设备不是错误）
    #[error("Failed to start BLE scan: {0}")]
    ScanTimeout(String),

    #[error("No device named '{0}' found")]
    DeviceNotFound(String),

    /// 所有候选设备都连接失败，携带每个候选的失败原因
    #[error("Could not connect to any device named '{name}' ({} candidate(s) tried)", .attempted.len())]
    ConnectFailed {
        name: String,
        attempted: Vec<String>,
        reasons: Vec<String>,
    },

    #[error("Connect to {address} timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    /// 对未建立/未连接的链路执行数据面操作
    #[error("Link {0} is not connected")]
    NotConnected(String),

    /// 帧长不符，不做部分解码
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    #[error("Unknown address: {0}")]
    NotFound(String),

    #[error("Characteristic not found: {0}")]
    ChannelNotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] btleplug::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl BleError {
    /// 稳定的错误标识符，用于 API 响应
    pub fn kind(&self) -> &'static str {
        match self {
            BleError::NoAdapter => "noAdapter",
            BleError::ScanTimeout(_) => "scanTimeout",
            BleError::DeviceNotFound(_) => "deviceNotFound",
            BleError::ConnectFailed { .. } => "connectFailed",
            BleError::ConnectTimeout { .. } => "connectTimeout",
            BleError::NotConnected(_) => "notConnected",
            BleError::IncompleteFrame { .. } => "incompleteFrame",
            BleError::NotFound(_) => "notFound",
            BleError::ChannelNotFound(_) => "channelNotFound",
            BleError::Io(_) => "io",
            BleError::Transport(_) => "transport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证错误标识符保持稳定（API 消费者依赖这些字符串）
    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(BleError::DeviceNotFound("x".into()).kind(), "deviceNotFound");
        assert_eq!(
            BleError::IncompleteFrame {
                expected: 128,
                actual: 127
            }
            .kind(),
            "incompleteFrame"
        );
        assert_eq!(BleError::NotConnected("AA".into()).kind(), "notConnected");
        assert_eq!(BleError::NotFound("AA".into()).kind(), "notFound");
    }

    /// ConnectFailed 的展示信息包含尝试过的候选数量
    #[test]
    fn test_connect_failed_display() {
        let err = BleError::ConnectFailed {
            name: "InfiniTime".into(),
            attempted: vec!["AA:BB:CC:DD:EE:FF".into(), "11:22:33:44:55:66".into()],
            reasons: vec!["timeout".into(), "refused".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("InfiniTime"));
        assert!(msg.contains("2 candidate(s)"));
    }
}
