//! Pulselink Core Library
//!
//! InfiniTime (PineTime) PPG 数据桥接的核心实现库
//!
//! # 模块
//!
//! - **ble**: BLE 扫描、持久连接注册表、连接监督、窗口读取
//! - **stream**: 窗口聚合，把重叠的原始采样窗口合并为连续样本流
//! - **config**: 应用配置 (TOML)
//! - **error**: 统一错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use pulselink_core::{BtleTransport, ConnectionSupervisor, LinkRegistry, WindowReader};
//! use pulselink_core::stream::WindowAggregator;
//!
//! // 1. 建立注册表和传输层
//! let registry = Arc::new(LinkRegistry::new());
//! let transport: Arc<dyn Transport> = Arc::new(BtleTransport::new().await?);
//!
//! // 2. 按名称建立持久连接（最佳信号优先，失败自动回退）
//! let supervisor = ConnectionSupervisor::new(registry.clone(), transport.clone());
//! let address = supervisor
//!     .connect_persistent_by_name("InfiniTime", scan_timeout, connect_timeout)
//!     .await?;
//!
//! // 3. 周期读取窗口并聚合为连续流
//! let reader = WindowReader::new(registry.clone());
//! let mut aggregator = WindowAggregator::new(&address, PPG_CHAR_UUID.to_string());
//! let window = reader.read_window(&address, PPG_CHAR_UUID).await?;
//! let emission = aggregator.ingest(&window);
//! ```

pub mod ble;
pub mod config;
pub mod error;
pub mod stream;

// BLE re-exports
pub use ble::{
    BtleTransport, ConnectionSupervisor, DeviceDescriptor, DeviceHandle, DeviceScanner, Link,
    LinkRegistry, LinkState, Transport, WindowReader, PPG_CHAR_UUID, PPG_SERVICE_UUID,
};

// Stream re-exports
pub use stream::{Emission, RawWindow, WindowAggregator, WINDOW_BYTES, WINDOW_SAMPLES};

// Config/error re-exports
pub use config::AppSettings;
pub use error::BleError;
