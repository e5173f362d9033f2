pub mod reader;
pub mod registry;
pub mod scanner;
pub mod supervisor;
pub mod transport;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use reader::WindowReader;
pub use registry::{Link, LinkRegistry, LinkState};
pub use scanner::DeviceScanner;
pub use supervisor::ConnectionSupervisor;
pub use transport::{BtleTransport, DeviceHandle, Transport};

/// InfiniTime 自定义 PPG 服务 (基于 InfiniTime 的 128-bit 自定义 UUID 基)
pub const PPG_SERVICE_UUID: Uuid = Uuid::from_u128(0x000a0000_78fc_48fe_8e23_433b3a1942d0);
/// 原始 PPG 采样窗口特征，读取返回固定 128 字节
pub const PPG_CHAR_UUID: Uuid = Uuid::from_u128(0x000a0001_78fc_48fe_8e23_433b3a1942d0);

/// 扫描结果中的设备描述，每次扫描重新生成，不持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
}
