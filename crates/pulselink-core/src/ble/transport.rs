//! BLE Transport - 底层传输抽象
//!
//! `Transport` 是监督器/读取器与真实电波之间的接口缝，
//! 生产实现 `BtleTransport` 包装 btleplug 适配器；
//! 测试用内存桩实现同一 trait，无需蓝牙硬件。

use crate::ble::DeviceDescriptor;
use crate::error::BleError;
use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral as PlatformPeripheral};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time;
use uuid::Uuid;

/// 一条已建立连接的句柄，仅由注册表中的 Link 独占持有
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    /// 读取指定特征的原始字节（单次有界读取，不重试）
    async fn read(&self, channel: Uuid) -> Result<Vec<u8>, BleError>;

    /// 关闭底层连接
    async fn close(&self) -> Result<(), BleError>;
}

/// 设备发现与连接建立
#[async_trait]
pub trait Transport: Send + Sync {
    /// 被动监听 `duration` 时长，返回去重后的设备列表（未排序）
    async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>, BleError>;

    /// 建立到 `address` 的连接，超时按 `timeout` 界定
    async fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceHandle>, BleError>;
}

pub struct BtleTransport {
    adapter: Adapter,
}

impl BtleTransport {
    pub async fn new() -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters.into_iter().next().ok_or(BleError::NoAdapter)?;

        Ok(Self { adapter })
    }

    async fn find_device(&self, address: &str) -> Result<PlatformPeripheral, BleError> {
        let peripherals = self.adapter.peripherals().await?;

        for peripheral in peripherals {
            if let Some(props) = peripheral.properties().await? {
                if props.address.to_string().to_uppercase() == address.to_uppercase() {
                    return Ok(peripheral);
                }
            }
        }

        Err(BleError::NotFound(address.to_string()))
    }
}

#[async_trait]
impl Transport for BtleTransport {
    async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>, BleError> {
        // 扫描无法启动才是错误，空结果是合法的
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| BleError::ScanTimeout(e.to_string()))?;

        time::sleep(duration).await;

        self.adapter.stop_scan().await?;

        let peripherals = self.adapter.peripherals().await?;
        let mut seen = HashSet::new();
        let mut devices = Vec::new();

        for peripheral in peripherals {
            if let Ok(Some(props)) = peripheral.properties().await {
                let address = props.address.to_string();
                if !seen.insert(address.clone()) {
                    continue;
                }
                devices.push(DeviceDescriptor {
                    name: props.local_name.unwrap_or_default(),
                    address,
                    rssi: props.rssi,
                });
            }
        }

        log::info!("Scan complete: found {} device(s)", devices.len());
        Ok(devices)
    }

    async fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceHandle>, BleError> {
        let peripheral = self.find_device(address).await?;

        log::info!("Connecting to {}", address);
        time::timeout(timeout, peripheral.connect())
            .await
            .map_err(|_| BleError::ConnectTimeout {
                address: address.to_string(),
                timeout,
            })??;

        // 等待连接稳定
        time::sleep(Duration::from_millis(500)).await;

        log::debug!("Discovering services on {}", address);
        peripheral.discover_services().await?;

        Ok(Box::new(BtleHandle { peripheral }))
    }
}

struct BtleHandle {
    peripheral: PlatformPeripheral,
}

#[async_trait]
impl DeviceHandle for BtleHandle {
    async fn read(&self, channel: Uuid) -> Result<Vec<u8>, BleError> {
        let characteristic = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == channel)
            .ok_or(BleError::ChannelNotFound(channel))?;

        Ok(self.peripheral.read(&characteristic).await?)
    }

    async fn close(&self) -> Result<(), BleError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
