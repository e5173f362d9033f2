//! Connection Supervisor - 持久连接的建立与监督
//!
//! 按名称连接时先扫描再按最佳信号逐个尝试，首个成功即返回；
//! 单个候选的失败只记录不上抛，全部耗尽才报 `ConnectFailed`。
//! 注册表与传输层都显式传入，没有全局单例。

use crate::ble::registry::{LinkRegistry, LinkState};
use crate::ble::scanner::DeviceScanner;
use crate::ble::transport::Transport;
use crate::error::BleError;
use std::sync::Arc;
use std::time::Duration;

pub struct ConnectionSupervisor {
    registry: Arc<LinkRegistry>,
    transport: Arc<dyn Transport>,
}

impl ConnectionSupervisor {
    pub fn new(registry: Arc<LinkRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// 按名称建立持久连接，返回最终连上的地址。
    ///
    /// 候选按信号强度降序逐个尝试；单个候选失败（过期广播、
    /// 设备忙）不需要调用者重新扫描，直接回退到下一个。
    pub async fn connect_persistent_by_name(
        &self,
        name: &str,
        scan_duration: Duration,
        connect_timeout: Duration,
    ) -> Result<String, BleError> {
        let scanner = DeviceScanner::new(self.transport.clone());
        let candidates = scanner.find_by_name(name, scan_duration).await?;

        if candidates.is_empty() {
            return Err(BleError::DeviceNotFound(name.to_string()));
        }

        let mut attempted = Vec::new();
        let mut reasons = Vec::new();

        for candidate in candidates {
            attempted.push(candidate.address.clone());

            match self
                .connect_persistent_by_address(&candidate.address, connect_timeout)
                .await
            {
                Ok(address) => {
                    log::info!(
                        "Connected to '{}' at {} (rssi={:?})",
                        name,
                        address,
                        candidate.rssi
                    );
                    return Ok(address);
                }
                Err(e) => {
                    log::warn!("Candidate {} failed: {}", candidate.address, e);
                    reasons.push(format!("{}: {}", candidate.address, e));
                }
            }
        }

        Err(BleError::ConnectFailed {
            name: name.to_string(),
            attempted,
            reasons,
        })
    }

    /// 按地址建立持久连接。已连接则直接返回（幂等，不发起新尝试）。
    /// 失败时状态置为 `Failed` 但保留注册表条目，调用者可以查询或重试。
    pub async fn connect_persistent_by_address(
        &self,
        address: &str,
        connect_timeout: Duration,
    ) -> Result<String, BleError> {
        let link = self.registry.upsert(address).await;
        let mut inner = link.lock().await;

        if inner.state.is_connected() {
            log::debug!("{} already connected, reusing", address);
            return Ok(address.to_string());
        }

        inner.state = LinkState::Connecting;
        match self.transport.connect(address, connect_timeout).await {
            Ok(handle) => {
                inner.handle = Some(handle);
                inner.state = LinkState::Connected;
                Ok(address.to_string())
            }
            Err(e) => {
                inner.state = LinkState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn status(&self, address: &str) -> Result<LinkState, BleError> {
        let link = self
            .registry
            .get(address)
            .await
            .ok_or_else(|| BleError::NotFound(address.to_string()))?;
        Ok(link.state().await)
    }

    /// 所有注册链路的 (address, state) 快照
    pub async fn list_connections(&self) -> Vec<(String, LinkState)> {
        let mut connections = Vec::new();
        for link in self.registry.list().await {
            let state = link.state().await;
            connections.push((link.address.clone(), state));
        }
        connections
    }

    /// 断开并移除链路，返回断开时是否处于已连接状态。
    /// 排在后面的读取会在取得锁后观察到 `Disconnected`，
    /// 不会在已关闭的句柄上操作。
    pub async fn disconnect(&self, address: &str) -> Result<bool, BleError> {
        let link = self
            .registry
            .get(address)
            .await
            .ok_or_else(|| BleError::NotFound(address.to_string()))?;

        let mut inner = link.lock().await;
        let was_connected = inner.state.is_connected();

        if let Some(handle) = inner.handle.take() {
            // 关闭失败也继续移除，避免条目永久卡死
            if let Err(e) = handle.close().await {
                log::warn!("Closing handle for {} failed: {}", address, e);
            }
        }
        inner.state = LinkState::Disconnected;
        drop(inner);

        self.registry.remove(address).await;
        Ok(was_connected)
    }

    /// 进程退出前断开所有链路，不留下孤儿传输资源
    pub async fn disconnect_all(&self) {
        for link in self.registry.list().await {
            if let Err(e) = self.disconnect(&link.address).await {
                log::warn!("Disconnect {} on shutdown failed: {}", link.address, e);
            }
        }
    }
}
