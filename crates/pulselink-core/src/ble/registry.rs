//! Link Registry - 持久连接注册表
//!
//! address → Link 的唯一权威映射，两级锁：
//!
//! - 全局锁只保护成员关系 (insert/lookup/remove)，O(1) 操作，绝不跨 I/O 持有
//! - 每地址锁保护 Link 的底层句柄，任何触碰句柄的操作
//!   (connect/read/disconnect) 全程持有，同一地址的操作串行，
//!   不同地址互不阻塞
//!
//! 注册表是所有 Link 的唯一所有者；其它组件只能在单次加锁操作内
//! 借用 Link，不得长期保留。

use crate::ble::transport::DeviceHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// 链路状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    /// API 响应中使用的状态名
    pub fn name(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Failed(_) => "failed",
        }
    }
}

/// 每地址锁保护的数据面：状态 + 底层句柄
pub struct LinkInner {
    pub state: LinkState,
    pub handle: Option<Box<dyn DeviceHandle>>,
}

/// 到单个设备的持久链路
pub struct Link {
    pub address: String,
    inner: Mutex<LinkInner>,
}

impl Link {
    fn new(address: String) -> Arc<Self> {
        Arc::new(Self {
            address,
            inner: Mutex::new(LinkInner {
                state: LinkState::Connecting,
                handle: None,
            }),
        })
    }

    /// 获取每地址锁；持锁期间独占底层句柄
    pub async fn lock(&self) -> MutexGuard<'_, LinkInner> {
        self.inner.lock().await
    }

    pub async fn state(&self) -> LinkState {
        self.inner.lock().await.state.clone()
    }
}

/// address → Link 映射，仲裁并发访问
pub struct LinkRegistry {
    links: Mutex<HashMap<String, Arc<Link>>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self {
            links: Mutex::new(HashMap::new()),
        }
    }

    /// 返回已有 Link 或新建一个 `Connecting` 状态的条目。
    /// 全局锁在返回前释放，慢速连接 I/O 在锁外进行，
    /// 两个调用者不会为同一地址创建重复条目。
    pub async fn upsert(&self, address: &str) -> Arc<Link> {
        let mut links = self.links.lock().await;
        links
            .entry(address.to_string())
            .or_insert_with(|| Link::new(address.to_string()))
            .clone()
    }

    pub async fn get(&self, address: &str) -> Option<Arc<Link>> {
        self.links.lock().await.get(address).cloned()
    }

    /// 成员快照；调用者遍历时不持有全局锁
    pub async fn list(&self) -> Vec<Arc<Link>> {
        self.links.lock().await.values().cloned().collect()
    }

    /// 移除条目；底层句柄应由调用者事先关闭
    pub async fn remove(&self, address: &str) -> Option<Arc<Link>> {
        self.links.lock().await.remove(address)
    }

    pub async fn len(&self) -> usize {
        self.links.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.links.lock().await.is_empty()
    }
}

impl Default for LinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// upsert 对同一地址返回同一个 Link，不创建重复条目
    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let registry = LinkRegistry::new();

        let a = registry.upsert("AA:BB:CC:DD:EE:FF").await;
        let b = registry.upsert("AA:BB:CC:DD:EE:FF").await;

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().await, 1);
        assert_eq!(a.state().await, LinkState::Connecting);
    }

    /// remove 之后 get 返回 None
    #[tokio::test]
    async fn test_remove_clears_entry() {
        let registry = LinkRegistry::new();
        registry.upsert("AA:BB:CC:DD:EE:FF").await;

        assert!(registry.remove("AA:BB:CC:DD:EE:FF").await.is_some());
        assert!(registry.get("AA:BB:CC:DD:EE:FF").await.is_none());
        assert!(registry.is_empty().await);
    }

    /// list 是快照，持有快照期间注册表可以继续变化
    #[tokio::test]
    async fn test_list_is_snapshot() {
        let registry = LinkRegistry::new();
        registry.upsert("00:01").await;
        registry.upsert("00:02").await;

        let snapshot = registry.list().await;
        registry.remove("00:01").await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 1);
    }
}
