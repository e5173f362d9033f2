//! Window Reader - 单次有界的原始窗口读取
//!
//! 纯数据面操作：要求链路处于 `Connected`，读取期间全程持有
//! 每地址锁；期望恰好 128 字节并解码为 64 个小端 u16，
//! 其它长度一律 `IncompleteFrame`，不做部分解码。
//! 不重试、不缓存，重试策略属于调用者。

use crate::ble::registry::LinkRegistry;
use crate::error::BleError;
use crate::stream::{unix_millis, RawWindow, WINDOW_BYTES, WINDOW_SAMPLES};
use std::sync::Arc;
use uuid::Uuid;

pub struct WindowReader {
    registry: Arc<LinkRegistry>,
}

impl WindowReader {
    pub fn new(registry: Arc<LinkRegistry>) -> Self {
        Self { registry }
    }

    pub async fn read_window(&self, address: &str, channel: Uuid) -> Result<RawWindow, BleError> {
        let link = self
            .registry
            .get(address)
            .await
            .ok_or_else(|| BleError::NotConnected(address.to_string()))?;

        let inner = link.lock().await;
        if !inner.state.is_connected() {
            return Err(BleError::NotConnected(address.to_string()));
        }
        let handle = inner
            .handle
            .as_ref()
            .ok_or_else(|| BleError::NotConnected(address.to_string()))?;

        let raw = handle.read(channel).await?;
        decode_window(&raw)
    }
}

/// 把一帧原始字节解码为窗口，附上当前墙钟时间
pub fn decode_window(raw: &[u8]) -> Result<RawWindow, BleError> {
    if raw.len() != WINDOW_BYTES {
        return Err(BleError::IncompleteFrame {
            expected: WINDOW_BYTES,
            actual: raw.len(),
        });
    }

    let mut samples = [0u16; WINDOW_SAMPLES];
    for (i, chunk) in raw.chunks_exact(2).enumerate() {
        samples[i] = u16::from_le_bytes([chunk[0], chunk[1]]);
    }

    Ok(RawWindow {
        captured_at: unix_millis(),
        samples,
    })
}
