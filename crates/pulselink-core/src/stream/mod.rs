//! 样本流模块
//!
//! 把设备侧滑动采集缓冲的固定窗口快照合并为连续的逻辑样本流。

pub mod aggregator;

pub use aggregator::{overlap_len, Emission, WindowAggregator};

/// 每个窗口的采样数
pub const WINDOW_SAMPLES: usize = 64;
/// 每个窗口的线上字节数 (64 × u16 LE)
pub const WINDOW_BYTES: usize = WINDOW_SAMPLES * 2;

/// 一次窗口读取的结果，产生后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWindow {
    /// unix 毫秒
    pub captured_at: u64,
    pub samples: [u16; WINDOW_SAMPLES],
}

/// 当前墙钟时间，unix 毫秒
pub fn unix_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
