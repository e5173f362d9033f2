//! Window Aggregator - 增量窗口聚合
//!
//! 设备侧是一个滑动采集缓冲：新采样把旧采样挤出去，相邻两次
//! 读取的窗口共享一段连续的重叠区。聚合器找出最大的 `k`
//! （前一窗口的后 `k` 个采样 == 当前窗口的前 `k` 个采样），
//! 只把当前窗口的后 `64 - k` 个采样作为新样本发出，
//! 既不丢样也不重样。
//!
//! 聚合器对时间一无所知——节拍由外部定时器驱动，`ingest` 是
//! (状态, 新窗口) → (新状态, 发射) 的纯状态转移，无需传输层
//! 或定时器即可单测。
//!
//! 每个 (address, channel) 会话各持有一个实例，会话之间绝不共享。

use crate::stream::{RawWindow, WINDOW_SAMPLES};
use serde::{Deserialize, Serialize};

/// 一次节拍的发射结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emission {
    /// 本次节拍新增的采样，保持设备侧顺序
    pub new_samples: Vec<u16>,
    /// 会话累计发出的采样总数，单调不减
    pub aggregated_len: usize,
    /// 窗口的捕获时间，unix 毫秒
    pub captured_at: u64,
    pub address: String,
    pub channel: String,
    /// 与上一窗口无重叠（k = 0）或 reset 后重新播种时为 true，
    /// 下游可视化据此标记断点
    pub discontinuity: bool,
}

/// 单个 (address, channel) 键的聚合状态
pub struct WindowAggregator {
    address: String,
    channel: String,
    previous: Option<[u16; WINDOW_SAMPLES]>,
    accumulated: Vec<u16>,
    total_emitted: usize,
}

impl WindowAggregator {
    pub fn new(address: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            channel: channel.into(),
            previous: None,
            accumulated: Vec::new(),
            total_emitted: 0,
        }
    }

    /// 消费一个窗口，发出其中尚未发出的采样。
    ///
    /// - 首个节拍（或 reset 之后）：整个窗口都是新的
    /// - 找到重叠 `k`：新采样是 `current[k..]`；`k == 64`
    ///   （窗口未变化）发出空集合，这是合法的稳态而非错误
    /// - `k == 0`：按约定仍作为连续流的一部分全量发出，
    ///   但置 `discontinuity` 标记
    pub fn ingest(&mut self, window: &RawWindow) -> Emission {
        let (new_samples, discontinuity) = match &self.previous {
            None => {
                // total_emitted > 0 说明是 reset 后的重新播种，而非会话首帧
                (window.samples.to_vec(), self.total_emitted > 0)
            }
            Some(previous) => {
                let k = overlap_len(previous, &window.samples);
                (window.samples[k..].to_vec(), k == 0)
            }
        };

        self.accumulated.extend_from_slice(&new_samples);
        self.total_emitted += new_samples.len();
        self.previous = Some(window.samples);

        Emission {
            new_samples,
            aggregated_len: self.total_emitted,
            captured_at: window.captured_at,
            address: self.address.clone(),
            channel: self.channel.clone(),
            discontinuity,
        }
    }

    /// 放弃连续性：清掉上一窗口，下个节拍整窗重新播种。
    /// `accumulated` 与 `total_emitted` 不受影响，长度不变式保持。
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn total_emitted(&self) -> usize {
        self.total_emitted
    }

    /// 会话累计的完整样本流
    pub fn accumulated(&self) -> &[u16] {
        &self.accumulated
    }
}

/// 最大的 `k` (0 ≤ k ≤ 64)：previous 的后 k 个采样 == current 的前 k 个
pub fn overlap_len(previous: &[u16; WINDOW_SAMPLES], current: &[u16; WINDOW_SAMPLES]) -> usize {
    for k in (1..=WINDOW_SAMPLES).rev() {
        if previous[WINDOW_SAMPLES - k..] == current[..k] {
            return k;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(range: std::ops::Range<u16>) -> RawWindow {
        let samples: Vec<u16> = range.collect();
        assert_eq!(samples.len(), WINDOW_SAMPLES);
        RawWindow {
            captured_at: 1_700_000_000_000,
            samples: samples.try_into().unwrap(),
        }
    }

    /// 首个节拍：64 个采样全部发出，aggregated_len 变为 64
    #[test]
    fn test_first_tick_emits_full_window() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        let emission = agg.ingest(&window(0..64));

        assert_eq!(emission.new_samples.len(), 64);
        assert_eq!(emission.aggregated_len, 64);
        assert!(!emission.discontinuity);
        assert_eq!(agg.accumulated().len(), agg.total_emitted());
    }

    /// 重叠定律：前移 32 个采样，只发出后 32 个新采样
    #[test]
    fn test_overlap_law_32_shift() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        agg.ingest(&window(0..64));

        let emission = agg.ingest(&window(32..96));

        let expected: Vec<u16> = (64..96).collect();
        assert_eq!(emission.new_samples, expected);
        assert_eq!(emission.aggregated_len, 96);
        assert!(!emission.discontinuity);
    }

    /// 稳态：窗口与上次完全相同，发出空集合，aggregated_len 不变
    #[test]
    fn test_identical_window_emits_nothing() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        agg.ingest(&window(0..64));

        let emission = agg.ingest(&window(0..64));

        assert!(emission.new_samples.is_empty());
        assert_eq!(emission.aggregated_len, 64);
        assert!(!emission.discontinuity);
    }

    /// 端到端场景：W1=[0..63], W2=[16..79], W3=W2 → 64/16/0 新采样
    #[test]
    fn test_three_tick_scenario() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");

        let e1 = agg.ingest(&window(0..64));
        assert_eq!(e1.new_samples.len(), 64);
        assert_eq!(e1.aggregated_len, 64);

        let e2 = agg.ingest(&window(16..80));
        let expected: Vec<u16> = (64..80).collect();
        assert_eq!(e2.new_samples, expected);
        assert_eq!(e2.aggregated_len, 80);

        let e3 = agg.ingest(&window(16..80));
        assert!(e3.new_samples.is_empty());
        assert_eq!(e3.aggregated_len, 80);
    }

    /// k = 0（完全无重叠）：整窗作为新采样发出并标记断点
    #[test]
    fn test_no_overlap_flags_discontinuity() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        agg.ingest(&window(0..64));

        let emission = agg.ingest(&window(1000..1064));

        assert_eq!(emission.new_samples.len(), 64);
        assert_eq!(emission.aggregated_len, 128);
        assert!(emission.discontinuity);
    }

    /// reset 只清 previous：下个节拍整窗重新播种并标记断点，
    /// total_emitted 跨 reset 继续累计
    #[test]
    fn test_reset_reseeds_and_keeps_totals() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        agg.ingest(&window(0..64));
        assert_eq!(agg.total_emitted(), 64);

        agg.reset();
        assert_eq!(agg.total_emitted(), 64);
        assert_eq!(agg.accumulated().len(), 64);

        let emission = agg.ingest(&window(100..164));
        assert_eq!(emission.new_samples.len(), 64);
        assert_eq!(emission.aggregated_len, 128);
        assert!(emission.discontinuity);
        assert_eq!(agg.accumulated().len(), agg.total_emitted());
    }

    /// 周期性数据取最大的 k：63 个零重叠胜过更短的重叠
    #[test]
    fn test_overlap_prefers_largest_k() {
        let previous = [0u16; WINDOW_SAMPLES];
        let mut current = [0u16; WINDOW_SAMPLES];
        current[WINDOW_SAMPLES - 1] = 1;

        assert_eq!(overlap_len(&previous, &current), 63);

        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        agg.ingest(&RawWindow {
            captured_at: 0,
            samples: previous,
        });
        let emission = agg.ingest(&RawWindow {
            captured_at: 1,
            samples: current,
        });
        assert_eq!(emission.new_samples, vec![1]);
        assert_eq!(emission.aggregated_len, 65);
    }

    /// overlap_len 边界：完全相同 → 64，毫无共享 → 0
    #[test]
    fn test_overlap_len_bounds() {
        let a: [u16; WINDOW_SAMPLES] = core::array::from_fn(|i| i as u16);
        let b: [u16; WINDOW_SAMPLES] = core::array::from_fn(|i| (i + 500) as u16);

        assert_eq!(overlap_len(&a, &a), WINDOW_SAMPLES);
        assert_eq!(overlap_len(&a, &b), 0);
    }

    /// 发射结果以 camelCase 序列化（线上契约）
    #[test]
    fn test_emission_serializes_camel_case() {
        let mut agg = WindowAggregator::new("AA:BB", "ppg");
        let emission = agg.ingest(&window(0..64));

        let json = serde_json::to_string(&emission).unwrap();
        assert!(json.contains("\"newSamples\":"));
        assert!(json.contains("\"aggregatedLen\":64"));
        assert!(json.contains("\"capturedAt\":"));
        assert!(json.contains("\"discontinuity\":false"));
        assert!(!json.contains("\"new_samples\""));
    }
}
