//! BLE Scanner - 发现并排序候选设备
//!
//! 在有界时长内被动扫描，按信号强度降序排序（RSSI 越接近 0 越靠前，
//! 无 RSSI 的排最后），同分保持发现顺序。按名称查找要求完整匹配，
//! 忽略大小写和首尾空白——子串匹配不算命中。

use crate::ble::transport::Transport;
use crate::ble::DeviceDescriptor;
use crate::error::BleError;
use std::sync::Arc;
use std::time::Duration;

pub struct DeviceScanner {
    transport: Arc<dyn Transport>,
}

impl DeviceScanner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 扫描 `duration` 时长，返回按信号强度降序的设备列表（可为空）
    pub async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>, BleError> {
        let mut devices = self.transport.scan(duration).await?;
        rank_by_rssi(&mut devices);
        Ok(devices)
    }

    /// 扫描并保留名称与 `name` 完全匹配的设备，排序不变（最佳信号在前）
    pub async fn find_by_name(
        &self,
        name: &str,
        duration: Duration,
    ) -> Result<Vec<DeviceDescriptor>, BleError> {
        let devices = self.scan(duration).await?;
        let matches: Vec<DeviceDescriptor> = devices
            .into_iter()
            .filter(|d| matches_name(&d.name, name))
            .collect();

        log::debug!("find_by_name('{}'): {} match(es)", name, matches.len());
        Ok(matches)
    }
}

/// 稳定排序：RSSI 降序，None 排最后，同分保持原有顺序
pub fn rank_by_rssi(devices: &mut [DeviceDescriptor]) {
    devices.sort_by_key(|d| match d.rssi {
        Some(rssi) => (false, -i32::from(rssi)),
        None => (true, 0),
    });
}

/// 完整名称匹配，忽略大小写与首尾空白
pub fn matches_name(device_name: &str, target: &str) -> bool {
    device_name.trim().to_lowercase() == target.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(name: &str, address: &str, rssi: Option<i16>) -> DeviceDescriptor {
        DeviceDescriptor {
            name: name.to_string(),
            address: address.to_string(),
            rssi,
        }
    }

    /// 扫描结果按 RSSI 降序，无 RSSI 的排最后
    #[test]
    fn test_rank_by_rssi_descending_none_last() {
        let mut devices = vec![
            dev("a", "00:01", None),
            dev("b", "00:02", Some(-70)),
            dev("c", "00:03", Some(-40)),
            dev("d", "00:04", Some(-90)),
        ];
        rank_by_rssi(&mut devices);

        let order: Vec<&str> = devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(order, vec!["00:03", "00:02", "00:04", "00:01"]);
    }

    /// RSSI 相同的设备保持发现顺序
    #[test]
    fn test_rank_by_rssi_ties_keep_discovery_order() {
        let mut devices = vec![
            dev("a", "00:01", Some(-55)),
            dev("b", "00:02", Some(-55)),
            dev("c", "00:03", Some(-55)),
        ];
        rank_by_rssi(&mut devices);

        let order: Vec<&str> = devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(order, vec!["00:01", "00:02", "00:03"]);
    }

    /// 名称匹配忽略大小写和首尾空白
    #[test]
    fn test_matches_name_case_insensitive() {
        assert!(matches_name("InfiniTime", "infinitime"));
        assert!(matches_name("  InfiniTime ", "INFINITIME"));
        assert!(matches_name("infinitime", "InfiniTime"));
    }

    /// 子串不算命中，必须完整相等
    #[test]
    fn test_matches_name_rejects_substring() {
        assert!(!matches_name("InfiniTime Pro", "InfiniTime"));
        assert!(!matches_name("InfiniTime", "Infini"));
        assert!(!matches_name("", "InfiniTime"));
    }
}
