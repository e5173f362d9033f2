//! 应用配置和持久化
//!
//! 扫描/连接超时、节拍间隔、监听地址等设置的存储和读取。
//! 这些值只是默认值，API 调用方可以用查询参数覆盖。

use crate::ble::PPG_CHAR_UUID;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 目标设备名称（按名称连接时的默认值）
    pub device_name: String,
    /// HTTP 服务监听地址
    pub listen_addr: String,
    /// 默认扫描时长（秒）
    pub scan_timeout_secs: u64,
    /// 默认连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 流式会话的默认节拍间隔（毫秒）
    pub tick_interval_ms: u64,
    /// 默认读取的 PPG 特征
    pub ppg_channel: Uuid,
    /// 详细日志模式
    pub verbose: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            device_name: "InfiniTime".to_string(),
            listen_addr: "127.0.0.1:8470".to_string(),
            scan_timeout_secs: 5,
            connect_timeout_secs: 10,
            tick_interval_ms: 200,
            ppg_channel: PPG_CHAR_UUID,
            verbose: false,
        }
    }
}

impl AppSettings {
    /// 获取配置文件路径
    fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulselink");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.device_name, "InfiniTime");
        assert_eq!(settings.ppg_channel, PPG_CHAR_UUID);
        assert_eq!(settings.tick_interval(), Duration::from_millis(200));
    }

    /// 设置可以完整地 TOML 往返
    #[test]
    fn test_settings_toml_roundtrip() {
        let settings = AppSettings {
            device_name: "InfiniTime".to_string(),
            tick_interval_ms: 500,
            ..Default::default()
        };

        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: AppSettings = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.device_name, settings.device_name);
        assert_eq!(parsed.tick_interval_ms, 500);
        assert_eq!(parsed.ppg_channel, settings.ppg_channel);
    }
}
