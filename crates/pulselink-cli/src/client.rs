//! API Client - 与 pulselink-server 通信

use anyhow::{bail, Result};
use futures_util::StreamExt;
use pulselink_core::Emission;
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub struct Api {
    server: String,
    http: reqwest::Client,
}

impl Api {
    pub fn new(server: String) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn request(&self, method: reqwest::Method, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.server, path);
        let resp = match self.http.request(method, &url).query(query).send().await {
            Ok(resp) => resp,
            Err(e) => {
                eprintln!("❌ 无法连接到服务端: {}", e);
                eprintln!("   请确保 pulselink-server 正在运行 (cargo xtask dev)");
                return Err(e.into());
            }
        };

        let status = resp.status();
        let body: Value = resp.json().await?;
        if !status.is_success() {
            let message = body["message"].as_str().unwrap_or("request failed");
            bail!("{} ({})", message, status);
        }
        Ok(body)
    }

    pub async fn scan(&self, timeout: u64) -> Result<Vec<Value>> {
        let body = self
            .request(
                reqwest::Method::GET,
                "/ble/scan",
                &[("timeout", timeout.to_string())],
            )
            .await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn connect(
        &self,
        name: Option<String>,
        address: Option<String>,
        scan_timeout: u64,
        connect_timeout: u64,
    ) -> Result<Value> {
        let mut query = vec![
            ("scan_timeout", scan_timeout.to_string()),
            ("connect_timeout", connect_timeout.to_string()),
        ];
        if let Some(name) = name {
            query.push(("name", name));
        }
        if let Some(address) = address {
            query.push(("address", address));
        }
        self.request(reqwest::Method::POST, "/ble/connect/persistent", &query)
            .await
    }

    pub async fn status(&self, address: &str) -> Result<Value> {
        self.request(
            reqwest::Method::GET,
            "/ble/status",
            &[("address", address.to_string())],
        )
        .await
    }

    pub async fn connections(&self) -> Result<Value> {
        self.request(reqwest::Method::GET, "/ble/connections", &[])
            .await
    }

    pub async fn disconnect(&self, address: &str) -> Result<Value> {
        self.request(
            reqwest::Method::POST,
            "/ble/disconnect",
            &[("address", address.to_string())],
        )
        .await
    }

    pub async fn read(&self, address: &str) -> Result<Value> {
        self.request(
            reqwest::Method::GET,
            "/ppg/read",
            &[("address", address.to_string())],
        )
        .await
    }

    /// 订阅流式会话，逐条打印发射结果直到 Ctrl-C 或服务端断开
    pub async fn stream(&self, address: &str, interval_ms: Option<u64>) -> Result<()> {
        let ws_base = self
            .server
            .replacen("http://", "ws://", 1)
            .replacen("https://", "wss://", 1);
        let mut url = format!("{}/ppg/stream?address={}", ws_base, address);
        if let Some(interval) = interval_ms {
            url.push_str(&format!("&interval_ms={}", interval));
        }

        let (ws, _) = connect_async(&url).await?;
        let (_write, mut read) = ws.split();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("⏹️  已停止");
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => print_frame(&text),
                        Some(Ok(Message::Close(_))) | None => {
                            println!("服务端关闭了会话");
                            return Ok(());
                        }
                        Some(Err(e)) => bail!("stream error: {}", e),
                        _ => {}
                    }
                }
            }
        }
    }
}

fn print_frame(text: &str) {
    // 发射结果帧或错误帧
    if let Ok(emission) = serde_json::from_str::<Emission>(text) {
        let marker = if emission.discontinuity { " ⚡断点" } else { "" };
        println!(
            "📈 +{} 采样 (累计 {}){}",
            emission.new_samples.len(),
            emission.aggregated_len,
            marker
        );
    } else if let Ok(value) = serde_json::from_str::<Value>(text) {
        eprintln!(
            "⚠️  {}: {}",
            value["error"].as_str().unwrap_or("error"),
            value["message"].as_str().unwrap_or("")
        );
    }
}
