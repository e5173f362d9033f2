//! Pulselink CLI
//!
//! 命令行客户端，通过 HTTP/WebSocket 与 pulselink-server 通信

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pulselink", version, about = "InfiniTime PPG 数据桥 - 命令行客户端")]
struct Cli {
    /// 服务端地址
    #[arg(long, default_value = "http://127.0.0.1:8470")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 扫描附近设备
    Scan {
        /// 扫描超时时间 (秒)
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },
    /// 建立持久连接（按名称或显式地址）
    Connect {
        /// 设备名称 (不指定则用服务端配置的默认名称)
        name: Option<String>,
        /// 显式设备地址，跳过扫描
        #[arg(short, long)]
        address: Option<String>,
        /// 扫描超时时间 (秒)
        #[arg(long, default_value = "5")]
        scan_timeout: u64,
        /// 连接超时时间 (秒)
        #[arg(long, default_value = "10")]
        connect_timeout: u64,
    },
    /// 查看单个链路状态
    Status {
        /// 设备地址
        address: String,
    },
    /// 列出所有持久连接
    Connections,
    /// 断开并移除链路
    Disconnect {
        /// 设备地址
        address: String,
    },
    /// 单次读取原始 PPG 窗口
    Read {
        /// 设备地址
        address: String,
    },
    /// 订阅聚合后的连续样本流 (Ctrl-C 结束)
    Stream {
        /// 设备地址
        address: String,
        /// 节拍间隔 (毫秒)
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = client::Api::new(cli.server);

    match cli.command {
        Commands::Scan { timeout } => {
            println!("🔍 扫描设备 ({}s)...", timeout);
            let devices = api.scan(timeout).await?;
            if devices.is_empty() {
                println!("   未发现设备");
            } else {
                for (i, dev) in devices.iter().enumerate() {
                    let name = dev["name"].as_str().unwrap_or("<unknown>");
                    let address = dev["address"].as_str().unwrap_or("?");
                    match dev["rssi"].as_i64() {
                        Some(rssi) => println!("   [{}] {} ({}) rssi={}", i, name, address, rssi),
                        None => println!("   [{}] {} ({})", i, name, address),
                    }
                }
            }
        }
        Commands::Connect {
            name,
            address,
            scan_timeout,
            connect_timeout,
        } => {
            match &address {
                Some(addr) => println!("🔗 连接到 {}...", addr),
                None => println!(
                    "🔗 按名称连接 ({})...",
                    name.as_deref().unwrap_or("<默认>")
                ),
            }
            let resp = api
                .connect(name, address, scan_timeout, connect_timeout)
                .await?;
            println!("✅ 已连接: {}", resp["address"].as_str().unwrap_or("?"));
        }
        Commands::Status { address } => {
            let resp = api.status(&address).await?;
            println!(
                "{}: {}",
                address,
                resp["state"].as_str().unwrap_or("unknown")
            );
        }
        Commands::Connections => {
            let resp = api.connections().await?;
            let connections = resp["connections"].as_array().cloned().unwrap_or_default();
            if connections.is_empty() {
                println!("没有持久连接");
            } else {
                for conn in connections {
                    println!(
                        "   {} ({})",
                        conn["address"].as_str().unwrap_or("?"),
                        conn["state"].as_str().unwrap_or("unknown")
                    );
                }
            }
        }
        Commands::Disconnect { address } => {
            println!("⏹️  断开 {}...", address);
            let resp = api.disconnect(&address).await?;
            println!("✅ {}", resp["message"].as_str().unwrap_or("done"));
        }
        Commands::Read { address } => {
            let resp = api.read(&address).await?;
            let samples = resp["samples"].as_array().cloned().unwrap_or_default();
            println!(
                "📦 窗口 @{}: {} 个采样",
                resp["capturedAt"].as_u64().unwrap_or(0),
                samples.len()
            );
            let values: Vec<String> = samples
                .iter()
                .filter_map(|v| v.as_u64().map(|n| n.to_string()))
                .collect();
            println!("   {}", values.join(" "));
        }
        Commands::Stream {
            address,
            interval_ms,
        } => {
            println!("📈 订阅 {} 的样本流 (Ctrl-C 结束)...", address);
            api.stream(&address, interval_ms).await?;
        }
    }

    Ok(())
}
