//! 流式会话 - WebSocket 推送聚合样本流
//!
//! 每个会话独占一个 WindowAggregator（按 address + channel 键），
//! 节拍由本会话的定时器驱动；会话结束只丢弃自己的聚合状态，
//! 注册表中的链路不受影响（其它会话可能还在用）。

use crate::routes::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use pulselink_core::{BleError, WindowAggregator, WindowReader};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct StreamQuery {
    pub address: String,
    pub channel: Option<Uuid>,
    pub interval_ms: Option<u64>,
}

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<StreamQuery>,
) -> Response {
    ws.on_upgrade(move |socket| stream_session(socket, state, q))
}

async fn stream_session(socket: WebSocket, state: AppState, q: StreamQuery) {
    let channel = q.channel.unwrap_or(state.settings.ppg_channel);
    let interval_ms = q
        .interval_ms
        .unwrap_or(state.settings.tick_interval_ms)
        .max(1);

    let reader = WindowReader::new(state.registry.clone());
    let mut aggregator = WindowAggregator::new(&q.address, channel.to_string());

    let (mut sender, mut receiver) = socket.split();
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        "Stream session started: {} / {} ({}ms)",
        q.address,
        channel,
        interval_ms
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match reader.read_window(&q.address, channel).await {
                    Ok(window) => {
                        let emission = aggregator.ingest(&window);
                        let Ok(json) = serde_json::to_string(&emission) else {
                            break;
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            break; // 消费端断开
                        }
                    }
                    Err(e) => {
                        // 失败的节拍不更新聚合状态；帧错误后放弃连续性，
                        // 下个成功节拍整窗重新播种并带 discontinuity 标记
                        if matches!(e, BleError::IncompleteFrame { .. }) {
                            aggregator.reset();
                        }
                        tracing::warn!("Tick failed for {}: {}", q.address, e);
                        let frame = serde_json::json!({
                            "error": e.kind(),
                            "message": e.to_string(),
                        });
                        if sender.send(Message::Text(frame.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            msg = receiver.next() => {
                match msg {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(
        "Stream session ended: {} ({} sample(s) emitted)",
        q.address,
        aggregator.total_emitted()
    );
}
