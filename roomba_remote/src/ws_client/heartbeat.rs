// roomba_remote/src/ws_client/heartbeat.rs

//! 应用层保活（ping/pong）。
//!
//! 每隔 `ping_interval` 检查一次：如果自上次 ping 之后收到过任何消息，本周期跳过 ping；
//! 否则发送一个 Ping 帧，并在 `pong_timeout` 内等待 pong（协议 Pong 帧或文本 `"pong"`）。
//! 超时即认为连接已失效，结束当前会话并交给监督任务重连。

use log::{debug, warn};
use std::sync::atomic::Ordering;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;

use super::service::{ManagerInner, SessionEnd};

/// 运行保活循环，直到 ping 发送失败或 pong 超时。
pub(super) async fn keep_alive(inner: &ManagerInner) -> SessionEnd {
    let ping_interval = inner.config.ping_interval();
    let pong_timeout = inner.config.pong_timeout();
    debug!("[心跳] 保活循环启动，ping 间隔 {:?}，pong 超时 {:?}", ping_interval, pong_timeout);

    loop {
        tokio::time::sleep(ping_interval).await;

        if inner.received_since_ping.swap(false, Ordering::SeqCst) {
            debug!("[心跳] 上个周期内收到过消息，跳过本次 ping");
            continue;
        }

        // 先登记等待者再发送 ping，避免错过紧随其后的 pong
        let pong = inner.pong_received.notified();
        tokio::pin!(pong);
        pong.as_mut().enable();

        debug!("[心跳] 发送 ping");
        if let Err(e) = inner.send(TungsteniteMessage::Ping(Vec::new())).await {
            warn!("[心跳] 发送 ping 失败: {}", e);
            return SessionEnd::Lost(format!("发送 ping 失败: {}", e));
        }

        if tokio::time::timeout(pong_timeout, pong).await.is_err() {
            warn!("[心跳] {:?} 内未收到 pong，判定连接失效", pong_timeout);
            return SessionEnd::Lost("pong 超时".to_string());
        }
        debug!("[心跳] 收到 pong，连接正常");
    }
}
