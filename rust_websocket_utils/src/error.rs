// rust_websocket_utils/src/error.rs

//! 定义 WebSocket 工具库相关的错误类型。
//!
//! 错误按照发生的层次划分：
//! - `ConnectionError`: 建立连接或接收消息时的失败（超时、已关闭、底层传输错误）。
//! - `SendError`: 发送消息时的失败（未连接、底层传输错误）。

use thiserror::Error;

/// 连接层错误。
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// 在限定时间内未能完成连接或未收到消息。
    #[error("连接超时")]
    Timeout,

    /// 连接已关闭（对端关闭、主动断开或尚未建立）。
    #[error("连接已关闭")]
    Closed,

    /// 无效的 URL 格式。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    /// WebSocket 协议或底层 I/O 错误。
    #[error("WebSocket传输错误: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// 发送层错误。
#[derive(Error, Debug)]
pub enum SendError {
    /// 当前没有打开的套接字。
    #[error("未连接")]
    NotConnected,

    /// 套接字写入失败。
    #[error("发送失败: {0}")]
    Transport(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SendError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SendError::Transport(e.to_string())
    }
}
