// rust_websocket_utils/src/message.rs

//! 定义 WebSocket 链路上的入站消息结构以及底层帧的分类。
//!
//! 链路上文本协议与二进制协议共存：
//! - 二进制帧：遥测帧与图像帧（由上层按大小区分）；
//! - 文本帧：保活应答 `"pong"` 以及其他文本消息。
//!
//! `classify_message` 把 `tungstenite` 的底层消息归类为 `ReceivedFrame`，
//! 让连接管理器只关心"业务数据 / 保活应答 / 关闭"三类事件。

use roomba_models::ws_payloads::PONG_TEXT;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// 交给上层的入站业务消息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// 二进制负载（遥测帧或图像帧）。
    Binary(Vec<u8>),
    /// 文本负载。
    Text(String),
}

impl InboundMessage {
    /// 负载字节数。
    pub fn len(&self) -> usize {
        match self {
            InboundMessage::Binary(bytes) => bytes.len(),
            InboundMessage::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 对一条底层 WebSocket 消息的分类结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedFrame {
    /// 业务数据，需要交给上层处理。
    Data(InboundMessage),
    /// 保活应答（协议层 Pong 帧或文本 `"pong"`）。
    Pong,
    /// 对端发来的 Ping，由 tungstenite 自动应答。
    Ping,
    /// 对端发来的关闭帧。`normal` 为 true 表示正常关闭（1000），不应触发重连。
    Closed { normal: bool, reason: Option<String> },
}

/// 将一条 tungstenite 消息归类。底层原始 `Frame` 不会出现在读取流中，返回 `None`。
pub fn classify_message(message: Message) -> Option<ReceivedFrame> {
    match message {
        Message::Binary(bytes) => Some(ReceivedFrame::Data(InboundMessage::Binary(bytes))),
        Message::Text(text) => {
            if text == PONG_TEXT {
                Some(ReceivedFrame::Pong)
            } else {
                Some(ReceivedFrame::Data(InboundMessage::Text(text)))
            }
        }
        Message::Pong(_) => Some(ReceivedFrame::Pong),
        Message::Ping(_) => Some(ReceivedFrame::Ping),
        Message::Close(close_frame) => {
            let (normal, reason) = match close_frame {
                Some(frame) => (frame.code == CloseCode::Normal, Some(frame.reason.to_string())),
                // 没有状态码的关闭帧按正常关闭处理
                None => (true, None),
            };
            Some(ReceivedFrame::Closed { normal, reason })
        }
        Message::Frame(_) => None,
    }
}
