//! `rust_websocket_utils` 是一个提供 WebSocket 通信实用功能的 Rust Crate。
//! 它封装了 `tokio-tungstenite` 的细节，为遥控客户端提供连接建立、
//! 帧分类以及统一的错误类型。
//!
//! 主要模块包括：
//! - `message`: 定义入站业务消息 `InboundMessage` 与帧分类结果 `ReceivedFrame`。
//! - `error`: 定义库中使用的错误类型 `ConnectionError` 和 `SendError`。
//! - `client`: 提供 WebSocket 客户端传输层。
//! - `server`: 提供一个最小的 WebSocket 服务端传输层，用于模拟机器人端。

pub mod client;
pub mod error;
pub mod message;
pub mod server;

pub use error::{ConnectionError, SendError};
pub use message::{InboundMessage, ReceivedFrame};
