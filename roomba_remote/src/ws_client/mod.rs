// roomba_remote/src/ws_client/mod.rs

//! 机器人 WebSocket 客户端模块。
//!
//! - `service`: 连接管理器 `ConnectionManager`，负责连接状态机、自动重连和消息收发。
//! - `heartbeat`: 会话内运行的 ping/pong 保活循环。

mod heartbeat;
pub mod service;

pub use service::ConnectionManager;
