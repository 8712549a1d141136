// rust_websocket_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 主要职责包括：
//! - **连接建立**: 在有限的超时时间内连接到机器人端的 WebSocket 服务。
//! - **帧接收**: 从读取流中取出下一条有意义的帧并归类（业务数据、保活应答、关闭）。
//! - **传输层抽象**: 封装 `tokio-tungstenite` 的细节，向连接管理器提供简洁的 API。

pub mod transport; // 客户端传输层逻辑
