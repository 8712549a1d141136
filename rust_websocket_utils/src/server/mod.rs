// rust_websocket_utils/src/server/mod.rs

//! WebSocket 服务端模块。
//!
//! 客户端本身并不需要服务端，但机器人端的行为（回显、静默、主动关闭、推送遥测帧）
//! 需要在测试中被模拟，因此本模块提供一个最小的服务端传输层。

pub mod transport;
