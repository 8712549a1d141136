// roomba_remote/src/session/mod.rs

//! 会话层：把连接、协议编解码和状态中心组合成一个完整的遥控会话。

pub mod frame_rate;
pub mod service;

pub use frame_rate::FrameRateMeter;
pub use service::{RawFrame, RoombaService};
