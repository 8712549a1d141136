//! `roomba_remote` 机器人 WebSocket 遥控客户端核心逻辑。
//!
//! - `ws_client`: 连接管理器（状态机、自动重连、ping/pong 保活）。
//! - `protocol`: 遥测帧解码与电机指令帧编码。
//! - `state`: 多订阅者的状态广播中心 `StateHub`。
//! - `session`: 会话编排器 `RoombaService`，把以上部分组合起来。
//! - `config` / `error` / `event`: 配置、错误类型与面向界面的日志条目。

pub mod config;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod state;
pub mod ws_client;

pub use config::AppConfig;
pub use error::AppError;
pub use session::RoombaService;
pub use state::{StateHub, Subscription};
pub use ws_client::ConnectionManager;
