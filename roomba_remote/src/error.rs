// roomba_remote/src/error.rs

//! 客户端应用层的错误类型。
//!
//! 发送错误 (`SendError`) 定义在 `rust_websocket_utils`，指令构造错误 (`CommandError`) 定义在
//! `roomba_models`。`AppError` 把它们汇总起来，供会话操作和二进制入口使用。
//!
//! 连接失败与遥测解析失败不向调用方返回：前者体现为连接状态变化和自动重连，
//! 后者只记录日志并丢弃该帧。

use roomba_models::CommandError;
use rust_websocket_utils::SendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("发送失败: {0}")]
    Send(#[from] SendError),

    #[error("指令无效: {0}")]
    Command(#[from] CommandError),
}
