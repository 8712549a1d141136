// roomba_remote/src/event.rs

//! 会话对外发布的日志条目。
//!
//! 每条重要事件（连接状态变化、指令发送失败、文本消息等）除了写入 `log` 之外，
//! 还会以 `LogEntry` 的形式发布到会话的日志状态中心，供界面滚动显示。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 日志状态中心的初始条目内容。
pub const INITIAL_LOG_MESSAGE: &str = "Start Logs";

/// 一条面向界面的日志。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), timestamp: Utc::now(), message: message.into() }
    }

    /// 日志状态中心的初始值。
    pub fn initial() -> Self {
        Self::new(INITIAL_LOG_MESSAGE)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S%.3f"), self.message)
    }
}
