// roomba_models/src/ws_payloads.rs

//! 包含 WebSocket 文本协议中使用的控制指令与常量。
//!
//! 文本协议与二进制协议共用同一条链路：
//! - 保活应答：部分固件以文本 `"pong"` 回复；
//! - 视频流开关：纯文本 `"start"` / `"stop"`；
//! - 控制指令：单一顶层键的 JSON 对象，例如 `{"mode":1}`、`{"playSong":true}`、`{"display":"HI"}`。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 文本保活应答。
pub const PONG_TEXT: &str = "pong";
/// 开始视频流的纯文本指令。
pub const START_STREAM_TEXT: &str = "start";
/// 停止视频流的纯文本指令。
pub const STOP_STREAM_TEXT: &str = "stop";

/// 机器人显示屏可容纳的最大字符数。
pub const MAX_DISPLAY_CHARS: usize = 4;

/// 安全模式的模式编号。
pub const MODE_SAFE: u8 = 0;
/// 完全控制模式的模式编号。
pub const MODE_FULL: u8 = 1;

/// 构造控制指令时可能出现的错误（与传输无关）。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// 显示文本超过显示屏容量。
    #[error("显示文本过长: {len} 个字符 (最多 {max} 个)")]
    DisplayTooLong { len: usize, max: usize },

    /// 指令序列化为 JSON 失败。
    #[error("指令序列化失败: {0}")]
    Serialization(String),
}

/// 以单键 JSON 对象发送的控制指令。
///
/// 外部标记的 serde 表示恰好生成 `{"<key>": <value>}` 形式，
/// 键名为变体名的小驼峰形式（例如 `PlayDaftPunk` -> `"playDaftPunk"`）。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ControlCommand {
    Start(bool),
    Stop(bool),
    StreamSensors(bool),
    Display(String),
    Mode(u8),
    PlaySong(bool),
    PlaySong2(bool),
    PlayDaftPunk(bool),
}

impl ControlCommand {
    /// 构造显示文本指令，超过 `MAX_DISPLAY_CHARS` 个字符时返回错误。
    pub fn display(text: &str) -> Result<Self, CommandError> {
        let len = text.chars().count();
        if len > MAX_DISPLAY_CHARS {
            return Err(CommandError::DisplayTooLong { len, max: MAX_DISPLAY_CHARS });
        }
        Ok(ControlCommand::Display(text.to_string()))
    }

    pub fn safe_mode() -> Self {
        ControlCommand::Mode(MODE_SAFE)
    }

    pub fn full_mode() -> Self {
        ControlCommand::Mode(MODE_FULL)
    }

    /// 将指令序列化为 JSON 文本帧。
    pub fn to_json(&self) -> Result<String, CommandError> {
        serde_json::to_string(self).map_err(|e| CommandError::Serialization(e.to_string()))
    }
}
