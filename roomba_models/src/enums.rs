//! 通用枚举模块。
//!
//! 本模块定义了客户端多个组件之间共享的枚举类型，
//! 保证连接状态、电机通道等概念在整个系统中有一致的表示。

use serde::{Deserialize, Serialize};
use std::fmt;

/// WebSocket 链路的连接状态。
///
/// 由连接管理器独占写入，任何时刻恰好处于一个状态；
/// 其他组件只能通过状态广播订阅观察其变化。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// 未连接（初始状态，或断开后等待重连期间）。
    #[default]
    Disconnected,
    /// 正在建立连接：打开套接字之前进入，仅在打开成功或失败时离开。
    Connecting,
    /// 已连接，保活循环正在运行。
    Connected,
}

impl ConnectionState {
    /// 是否处于已连接状态。
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Disconnected => "未连接",
            ConnectionState::Connecting => "连接中",
            ConnectionState::Connected => "已连接",
        };
        f.write_str(text)
    }
}

/// 电机通道，顺序即指令帧中的字节顺序。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorChannel {
    /// 左驱动轮。
    Left,
    /// 右驱动轮。
    Right,
    /// 吸尘风机。
    Suction,
    /// 滚刷。
    Brush,
}

impl MotorChannel {
    /// 按帧内顺序排列的全部通道。
    pub const ALL: [MotorChannel; 4] = [
        MotorChannel::Left,
        MotorChannel::Right,
        MotorChannel::Suction,
        MotorChannel::Brush,
    ];

    /// 通道在指令帧中的下标，同时也是方向字节中的位序号。
    pub fn index(&self) -> usize {
        match self {
            MotorChannel::Left => 0,
            MotorChannel::Right => 1,
            MotorChannel::Suction => 2,
            MotorChannel::Brush => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 默认连接状态应为未连接，且只有 Connected 被视为已连接。
    fn test_connection_state_default_and_predicate() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
    }

    #[test]
    /// 通道下标必须与 ALL 数组中的位置一致，编码器依赖此顺序。
    fn test_motor_channel_index_matches_order() {
        for (position, channel) in MotorChannel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), position, "通道 {:?} 的下标与帧内顺序不一致", channel);
        }
    }

    #[test]
    fn test_connection_state_serde_cycle() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"Connecting\"");
        let back: ConnectionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConnectionState::Connecting);
    }
}
