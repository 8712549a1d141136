// roomba_remote/src/protocol/motor_command.rs

//! 电机指令帧编码。
//!
//! 默认布局（`MagnitudeDirection`）为每个通道一个幅值字节，按左轮、右轮、吸尘、刷子的固定顺序，
//! 末尾跟一个方向位字节：第 `i` 位为 1 表示通道 `i` 反转。
//!
//! 旧版固件使用 `SignedBytes` 布局：四个有符号速度字节，无方向字节。

use roomba_models::{MotorChannel, MotorSet};
use serde::{Deserialize, Serialize};

/// 指令帧布局，取决于机器人固件版本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandLayout {
    #[default]
    MagnitudeDirection,
    SignedBytes,
}

impl CommandLayout {
    /// 该布局下一帧的字节数。
    pub fn frame_len(&self) -> usize {
        match self {
            CommandLayout::MagnitudeDirection => MotorChannel::ALL.len() + 1,
            CommandLayout::SignedBytes => MotorChannel::ALL.len(),
        }
    }
}

/// 将当前电机设定编码为一帧。纯函数，不会失败。
///
/// 速度在 `Motor` 内部已钳制到 [-100, 100]，幅值字节因此不会溢出。
pub fn encode(motors: &MotorSet, layout: CommandLayout) -> Vec<u8> {
    let channels = motors.channels();
    let mut frame = Vec::with_capacity(layout.frame_len());

    match layout {
        CommandLayout::MagnitudeDirection => {
            let mut directions = 0u8;
            for (index, motor) in channels.iter().enumerate() {
                frame.push(motor.magnitude());
                if motor.is_reverse() {
                    directions |= 1 << index;
                }
            }
            frame.push(directions);
        }
        CommandLayout::SignedBytes => {
            frame.extend(channels.iter().map(|motor| motor.speed() as u8));
        }
    }
    frame
}

/// 从一帧中还原电机设定；帧长与布局不符时返回 `None`。机器人端模拟与测试使用。
pub fn decode_motor_frame(frame: &[u8], layout: CommandLayout) -> Option<MotorSet> {
    if frame.len() != layout.frame_len() {
        return None;
    }
    let mut motors = MotorSet::stopped();
    for channel in MotorChannel::ALL {
        let index = channel.index();
        let speed = match layout {
            CommandLayout::MagnitudeDirection => {
                let magnitude = frame[index] as i16;
                if frame[MotorChannel::ALL.len()] & (1 << index) != 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
            CommandLayout::SignedBytes => frame[index] as i8 as i16,
        };
        motors.set(channel, speed);
    }
    Some(motors)
}

/// 停止帧：所有通道速度为 0。
pub fn stop_frame(layout: CommandLayout) -> Vec<u8> {
    encode(&MotorSet::stopped(), layout)
}
