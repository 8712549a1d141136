//! 执行器（电机）模型。
//!
//! `MotorSet` 由会话编排器持有，由外部输入设备（手柄、滑块）写入，
//! 由周期性指令发送循环读取；遥测层与连接层从不读取它。

use serde::{Deserialize, Serialize};

use crate::enums::MotorChannel;

/// 电机速度下限（全速反转）。
pub const MIN_MOTOR_SPEED: i8 = -100;
/// 电机速度上限（全速正转）。
pub const MAX_MOTOR_SPEED: i8 = 100;

/// 单路电机的设定值。
///
/// 速度为有符号百分比，正值为正转、负值为反转，
/// 写入时即被钳制到 `[MIN_MOTOR_SPEED, MAX_MOTOR_SPEED]`。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Motor {
    speed: i8,
}

impl Motor {
    /// 以给定速度创建电机设定值（自动钳制）。
    pub fn new(speed: i16) -> Self {
        let mut motor = Motor::default();
        motor.set_speed(speed);
        motor
    }

    /// 设置速度，超出范围的值被钳制而不是溢出。
    pub fn set_speed(&mut self, speed: i16) {
        self.speed = speed.clamp(MIN_MOTOR_SPEED as i16, MAX_MOTOR_SPEED as i16) as i8;
    }

    /// 由归一化轴值（-1.0 ~ 1.0，例如手柄摇杆）设置速度。
    pub fn set_normalized(&mut self, value: f32) {
        let value = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
        self.set_speed((value * MAX_MOTOR_SPEED as f32) as i16);
    }

    /// 带符号的当前速度。
    pub fn speed(&self) -> i8 {
        self.speed
    }

    /// 速度的绝对值（0 ~ 100）。
    pub fn magnitude(&self) -> u8 {
        self.speed.unsigned_abs()
    }

    /// 是否为反转。
    pub fn is_reverse(&self) -> bool {
        self.speed < 0
    }
}

/// 四路执行器通道：左轮、右轮、吸尘、滚刷。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorSet {
    pub left: Motor,
    pub right: Motor,
    pub suction: Motor,
    pub brush: Motor,
}

impl MotorSet {
    /// 所有通道静止的设定值。
    pub fn stopped() -> Self {
        MotorSet::default()
    }

    /// 读取指定通道。
    pub fn get(&self, channel: MotorChannel) -> Motor {
        match channel {
            MotorChannel::Left => self.left,
            MotorChannel::Right => self.right,
            MotorChannel::Suction => self.suction,
            MotorChannel::Brush => self.brush,
        }
    }

    /// 设置指定通道的速度（自动钳制）。
    pub fn set(&mut self, channel: MotorChannel, speed: i16) {
        let motor = match channel {
            MotorChannel::Left => &mut self.left,
            MotorChannel::Right => &mut self.right,
            MotorChannel::Suction => &mut self.suction,
            MotorChannel::Brush => &mut self.brush,
        };
        motor.set_speed(speed);
    }

    /// 按帧内顺序返回全部通道。
    pub fn channels(&self) -> [Motor; 4] {
        MotorChannel::ALL.map(|channel| self.get(channel))
    }
}
