//! 传感器快照模型。
//!
//! `SensorSnapshot` 由遥测解码器逐字段增量更新：某一帧中未出现的字段保留上一帧的值。
//! 所有派生量（伏特、安培、"任一悬崖"等）都是存储字段的纯函数，从不单独存储。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 机器人传感器读数的聚合。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSnapshot {
    /// 碰撞与轮子悬空位域（位 0 右碰撞，位 1 左碰撞，位 2 右轮悬空，位 3 左轮悬空）。
    pub bumps: u8,
    pub cliff_left: bool,
    pub cliff_front_left: bool,
    pub cliff_front_right: bool,
    pub cliff_right: bool,
    /// 电池电压，单位毫伏。
    pub voltage: u16,
    /// 电池电流，单位毫安（负值为放电）。
    pub current: i16,
    /// 电池温度，单位摄氏度。
    pub temperature: i8,
    /// 左轮电机电流，单位毫安。
    pub left_motor_current: i16,
    /// 右轮电机电流，单位毫安。
    pub right_motor_current: i16,
    /// 光学碰撞位域，低 6 位有效。
    pub light_bumper: u8,
}

impl SensorSnapshot {
    pub fn right_bumper_pressed(&self) -> bool {
        self.bumps & 0x01 != 0
    }

    pub fn left_bumper_pressed(&self) -> bool {
        self.bumps & 0x02 != 0
    }

    pub fn right_wheel_drop(&self) -> bool {
        self.bumps & 0x04 != 0
    }

    pub fn left_wheel_drop(&self) -> bool {
        self.bumps & 0x08 != 0
    }

    /// 电池电压，单位伏特。
    pub fn battery_voltage(&self) -> f32 {
        self.voltage as f32 / 1000.0
    }

    /// 电池电流，单位安培。
    pub fn battery_amps(&self) -> f32 {
        self.current as f32 / 1000.0
    }

    pub fn left_motor_amps(&self) -> f32 {
        self.left_motor_current as f32 / 1000.0
    }

    pub fn right_motor_amps(&self) -> f32 {
        self.right_motor_current as f32 / 1000.0
    }

    pub fn light_bump_left(&self) -> bool {
        self.light_bumper & 0x01 != 0
    }

    pub fn light_bump_front_left(&self) -> bool {
        self.light_bumper & 0x02 != 0
    }

    pub fn light_bump_center_left(&self) -> bool {
        self.light_bumper & 0x04 != 0
    }

    pub fn light_bump_center_right(&self) -> bool {
        self.light_bumper & 0x08 != 0
    }

    pub fn light_bump_front_right(&self) -> bool {
        self.light_bumper & 0x10 != 0
    }

    pub fn light_bump_right(&self) -> bool {
        self.light_bumper & 0x20 != 0
    }

    /// 四个悬崖传感器中任一检测到悬崖。
    pub fn any_cliff_detected(&self) -> bool {
        self.cliff_left || self.cliff_front_left || self.cliff_front_right || self.cliff_right
    }

    pub fn any_bumper_pressed(&self) -> bool {
        self.left_bumper_pressed() || self.right_bumper_pressed()
    }

    pub fn any_light_bumper_activated(&self) -> bool {
        self.light_bumper & 0x3F != 0
    }
}

impl fmt::Display for SensorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "碰撞: 左={} 右={}", self.left_bumper_pressed(), self.right_bumper_pressed())?;
        writeln!(f, "轮子悬空: 左={} 右={}", self.left_wheel_drop(), self.right_wheel_drop())?;
        writeln!(
            f,
            "悬崖: 左={} 左前={} 右前={} 右={}",
            self.cliff_left, self.cliff_front_left, self.cliff_front_right, self.cliff_right
        )?;
        writeln!(
            f,
            "光学碰撞: 左={} 左前={} 左中={} 右中={} 右前={} 右={}",
            self.light_bump_left(),
            self.light_bump_front_left(),
            self.light_bump_center_left(),
            self.light_bump_center_right(),
            self.light_bump_front_right(),
            self.light_bump_right()
        )?;
        writeln!(f, "电池: {:.2}V {:.2}A", self.battery_voltage(), self.battery_amps())?;
        writeln!(f, "温度: {}°C", self.temperature)?;
        write!(f, "电机: 左={:.2}A 右={:.2}A", self.left_motor_amps(), self.right_motor_amps())
    }
}
