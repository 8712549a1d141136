// roomba_remote/src/protocol/telemetry.rs

//! 二进制遥测帧解码。
//!
//! 帧格式：
//!
//! ```text
//! ┌────────┬────────┬──────────────────────────────┬──────────┐
//! │ 0x13   │ N      │ 负载 (N 字节)                 │ 校验和   │
//! │ 头部19 │ 负载长 │ (packetId, value) 序列        │ 1 字节   │
//! └────────┴────────┴──────────────────────────────┴──────────┘
//! ```
//!
//! 校验规则：除校验和外所有字节按无符号 32 位求和，`(sum + checksum) mod 256 == 0`。
//!
//! 解码基于上一份快照进行：本帧未出现的字段保留原值。任何错误都不会产生部分更新，
//! 调用方拿到的要么是完整应用了本帧的新快照，要么是错误。

use log::warn;
use roomba_models::SensorSnapshot;
use thiserror::Error;

/// 遥测帧的固定头部值。
pub const TELEMETRY_HEADER: u8 = 19;

/// 头部 + 长度字节 + 校验和。
const MIN_FRAME_LEN: usize = 3;

/// 遥测帧解析错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("数据不足: 至少需要 3 字节")]
    InsufficientData,

    #[error("无效的帧头: {0} (应为 19)")]
    InvalidHeader(u8),

    #[error("数据过短: 需要 {expected} 字节，实际 {actual} 字节")]
    DataTooShort { expected: usize, actual: usize },

    #[error("校验和不匹配: 累加和 {sum}，校验字节 {checksum}")]
    ChecksumMismatch { sum: u32, checksum: u8 },

    #[error("数据包 {packet_id} 在偏移 {offset} 处被截断")]
    TruncatedPacket { packet_id: u8, offset: usize },
}

/// 本客户端解释的传感器数据包。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SensorPacket {
    Bumps,
    CliffLeft,
    CliffFrontLeft,
    CliffFrontRight,
    CliffRight,
    Voltage,
    Current,
    Temperature,
    LightBumper,
    LeftMotorCurrent,
    RightMotorCurrent,
}

impl SensorPacket {
    fn from_id(id: u8) -> Option<Self> {
        let packet = match id {
            7 => SensorPacket::Bumps,
            9 => SensorPacket::CliffLeft,
            10 => SensorPacket::CliffFrontLeft,
            11 => SensorPacket::CliffFrontRight,
            12 => SensorPacket::CliffRight,
            22 => SensorPacket::Voltage,
            23 => SensorPacket::Current,
            24 => SensorPacket::Temperature,
            45 => SensorPacket::LightBumper,
            54 => SensorPacket::LeftMotorCurrent,
            55 => SensorPacket::RightMotorCurrent,
            _ => return None,
        };
        Some(packet)
    }

    fn width(&self) -> usize {
        match self {
            SensorPacket::Voltage
            | SensorPacket::Current
            | SensorPacket::LeftMotorCurrent
            | SensorPacket::RightMotorCurrent => 2,
            _ => 1,
        }
    }
}

/// Open Interface 传感器表中本客户端不解释的数据包宽度。
///
/// 这些数据包按其真实宽度跳过；表外的 ID 无法确定宽度，解析在该处停止。
fn uninterpreted_packet_width(id: u8) -> Option<usize> {
    match id {
        8 | 13..=18 | 21 | 32 | 34..=38 | 52 | 53 | 58 => Some(1),
        19 | 20 | 25..=31 | 33 | 39..=44 | 46..=51 | 56 | 57 => Some(2),
        _ => None,
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// 校验帧结构与校验和，返回负载区间 `[2, len-1)`。
fn validate_frame(frame: &[u8]) -> Result<&[u8], ParseError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(ParseError::InsufficientData);
    }
    if frame[0] != TELEMETRY_HEADER {
        return Err(ParseError::InvalidHeader(frame[0]));
    }
    let expected = frame[1] as usize + MIN_FRAME_LEN;
    if frame.len() < expected {
        return Err(ParseError::DataTooShort { expected, actual: frame.len() });
    }

    let (body, checksum) = frame.split_at(frame.len() - 1);
    let checksum = checksum[0];
    let sum: u32 = body.iter().map(|&b| b as u32).sum();
    if (sum + checksum as u32) & 0xFF != 0 {
        return Err(ParseError::ChecksumMismatch { sum, checksum });
    }
    Ok(&body[2..])
}

/// 基于 `previous` 解码一帧遥测数据，返回更新后的快照。
pub fn decode(frame: &[u8], previous: &SensorSnapshot) -> Result<SensorSnapshot, ParseError> {
    let payload = validate_frame(frame)?;
    let mut snapshot = *previous;
    let mut index = 0;

    while index < payload.len() {
        let packet_id = payload[index];
        let value_offset = index + 1;

        let Some(packet) = SensorPacket::from_id(packet_id) else {
            match uninterpreted_packet_width(packet_id) {
                Some(width) => {
                    index = value_offset + width;
                    continue;
                }
                None => {
                    warn!(
                        "[遥测解码] 未知数据包 ID {} (偏移 {})，无法确定宽度，忽略帧内剩余 {} 字节",
                        packet_id,
                        index + 2,
                        payload.len() - index
                    );
                    break;
                }
            }
        };

        let value = payload
            .get(value_offset..value_offset + packet.width())
            .ok_or(ParseError::TruncatedPacket { packet_id, offset: index + 2 })?;

        match packet {
            SensorPacket::Bumps => snapshot.bumps = value[0],
            SensorPacket::CliffLeft => snapshot.cliff_left = value[0] != 0,
            SensorPacket::CliffFrontLeft => snapshot.cliff_front_left = value[0] != 0,
            SensorPacket::CliffFrontRight => snapshot.cliff_front_right = value[0] != 0,
            SensorPacket::CliffRight => snapshot.cliff_right = value[0] != 0,
            SensorPacket::Voltage => snapshot.voltage = be_u16(value),
            SensorPacket::Current => snapshot.current = be_u16(value) as i16,
            SensorPacket::Temperature => snapshot.temperature = value[0] as i8,
            SensorPacket::LightBumper => snapshot.light_bumper = value[0],
            SensorPacket::LeftMotorCurrent => snapshot.left_motor_current = be_u16(value) as i16,
            SensorPacket::RightMotorCurrent => snapshot.right_motor_current = be_u16(value) as i16,
        }
        index = value_offset + packet.width();
    }

    Ok(snapshot)
}

/// 为负载组帧（头部、长度、校验和）。机器人端模拟与测试使用。
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + MIN_FRAME_LEN);
    frame.push(TELEMETRY_HEADER);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    let sum: u32 = frame.iter().map(|&b| b as u32).sum();
    frame.push((sum as u8).wrapping_neg());
    frame
}
