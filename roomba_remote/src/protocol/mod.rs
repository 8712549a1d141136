// roomba_remote/src/protocol/mod.rs

//! 机器人二进制协议：入站遥测帧解码与出站电机指令帧编码。

pub mod motor_command;
pub mod telemetry;

pub use motor_command::CommandLayout;
pub use telemetry::ParseError;
