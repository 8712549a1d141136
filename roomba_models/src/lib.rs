//! `roomba_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了遥控客户端各层（传输工具库 `rust_websocket_utils`、
//! 客户端应用 `roomba_remote`）之间共享的核心数据结构和枚举类型。
//!
//! 主要包含以下类型的模型：
//! - **通用枚举 (`enums`)**: 连接状态 `ConnectionState`、电机通道 `MotorChannel` 等。
//! - **传感器模型 (`sensor_models`)**: 由遥测帧解码得到的 `SensorSnapshot` 及其派生访问器。
//! - **电机模型 (`motor_models`)**: 四路执行器通道的 `Motor` / `MotorSet`。
//! - **WebSocket 文本负载 (`ws_payloads`)**: 以单键 JSON 对象发送的控制指令 `ControlCommand`。
//!
//! 设计原则：
//! - **共享性**: 所有在此 crate 中定义的模型都旨在被多个其他 crate 共享使用。
//! - **序列化/反序列化**: 模型派生 `serde::Serialize` 和 `serde::Deserialize`，便于配置持久化与日志输出。
//! - **无副作用**: 派生值（例如电压的伏特表示）一律由访问器即时计算，从不单独存储。

pub mod enums;          // 连接状态、电机通道等通用枚举
pub mod motor_models;   // 电机速度与方向模型
pub mod sensor_models;  // 传感器快照模型
pub mod ws_payloads;    // 文本控制指令负载

pub use enums::{ConnectionState, MotorChannel};
pub use motor_models::{Motor, MotorSet, MAX_MOTOR_SPEED, MIN_MOTOR_SPEED};
pub use sensor_models::SensorSnapshot;
pub use ws_payloads::{CommandError, ControlCommand};
