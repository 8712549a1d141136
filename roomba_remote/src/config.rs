// roomba_remote/src/config.rs

//! 遥控客户端的配置管理模块。
//!
//! 配置以 JSON 文件保存。文件缺失或损坏时使用默认配置并写回磁盘，
//! 之后用户可以直接编辑该文件调整机器人地址和各项时间参数。

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;
use crate::protocol::motor_command::CommandLayout;

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "roomba_settings.json";
/// 覆盖机器人地址的环境变量
pub const URL_ENV_VAR: &str = "ROOMBA_URL";
/// 机器人热点模式下的默认地址
pub const DEFAULT_ROBOT_URL: &str = "ws://192.168.4.1/ws";

/// 连接管理相关配置（单位均为毫秒）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// 机器人 WebSocket 地址
    pub robot_url: String,
    /// 建立连接的超时时间
    pub connect_timeout_ms: u64,
    /// 两次心跳之间的间隔
    pub ping_interval_ms: u64,
    /// 发出 ping 后等待 pong 的时间
    pub pong_timeout_ms: u64,
    /// 意外断开后重连前的固定等待
    pub reconnect_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            robot_url: DEFAULT_ROBOT_URL.to_string(),
            connect_timeout_ms: 5_000,
            ping_interval_ms: 20_000,
            pong_timeout_ms: 10_000,
            reconnect_delay_ms: 5_000,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// 把为 0 的时间参数恢复为默认值。为 0 时心跳与重连会变成忙循环。
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        restore_if_zero("connection.connect_timeout_ms", &mut self.connect_timeout_ms, defaults.connect_timeout_ms);
        restore_if_zero("connection.ping_interval_ms", &mut self.ping_interval_ms, defaults.ping_interval_ms);
        restore_if_zero("connection.pong_timeout_ms", &mut self.pong_timeout_ms, defaults.pong_timeout_ms);
        restore_if_zero("connection.reconnect_delay_ms", &mut self.reconnect_delay_ms, defaults.reconnect_delay_ms);
    }
}

fn restore_if_zero(field: &str, value: &mut u64, default: u64) {
    if *value == 0 {
        warn!("[配置模块] {} 不能为 0，已改用默认值 {}。", field, default);
        *value = default;
    }
}

/// 会话编排相关配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// 电机指令发送周期（毫秒）
    pub command_interval_ms: u64,
    /// 小于此字节数的二进制帧按遥测帧处理，其余视为图像帧
    pub telemetry_max_bytes: usize,
    /// 帧率统计窗口（帧数）
    pub frame_rate_window: usize,
    /// 电机指令帧布局
    pub command_layout: CommandLayout,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_interval_ms: 150,
            telemetry_max_bytes: 200,
            frame_rate_window: 60,
            command_layout: CommandLayout::default(),
        }
    }
}

impl SessionConfig {
    pub fn command_interval(&self) -> Duration {
        Duration::from_millis(self.command_interval_ms)
    }

    /// 电机指令周期为 0 时恢复为默认值（`tokio::time::interval` 不接受 0）。
    pub fn sanitize(&mut self) {
        restore_if_zero("session.command_interval_ms", &mut self.command_interval_ms, Self::default().command_interval_ms);
    }
}

/// 应用的主配置结构体
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn sanitize(&mut self) {
        self.connection.sanitize();
        self.session.sanitize();
    }

    /// 读取配置文件；文件不存在或无法解析时使用默认配置并尝试写回。
    pub fn load_or_create(path: &Path) -> AppConfig {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(mut config) => {
                    info!("[配置模块] 已从 {:?} 加载配置。", path);
                    config.sanitize();
                    config
                }
                Err(e) => {
                    warn!("[配置模块] 解析 {:?} 失败: {}。文件可能已损坏，将使用默认配置并覆盖。", path, e);
                    Self::write_default(path)
                }
            },
            Err(e) => {
                info!("[配置模块] 未能读取 {:?} (错误: {})，将使用默认配置并创建新文件。", path, e);
                Self::write_default(path)
            }
        }
    }

    fn write_default(path: &Path) -> AppConfig {
        let config = AppConfig::default();
        if let Err(e) = config.save(path) {
            warn!("[配置模块] {}", e);
        }
        config
    }

    /// 将配置以美化 JSON 写入文件，必要时创建父目录。
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::Config(format!("创建配置目录 {:?} 失败: {}", parent, e)))?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
        fs::write(path, content).map_err(|e| AppError::Config(format!("写入配置文件 {:?} 失败: {}", path, e)))?;
        info!("[配置模块] 配置已保存到 {:?}。", path);
        Ok(())
    }

    /// 按优先级应用机器人地址覆盖：命令行参数 > 环境变量 > 配置文件。
    pub fn apply_url_override(&mut self, cli_url: Option<String>) {
        let override_url = cli_url.or_else(|| env::var(URL_ENV_VAR).ok()).filter(|url| !url.trim().is_empty());
        if let Some(url) = override_url {
            info!("[配置模块] 机器人地址被覆盖为: {}", url);
            self.connection.robot_url = url;
        }
    }
}

/// 配置文件的默认位置：当前工作目录。
pub fn default_config_path() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(CONFIG_FILE_NAME)
}
