// roomba_remote/src/session/service.rs

//! 会话编排器 `RoombaService`。
//!
//! 持有唯一的连接管理器，把连接上收到的数据分发到各个状态中心，
//! 并按固定周期把电机设定发送给机器人。
//!
//! 运行中的后台任务：
//! - 状态监听：跟随连接状态启动读取循环、重启电机循环、重置视频流标志；
//! - 读取循环：每次进入 Connected 时启动，按帧大小区分遥测帧与图像帧；
//! - 电机循环：启用期间每 `command_interval` 发送一帧电机指令，发送失败即停止。

use log::{debug, error, info, warn};
use roomba_models::ws_payloads::{START_STREAM_TEXT, STOP_STREAM_TEXT};
use roomba_models::{ConnectionState, ControlCommand, MotorChannel, MotorSet, SensorSnapshot};
use rust_websocket_utils::InboundMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::frame_rate::FrameRateMeter;
use crate::config::{AppConfig, SessionConfig};
use crate::error::AppError;
use crate::event::LogEntry;
use crate::protocol::{motor_command, telemetry};
use crate::state::{StateHub, Subscription};
use crate::ws_client::ConnectionManager;

/// 最近一帧图像的原始字节。
pub type RawFrame = Option<Arc<[u8]>>;

struct SessionInner {
    connection: ConnectionManager,
    config: SessionConfig,
    is_streaming: StateHub<bool>,
    logs: StateHub<LogEntry>,
    sensors: StateHub<SensorSnapshot>,
    frames: StateHub<RawFrame>,
    fps: StateHub<f64>,
    vacuum_speed: StateHub<i8>,
    motors: StateHub<MotorSet>,
    frame_rate: Mutex<FrameRateMeter>,
    /// 调用方是否希望电机循环运行；重连后据此恢复发送。
    motor_loop_enabled: AtomicBool,
    state_task: Mutex<Option<JoinHandle<()>>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    motor_task: Mutex<Option<JoinHandle<()>>>,
}

/// 替换槽位中的任务句柄，并中止原有任务。
fn replace_task(slot: &Mutex<Option<JoinHandle<()>>>, handle: Option<JoinHandle<()>>) {
    let previous = std::mem::replace(&mut *slot.lock().unwrap_or_else(PoisonError::into_inner), handle);
    if let Some(previous) = previous {
        previous.abort();
    }
}

/// 机器人遥控会话。
pub struct RoombaService {
    inner: Arc<SessionInner>,
}

impl RoombaService {
    pub fn new(config: AppConfig) -> Self {
        let AppConfig { connection, mut session } = config;
        session.sanitize();
        let frame_rate = FrameRateMeter::new(session.frame_rate_window);
        Self {
            inner: Arc::new(SessionInner {
                connection: ConnectionManager::new(connection),
                config: session,
                is_streaming: StateHub::new("is_streaming", false),
                logs: StateHub::new("logs", LogEntry::initial()),
                sensors: StateHub::new("sensors", SensorSnapshot::default()),
                frames: StateHub::new("frames", None),
                fps: StateHub::new("fps", 0.0),
                vacuum_speed: StateHub::new("vacuum_speed", 0),
                motors: StateHub::new("motors", MotorSet::stopped()),
                frame_rate: Mutex::new(frame_rate),
                motor_loop_enabled: AtomicBool::new(false),
                state_task: Mutex::new(None),
                receive_task: Mutex::new(None),
                motor_task: Mutex::new(None),
            }),
        }
    }

    /// 连接机器人并开始跟随连接状态。重复调用不会建立第二条连接。
    pub async fn start(&self) -> Subscription<ConnectionState> {
        let already_running =
            self.inner.state_task.lock().unwrap_or_else(PoisonError::into_inner).as_ref().is_some_and(|h| !h.is_finished());
        if !already_running {
            self.inner.log(format!("连接到 {}", self.inner.connection.url()));
            let states = self.inner.connection.subscribe_state();
            let handle = tokio::spawn(watch_connection(Arc::clone(&self.inner), states));
            replace_task(&self.inner.state_task, Some(handle));
        }
        self.inner.connection.connect().await
    }

    /// 停止所有后台任务并主动断开连接。
    pub async fn shutdown(&self) {
        info!("[会话] 正在关闭会话...");
        self.inner.motor_loop_enabled.store(false, Ordering::SeqCst);
        replace_task(&self.inner.motor_task, None);
        replace_task(&self.inner.state_task, None);
        replace_task(&self.inner.receive_task, None);
        self.inner.connection.disconnect().await;
        self.inner.reset_transient_state();
        self.inner.log("会话已关闭");
    }

    // --- 状态中心 ---

    pub fn connection_state(&self) -> StateHub<ConnectionState> {
        self.inner.connection.state_hub()
    }

    pub fn is_streaming(&self) -> StateHub<bool> {
        self.inner.is_streaming.clone()
    }

    pub fn logs(&self) -> StateHub<LogEntry> {
        self.inner.logs.clone()
    }

    pub fn sensors(&self) -> StateHub<SensorSnapshot> {
        self.inner.sensors.clone()
    }

    /// 图像帧：订阅时先得到最近一帧（如果有），之后是每一个新帧。
    pub fn frames(&self) -> StateHub<RawFrame> {
        self.inner.frames.clone()
    }

    pub fn fps(&self) -> StateHub<f64> {
        self.inner.fps.clone()
    }

    pub fn vacuum_speed(&self) -> StateHub<i8> {
        self.inner.vacuum_speed.clone()
    }

    pub fn motors(&self) -> StateHub<MotorSet> {
        self.inner.motors.clone()
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.inner.connection.reconnect_attempts()
    }

    // --- 电机 ---

    /// 设置单个通道的速度（-100 ~ 100，超出范围被钳制）。由输入设备调用。
    pub fn set_motor_speed(&self, channel: MotorChannel, speed: i16) {
        self.inner.motors.modify(|motors| motors.set(channel, speed));
    }

    /// 设置吸尘速度，发送时同时驱动吸尘与滚刷两个通道。
    pub fn set_vacuum_speed(&self, speed: i16) {
        let speed = roomba_models::Motor::new(speed).speed();
        self.inner.vacuum_speed.update(speed);
    }

    /// 启动周期性电机指令发送。之后每次重新连上都会自动恢复发送。
    pub fn start_sending_motor_data(&self) {
        self.inner.motor_loop_enabled.store(true, Ordering::SeqCst);
        self.inner.spawn_motor_loop();
    }

    pub fn stop_sending_motor_data(&self) {
        self.inner.motor_loop_enabled.store(false, Ordering::SeqCst);
        replace_task(&self.inner.motor_task, None);
        debug!("[会话] 电机指令发送已停止");
    }

    // --- 文本指令 ---

    pub async fn start_roomba(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::Start(true)).await
    }

    pub async fn stop_roomba(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::Stop(true)).await
    }

    pub async fn safe_mode(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::safe_mode()).await
    }

    pub async fn full_mode(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::full_mode()).await
    }

    pub async fn play_song(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::PlaySong(true)).await
    }

    pub async fn play_song2(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::PlaySong2(true)).await
    }

    pub async fn play_daft_punk(&self) -> Result<(), AppError> {
        self.send_command(ControlCommand::PlayDaftPunk(true)).await
    }

    pub async fn stream_sensors(&self, stream: bool) -> Result<(), AppError> {
        self.send_command(ControlCommand::StreamSensors(stream)).await
    }

    /// 在机器人的数码管上显示最多 4 个字符。
    pub async fn update_display(&self, text: &str) -> Result<(), AppError> {
        self.send_command(ControlCommand::display(text)?).await
    }

    async fn send_command(&self, command: ControlCommand) -> Result<(), AppError> {
        let json = command.to_json()?;
        debug!("[会话] 发送指令: {}", json);
        self.inner.connection.send_text(json).await?;
        Ok(())
    }

    // --- 视频流 ---

    /// 请求机器人开始推送图像帧。已在推送时为空操作。
    pub async fn start_stream(&self) -> Result<(), AppError> {
        if self.inner.is_streaming.current() {
            return Ok(());
        }
        self.inner.connection.send_text(START_STREAM_TEXT).await?;
        self.inner.is_streaming.update(true);
        self.inner.log("视频流已开启");
        Ok(())
    }

    pub async fn stop_stream(&self) -> Result<(), AppError> {
        if !self.inner.is_streaming.current() {
            return Ok(());
        }
        self.inner.connection.send_text(STOP_STREAM_TEXT).await?;
        self.inner.is_streaming.update(false);
        self.inner.log("视频流已关闭");
        Ok(())
    }
}

impl Drop for RoombaService {
    fn drop(&mut self) {
        replace_task(&self.inner.motor_task, None);
        replace_task(&self.inner.state_task, None);
        replace_task(&self.inner.receive_task, None);
    }
}

impl SessionInner {
    /// 同时写入 `log` 与日志状态中心。
    fn log(&self, message: impl Into<String>) {
        let entry = LogEntry::new(message);
        info!("[会话] {}", entry.message);
        self.logs.update(entry);
    }

    fn reset_transient_state(&self) {
        self.is_streaming.update_if_changed(false);
    }

    fn spawn_receive_loop(self: &Arc<Self>) {
        let handle = tokio::spawn(receive_loop(Arc::clone(self)));
        replace_task(&self.receive_task, Some(handle));
    }

    fn spawn_motor_loop(self: &Arc<Self>) {
        let handle = tokio::spawn(motor_loop(Arc::clone(self)));
        replace_task(&self.motor_task, Some(handle));
    }

    fn handle_binary(&self, data: Vec<u8>) {
        if data.len() < self.config.telemetry_max_bytes {
            let previous = self.sensors.current();
            match telemetry::decode(&data, &previous) {
                Ok(snapshot) => self.sensors.update(snapshot),
                Err(e) => {
                    warn!("[会话] 丢弃无法解析的遥测帧 ({} 字节): {}", data.len(), e);
                    self.log(format!("无法解析传感器数据: {}", e));
                }
            }
        } else {
            self.frames.update(Some(Arc::from(data)));
            let fps = self.frame_rate.lock().unwrap_or_else(PoisonError::into_inner).record();
            self.fps.update(fps);
        }
    }
}

/// 跟随连接状态变化。
async fn watch_connection(inner: Arc<SessionInner>, mut states: Subscription<ConnectionState>) {
    while let Some(state) = states.next().await {
        match state {
            ConnectionState::Connecting => inner.log("正在连接机器人"),
            ConnectionState::Connected => {
                inner.log("已连接到机器人");
                inner.spawn_receive_loop();
                if inner.motor_loop_enabled.load(Ordering::SeqCst) {
                    debug!("[会话] 重新连接后恢复电机指令发送");
                    inner.spawn_motor_loop();
                }
            }
            ConnectionState::Disconnected => {
                inner.log("与机器人的连接已断开");
                inner.reset_transient_state();
            }
        }
    }
}

/// 读取循环：直到当前连接结束。
async fn receive_loop(inner: Arc<SessionInner>) {
    loop {
        match inner.connection.receive().await {
            Ok(InboundMessage::Binary(data)) => inner.handle_binary(data),
            Ok(InboundMessage::Text(text)) => inner.log(format!("收到文本消息: {}", text)),
            Err(e) => {
                debug!("[会话] 读取循环结束: {}", e);
                break;
            }
        }
    }
}

/// 电机循环：机器人端在一段时间收不到指令后会停转，因此需要持续发送。
async fn motor_loop(inner: Arc<SessionInner>) {
    let mut ticker = tokio::time::interval(inner.config.command_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let vacuum = inner.vacuum_speed.current() as i16;
        let mut motors = inner.motors.current();
        motors.set(MotorChannel::Suction, vacuum);
        motors.set(MotorChannel::Brush, vacuum);

        let frame = motor_command::encode(&motors, inner.config.command_layout);
        if let Err(e) = inner.connection.send_binary(frame.clone()).await {
            error!("[会话] 发送电机指令失败，停止发送循环: {}", e);
            inner.log(format!("发送电机指令 {:?} 失败: {}", frame, e));
            return;
        }
    }
}
