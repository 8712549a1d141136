// roomba_remote/src/ws_client/service.rs

//! 与机器人之间唯一一条 WebSocket 链路的连接管理器。
//!
//! 状态机：
//!
//! ```text
//! Disconnected --connect()--> Connecting --握手成功--> Connected
//!      ^                          |                       |
//!      |                    握手失败/超时          意外断开/Pong 超时
//!      |                          v                       v
//!      +------ disconnect() --- Disconnected <-----------+
//!                                 | 固定等待 reconnect_delay
//!                                 +--> Connecting ...
//! ```
//!
//! 对端以正常关闭码 (1000) 关闭，或调用方执行 `disconnect()` 时，不再重连。
//!
//! 一次 `connect()` 启动一个监督任务，它依次执行"连接 -> 会话 -> 等待 -> 重连"。
//! 每个会话内并发运行读取循环和保活循环，任何一方结束即结束本会话。

use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use log::{debug, error, info, warn};
use roomba_models::ConnectionState;
use rust_websocket_utils::client::transport::{
    connect_client, parse_ws_url, receive_frame, ClientConnection, ClientWsStream,
};
use rust_websocket_utils::{ConnectionError, InboundMessage, ReceivedFrame, SendError};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message as TungsteniteMessage};
use url::Url;

use super::heartbeat;
use crate::config::ConnectionConfig;
use crate::state::{StateHub, Subscription};

/// 入站业务消息的缓冲数量。缓冲满时新消息被丢弃，不阻塞读取循环。
const INBOUND_BUFFER: usize = 64;
/// 主动断开时等待对端确认关闭帧的时间。
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// 一个会话（一次成功连接）结束的原因。
#[derive(Debug)]
pub(super) enum SessionEnd {
    /// 调用方主动断开。
    Cancelled,
    /// 对端以正常关闭码关闭。
    ClosedNormally(Option<String>),
    /// 意外断开：传输错误、非正常关闭、Pong 超时等。
    Lost(String),
}

/// 监督任务与会话任务共享的连接状态。
pub(super) struct ManagerInner {
    pub(super) config: ConnectionConfig,
    pub(super) state: StateHub<ConnectionState>,
    /// 发送端，仅在会话期间为 `Some`。
    pub(super) ws_sender: TokioMutex<Option<SplitSink<ClientWsStream, TungsteniteMessage>>>,
    /// 当前会话的入站消息队列。
    inbound: TokioMutex<Option<mpsc::Receiver<InboundMessage>>>,
    /// 自上次 ping 之后是否收到过任何消息。
    pub(super) received_since_ping: AtomicBool,
    /// 收到 pong 时唤醒正在等待的保活循环。
    pub(super) pong_received: Notify,
    /// 累计安排过的重连次数。
    reconnect_attempts: AtomicU64,
}

struct Supervisor {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// 连接管理器。
///
/// 套接字由管理器独占，外部只能通过 `send_*` / `receive` 和状态订阅与之交互。
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
    supervisor: TokioMutex<Option<Supervisor>>,
}

impl ConnectionManager {
    pub fn new(mut config: ConnectionConfig) -> Self {
        config.sanitize();
        info!("[连接管理] 初始化，目标地址: {}", config.robot_url);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                state: StateHub::new("connection_state", ConnectionState::Disconnected),
                ws_sender: TokioMutex::new(None),
                inbound: TokioMutex::new(None),
                received_since_ping: AtomicBool::new(false),
                pong_received: Notify::new(),
                reconnect_attempts: AtomicU64::new(0),
            }),
            supervisor: TokioMutex::new(None),
        }
    }

    /// 开始连接并保持连接，返回连接状态的订阅。
    ///
    /// 已经在连接或已连接时不会重复建立连接，只返回一个新的订阅。
    /// 连接失败不会作为错误返回，而是体现为状态变化和后续的自动重连。
    pub async fn connect(&self) -> Subscription<ConnectionState> {
        let subscription = self.inner.state.subscribe();
        let mut supervisor = self.supervisor.lock().await;

        if let Some(existing) = supervisor.as_ref() {
            if !existing.handle.is_finished() {
                debug!("[连接管理] 连接已在进行中 (当前状态: {})，忽略重复的 connect()", self.inner.state.current());
                return subscription;
            }
        }

        let url = match parse_ws_url(&self.inner.config.robot_url) {
            Ok(url) => url,
            Err(e) => {
                error!("[连接管理] {}", e);
                self.inner.state.update_if_changed(ConnectionState::Disconnected);
                return subscription;
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_supervisor(Arc::clone(&self.inner), url, cancel_rx));
        *supervisor = Some(Supervisor { cancel_tx, handle });
        subscription
    }

    /// 主动断开：停止读取、保活和任何正在进行的重连等待，向对端发送正常关闭帧。
    ///
    /// 未连接时为空操作。
    pub async fn disconnect(&self) {
        let Some(Supervisor { cancel_tx, handle }) = self.supervisor.lock().await.take() else {
            debug!("[连接管理] 当前没有活动连接，disconnect() 无需操作");
            return;
        };
        info!("[连接管理] 正在主动断开连接...");
        let _ = cancel_tx.send(true);
        if let Err(e) = handle.await {
            error!("[连接管理] 监督任务异常结束: {}", e);
        }
        *self.inner.ws_sender.lock().await = None;
        self.inner.state.update_if_changed(ConnectionState::Disconnected);
        info!("[连接管理] 已断开。");
    }

    /// 发送一个二进制帧。
    pub async fn send_binary(&self, data: Vec<u8>) -> Result<(), SendError> {
        self.inner.send(TungsteniteMessage::Binary(data)).await
    }

    /// 发送一个文本帧。
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.inner.send(TungsteniteMessage::Text(text.into())).await
    }

    /// 等待下一条入站业务消息。
    ///
    /// 未连接或当前会话结束时返回 `ConnectionError::Closed`。
    pub async fn receive(&self) -> Result<InboundMessage, ConnectionError> {
        let mut inbound = self.inner.inbound.lock().await;
        match inbound.as_mut() {
            Some(receiver) => receiver.recv().await.ok_or(ConnectionError::Closed),
            None => Err(ConnectionError::Closed),
        }
    }

    /// 与 `receive` 相同，但最多等待 `wait`，超时返回 `ConnectionError::Timeout`。
    pub async fn receive_timeout(&self, wait: Duration) -> Result<InboundMessage, ConnectionError> {
        tokio::time::timeout(wait, self.receive()).await.map_err(|_| ConnectionError::Timeout)?
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.current()
    }

    /// 订阅连接状态（立即得到当前状态）。
    pub fn subscribe_state(&self) -> Subscription<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn state_hub(&self) -> StateHub<ConnectionState> {
        self.inner.state.clone()
    }

    /// 自创建以来因意外断开或连接失败而安排的重连次数。
    pub fn reconnect_attempts(&self) -> u64 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> &str {
        &self.inner.config.robot_url
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // 通知监督任务自行收尾，它会发送关闭帧后退出
        if let Some(supervisor) = self.supervisor.get_mut().take() {
            let _ = supervisor.cancel_tx.send(true);
        }
    }
}

impl ManagerInner {
    pub(super) async fn send(&self, message: TungsteniteMessage) -> Result<(), SendError> {
        let mut sender_guard = self.ws_sender.lock().await;
        let sender = sender_guard.as_mut().ok_or(SendError::NotConnected)?;
        sender.send(message).await.map_err(SendError::from)
    }

    /// 运行一个会话直到它结束，返回结束原因。
    async fn run_session(&self, connection: ClientConnection, cancel_rx: &mut watch::Receiver<bool>) -> SessionEnd {
        let ClientConnection { ws_sender, mut ws_receiver } = connection;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        *self.ws_sender.lock().await = Some(ws_sender);
        *self.inbound.lock().await = Some(inbound_rx);
        self.received_since_ping.store(false, Ordering::SeqCst);
        self.state.update_if_changed(ConnectionState::Connected);

        let reader = self.read_loop(&mut ws_receiver, inbound_tx);
        let keep_alive = heartbeat::keep_alive(self);
        tokio::pin!(reader, keep_alive);

        let finished = tokio::select! {
            end = &mut reader => Some(end),
            end = &mut keep_alive => Some(end),
            _ = cancel_rx.changed() => None,
        };

        let end = match finished {
            Some(end) => end,
            None => {
                self.send_close().await;
                // 给对端一点时间回复关闭帧，使连接完整关闭
                if tokio::time::timeout(CLOSE_GRACE, &mut reader).await.is_err() {
                    debug!("[连接管理] 对端未在 {:?} 内确认关闭帧", CLOSE_GRACE);
                }
                SessionEnd::Cancelled
            }
        };

        *self.ws_sender.lock().await = None;
        end
    }

    async fn send_close(&self) {
        let close_frame = CloseFrame { code: CloseCode::Normal, reason: Cow::Borrowed("client disconnect") };
        if let Err(e) = self.send(TungsteniteMessage::Close(Some(close_frame))).await {
            debug!("[连接管理] 发送关闭帧失败: {}", e);
        }
    }

    /// 读取循环：把业务消息放入入站队列，处理 pong 与关闭帧。
    async fn read_loop(
        &self,
        ws_receiver: &mut futures_util::stream::SplitStream<ClientWsStream>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> SessionEnd {
        loop {
            match receive_frame(ws_receiver).await {
                Some(Ok(ReceivedFrame::Data(message))) => {
                    self.received_since_ping.store(true, Ordering::SeqCst);
                    if let Err(mpsc::error::TrySendError::Full(dropped)) = inbound_tx.try_send(message) {
                        warn!("[连接管理] 入站队列已满，丢弃一条 {} 字节的消息", dropped.len());
                    }
                }
                Some(Ok(ReceivedFrame::Pong)) => {
                    debug!("[连接管理] 收到 pong");
                    self.pong_received.notify_waiters();
                }
                Some(Ok(ReceivedFrame::Ping)) => {
                    self.received_since_ping.store(true, Ordering::SeqCst);
                }
                Some(Ok(ReceivedFrame::Closed { normal: true, reason })) => {
                    return SessionEnd::ClosedNormally(reason);
                }
                Some(Ok(ReceivedFrame::Closed { normal: false, reason })) => {
                    return SessionEnd::Lost(format!("对端非正常关闭: {}", reason.unwrap_or_default()));
                }
                Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                None => return SessionEnd::Lost("连接流已结束".to_string()),
            }
        }
    }
}

/// 监督任务：连接、运行会话、在意外断开后以固定间隔重连。
async fn run_supervisor(inner: Arc<ManagerInner>, url: Url, mut cancel_rx: watch::Receiver<bool>) {
    let mut consecutive_failures: u64 = 0;

    loop {
        if *cancel_rx.borrow() {
            break;
        }
        inner.state.update_if_changed(ConnectionState::Connecting);

        let connect_result = tokio::select! {
            result = connect_client(&url, inner.config.connect_timeout()) => result,
            _ = cancel_rx.changed() => break,
        };

        match connect_result {
            Ok(connection) => {
                consecutive_failures = 0;
                info!("[连接管理] 已连接到 {}", url);
                match inner.run_session(connection, &mut cancel_rx).await {
                    SessionEnd::Cancelled => {
                        info!("[连接管理] 连接已按请求关闭");
                        break;
                    }
                    SessionEnd::ClosedNormally(reason) => {
                        info!("[连接管理] 对端正常关闭连接 (原因: {:?})，不再重连", reason);
                        break;
                    }
                    SessionEnd::Lost(reason) => {
                        warn!("[连接管理] 连接意外断开: {}", reason);
                    }
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!("[连接管理] 连接 {} 失败 (连续第 {} 次): {}", url, consecutive_failures, e);
            }
        }

        inner.state.update_if_changed(ConnectionState::Disconnected);
        let attempt = inner.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = inner.config.reconnect_delay();
        info!("[连接管理] {:?} 后进行第 {} 次重连", delay, attempt);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel_rx.changed() => break,
        }
    }

    inner.state.update_if_changed(ConnectionState::Disconnected);
    debug!("[连接管理] 监督任务退出");
}
