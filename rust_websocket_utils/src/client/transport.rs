// rust_websocket_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 本模块负责建立与机器人端的连接（带连接超时），并把读取流中的底层消息
//! 转换为 `ReceivedFrame`。重连、保活等策略不在这里实现，由上层连接管理器负责。

use std::time::Duration;

use futures_util::{
    stream::{SplitSink, SplitStream}, // 将 WebSocket 流拆分为发送端和接收端
    StreamExt,
};
use log::{debug, error, info};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    tungstenite::Error as TungsteniteError,
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::error::ConnectionError;
use crate::message::{classify_message, ReceivedFrame};

/// 客户端连接成功后得到的 WebSocket 流类型。
pub type ClientWsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 一个活动的客户端 WebSocket 连接，已拆分为发送端与接收端。
pub struct ClientConnection {
    /// 发送端，由连接管理器独占持有。
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    /// 接收端，由读取任务独占持有。
    pub ws_receiver: SplitStream<ClientWsStream>,
}

/// 解析并校验 WebSocket URL，只接受 `ws` / `wss` 协议。
pub fn parse_ws_url(url_str: &str) -> Result<Url, ConnectionError> {
    let url = Url::parse(url_str)
        .map_err(|e| ConnectionError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConnectionError::InvalidUrl(format!("不支持的协议 '{}': {}", other, url_str))),
    }
}

/// 在 `connect_timeout` 内异步连接到指定的 WebSocket 服务。
///
/// 超时返回 `ConnectionError::Timeout`，握手或 TCP 失败返回 `ConnectionError::Transport`。
pub async fn connect_client(url: &Url, connect_timeout: Duration) -> Result<ClientConnection, ConnectionError> {
    info!("[传输层] 开始连接到 {} (超时 {:?})", url, connect_timeout);
    match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws_stream, response))) => {
            info!("[传输层] 已连接到 {} (HTTP 状态码: {})", url, response.status());
            debug!("[传输层] 握手响应头: {:?}", response.headers());
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection { ws_sender, ws_receiver })
        }
        Ok(Err(e)) => {
            error!("[传输层] 连接到 {} 失败: {}", url, e);
            Err(ConnectionError::Transport(e))
        }
        Err(_) => {
            error!("[传输层] 连接到 {} 超时 ({:?})", url, connect_timeout);
            Err(ConnectionError::Timeout)
        }
    }
}

/// 从接收流中读取下一条有意义的帧。
///
/// # Returns
/// * `Some(Ok(frame))`: 收到一条已归类的帧（包括关闭帧）。
/// * `Some(Err(e))`: 底层传输错误。
/// * `None`: 流已结束，连接已不可用。
pub async fn receive_frame(
    ws_receiver: &mut SplitStream<ClientWsStream>,
) -> Option<Result<ReceivedFrame, ConnectionError>> {
    loop {
        match ws_receiver.next().await {
            Some(Ok(message)) => match classify_message(message) {
                Some(frame) => break Some(Ok(frame)),
                None => debug!("[传输层] 跳过底层原始帧"),
            },
            Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) => {
                debug!("[传输层] 读取时检测到连接已关闭");
                break None;
            }
            Some(Err(e)) => {
                error!("[传输层] 读取 WebSocket 流时发生错误: {}", e);
                break Some(Err(ConnectionError::Transport(e)));
            }
            None => {
                debug!("[传输层] WebSocket 接收流已结束");
                break None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::InboundMessage;
    use crate::server::transport::{ServerTransport, WsStream};
    use futures_util::SinkExt;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    // 启动一个把二进制帧原样回显、把 "ping" 文本应答为 "pong" 的本地服务端。
    async fn setup_echo_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
        let addr = listener.local_addr().expect("无法获取本地监听地址");
        let handle = tokio::spawn(async move {
            let _ = ServerTransport::serve(listener, |mut ws_stream: WsStream, _peer: SocketAddr| async move {
                while let Some(Ok(message)) = ws_stream.next().await {
                    let reply = match message {
                        Message::Binary(bytes) => Message::Binary(bytes),
                        Message::Text(text) if text == "ping" => Message::Text("pong".to_string()),
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    if ws_stream.send(reply).await.is_err() {
                        break;
                    }
                }
            })
            .await;
        });
        (addr, handle)
    }

    #[test]
    fn test_parse_ws_url_rejects_other_schemes() {
        assert!(parse_ws_url("ws://192.168.4.1/ws").is_ok());
        assert!(matches!(parse_ws_url("http://192.168.4.1/ws"), Err(ConnectionError::InvalidUrl(_))));
        assert!(matches!(parse_ws_url("not a url"), Err(ConnectionError::InvalidUrl(_))));
    }

    #[tokio::test]
    /// 集成测试：连接、发送二进制帧并收到回显，文本 ping 得到 Pong 分类。
    async fn test_client_connect_send_receive_echo() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (addr, server_handle) = setup_echo_server().await;
        let url = parse_ws_url(&format!("ws://{}", addr)).unwrap();

        let mut conn = connect_client(&url, Duration::from_secs(5)).await.expect("连接本地回显服务端失败");
        conn.ws_sender.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(5), receive_frame(&mut conn.ws_receiver))
            .await
            .expect("等待回显超时");
        assert_eq!(frame.unwrap().unwrap(), ReceivedFrame::Data(InboundMessage::Binary(vec![1, 2, 3])));

        conn.ws_sender.send(Message::Text("ping".to_string())).await.unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(5), receive_frame(&mut conn.ws_receiver))
            .await
            .expect("等待 pong 超时");
        assert_eq!(frame.unwrap().unwrap(), ReceivedFrame::Pong);

        server_handle.abort();
    }

    #[tokio::test]
    /// 连接一个没有监听者的端口应返回传输错误而不是挂起。
    async fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = parse_ws_url(&format!("ws://{}", addr)).unwrap();
        let result = connect_client(&url, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ConnectionError::Transport(_)) | Err(ConnectionError::Timeout)));
    }
}
