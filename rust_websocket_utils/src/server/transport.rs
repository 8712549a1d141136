// rust_websocket_utils/src/server/transport.rs

//! 包含服务端 WebSocket 监听、接受连接的逻辑，用于模拟机器人端。

use log::{error, info};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, WebSocketStream};

/// 经过 WebSocket 握手后的服务端 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// `ServerTransport` 负责服务端的监听和连接接受。
pub struct ServerTransport;

impl ServerTransport {
    /// 绑定到 `addr` 并开始接受连接，详见 [`ServerTransport::serve`]。
    pub async fn start<F, Fut>(addr: SocketAddr, on_connect: F) -> Result<(), std::io::Error>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&addr).await?;
        Self::serve(listener, on_connect).await
    }

    /// 在一个已绑定的监听器上持续接受连接。
    ///
    /// 每个连接在独立的 Tokio 任务中完成握手，然后调用 `on_connect`。
    /// 接受单个连接失败只记录日志，不会终止监听循环。
    pub async fn serve<F, Fut>(listener: TcpListener, on_connect: F) -> Result<(), std::io::Error>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        info!("[模拟服务端] 正在监听地址: {}", listener.local_addr()?);
        loop {
            match listener.accept().await {
                Ok((tcp_stream, peer_addr)) => {
                    let on_connect_callback = on_connect.clone();
                    tokio::spawn(async move {
                        match accept_async(tcp_stream).await {
                            Ok(ws_stream) => {
                                info!("[模拟服务端] 与 {} 的 WebSocket 握手成功", peer_addr);
                                on_connect_callback(ws_stream, peer_addr).await;
                            }
                            Err(e) => error!("[模拟服务端] 与 {} 的 WebSocket 握手失败: {}", peer_addr, e),
                        }
                    });
                }
                Err(e) => error!("[模拟服务端] 接受 TCP 连接失败: {}。将继续监听。", e),
            }
        }
    }
}
