// rust_websocket_utils/tests/server_transport_integration_test.rs

use futures_util::{SinkExt, StreamExt};
use log::{info, LevelFilter};
use rust_websocket_utils::client::transport::{connect_client, parse_ws_url, receive_frame};
use rust_websocket_utils::server::transport::{ServerTransport, WsStream};
use rust_websocket_utils::{InboundMessage, ReceivedFrame};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message as TungsteniteMessage};

// 初始化日志，仅用于测试，避免多次初始化
fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Info).is_test(true).try_init();
}

async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = listener.local_addr().expect("无法获取本地监听地址");
    (listener, addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_accepts_connection_and_pushes_binary() {
    init_test_logger();
    let (listener, addr) = bind_local().await;
    let (tx, mut rx) = mpsc::channel::<SocketAddr>(4);

    let server_handle = tokio::spawn(async move {
        let on_connect = move |mut ws_stream: WsStream, peer_addr: SocketAddr| {
            let tx = tx.clone();
            async move {
                info!("[测试服务端] 新连接来自 {}", peer_addr);
                // 主动推送一帧遥测数据
                let _ = ws_stream.send(TungsteniteMessage::Binary(vec![19, 2, 7, 0, 228])).await;
                let _ = tx.send(peer_addr).await;
                while let Some(Ok(_)) = ws_stream.next().await {}
            }
        };
        let _ = ServerTransport::serve(listener, on_connect).await;
    });

    let url = parse_ws_url(&format!("ws://{}", addr)).unwrap();
    let mut conn = connect_client(&url, Duration::from_secs(5)).await.expect("客户端连接失败");

    let peer = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.expect("等待服务端回调超时");
    assert!(peer.is_some(), "服务端回调未执行");

    let frame = tokio::time::timeout(Duration::from_secs(5), receive_frame(&mut conn.ws_receiver))
        .await
        .expect("等待推送帧超时")
        .expect("连接意外结束")
        .expect("读取推送帧失败");
    assert_eq!(frame, ReceivedFrame::Data(InboundMessage::Binary(vec![19, 2, 7, 0, 228])));

    server_handle.abort();
    let _ = server_handle.await;
}

#[tokio::test]
async fn test_abnormal_close_is_reported_as_not_normal() {
    init_test_logger();
    let (listener, addr) = bind_local().await;

    let server_handle = tokio::spawn(async move {
        let _ = ServerTransport::serve(listener, |mut ws_stream: WsStream, _peer: SocketAddr| async move {
            let frame = CloseFrame { code: CloseCode::Away, reason: Cow::Borrowed("重启中") };
            let _ = ws_stream.send(TungsteniteMessage::Close(Some(frame))).await;
            while let Some(Ok(_)) = ws_stream.next().await {}
        })
        .await;
    });

    let url = parse_ws_url(&format!("ws://{}", addr)).unwrap();
    let mut conn = connect_client(&url, Duration::from_secs(5)).await.expect("客户端连接失败");
    let frame = tokio::time::timeout(Duration::from_secs(5), receive_frame(&mut conn.ws_receiver))
        .await
        .expect("等待关闭帧超时");
    match frame {
        Some(Ok(ReceivedFrame::Closed { normal, reason })) => {
            assert!(!normal, "Away 状态码不应被视为正常关闭");
            assert_eq!(reason.as_deref(), Some("重启中"));
        }
        other => panic!("预期收到关闭帧，实际: {:?}", other),
    }

    server_handle.abort();
}
