// roomba_remote/tests/session_test.rs

use futures_util::{SinkExt, StreamExt};
use log::LevelFilter;
use roomba_models::{ConnectionState, MotorChannel};
use roomba_remote::config::{AppConfig, ConnectionConfig, SessionConfig};
use roomba_remote::protocol::motor_command::{decode_motor_frame, CommandLayout};
use roomba_remote::protocol::telemetry::encode_frame;
use roomba_remote::RoombaService;
use rust_websocket_utils::server::transport::{ServerTransport, WsStream};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;

const WAIT: Duration = Duration::from_secs(5);

fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Debug).is_test(true).try_init();
}

fn session_config(addr: SocketAddr) -> AppConfig {
    AppConfig {
        connection: ConnectionConfig {
            robot_url: format!("ws://{}/ws", addr),
            connect_timeout_ms: 1_000,
            ping_interval_ms: 5_000,
            pong_timeout_ms: 1_000,
            reconnect_delay_ms: 150,
        },
        session: SessionConfig { command_interval_ms: 30, ..SessionConfig::default() },
    }
}

/// 模拟机器人：把 `push` 中的帧推送给客户端，把收到的消息转发到 `seen_tx`。
///
/// 每个连接准备好推送后向 `ready_tx` 报告一次；收到 `drop_signal` 时不发送关闭帧直接断开。
async fn spawn_robot(
    push: broadcast::Sender<TungsteniteMessage>,
    seen_tx: mpsc::UnboundedSender<TungsteniteMessage>,
    ready_tx: mpsc::UnboundedSender<()>,
    drop_signal: broadcast::Sender<()>,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = listener.local_addr().expect("无法获取本地监听地址");
    tokio::spawn(async move {
        let on_connect = move |ws: WsStream, _peer: SocketAddr| {
            let mut push_rx = push.subscribe();
            let mut drop_rx = drop_signal.subscribe();
            let seen_tx = seen_tx.clone();
            let _ = ready_tx.send(());
            async move {
                let (mut sink, mut stream) = ws.split();
                loop {
                    tokio::select! {
                        outgoing = push_rx.recv() => match outgoing {
                            Ok(message) => {
                                if sink.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(_) => break,
                        },
                        incoming = stream.next() => match incoming {
                            Some(Ok(message)) => {
                                let _ = seen_tx.send(message);
                            }
                            _ => break,
                        },
                        _ = drop_rx.recv() => break,
                    }
                }
            }
        };
        let _ = ServerTransport::serve(listener, on_connect).await;
    });
    addr
}

struct Robot {
    addr: SocketAddr,
    push: broadcast::Sender<TungsteniteMessage>,
    seen: mpsc::UnboundedReceiver<TungsteniteMessage>,
    ready: mpsc::UnboundedReceiver<()>,
    drop_signal: broadcast::Sender<()>,
}

impl Robot {
    async fn start() -> Robot {
        let (push, _) = broadcast::channel(16);
        let (seen_tx, seen) = mpsc::unbounded_channel();
        let (ready_tx, ready) = mpsc::unbounded_channel();
        let (drop_signal, _) = broadcast::channel(4);
        let addr = spawn_robot(push.clone(), seen_tx, ready_tx, drop_signal.clone()).await;
        Robot { addr, push, seen, ready, drop_signal }
    }

    /// 等待下一个连接进入可推送状态。
    async fn wait_ready(&mut self) {
        timeout(WAIT, self.ready.recv()).await.expect("等待客户端连接超时").expect("模拟机器人已停止");
    }

    /// 等待第一条满足条件的入站消息。
    async fn expect<F>(&mut self, mut predicate: F) -> TungsteniteMessage
    where
        F: FnMut(&TungsteniteMessage) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let message = self.seen.recv().await.expect("模拟机器人已停止");
                if predicate(&message) {
                    return message;
                }
            }
        })
        .await
        .expect("等待客户端消息超时")
    }
}

async fn connected_service(robot: &mut Robot) -> RoombaService {
    let service = RoombaService::new(session_config(robot.addr));
    let mut states = service.start().await;
    timeout(WAIT, states.wait_for(|state| state.is_connected())).await.unwrap();
    robot.wait_ready().await;
    service
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 小帧更新传感器状态，大帧作为图像发布并更新帧率。
async fn test_inbound_frames_are_routed_by_size() {
    init_test_logger();
    let mut robot = Robot::start().await;
    let service = connected_service(&mut robot).await;

    let mut sensors = service.sensors().subscribe();
    let mut frames = service.frames().subscribe();
    let mut fps = service.fps().subscribe();

    robot.push.send(TungsteniteMessage::Binary(encode_frame(&[22, 0x0F, 0xA0, 7, 0x01]))).unwrap();
    let snapshot = timeout(WAIT, sensors.wait_for(|snapshot| snapshot.voltage == 4000)).await.unwrap().unwrap();
    assert!(snapshot.right_bumper_pressed());

    // 损坏的遥测帧被丢弃，快照保持不变
    let mut corrupted = encode_frame(&[22, 0x00, 0x01]);
    corrupted[3] ^= 0x10;
    robot.push.send(TungsteniteMessage::Binary(corrupted)).unwrap();

    for _ in 0..3 {
        robot.push.send(TungsteniteMessage::Binary(vec![0xD8; 1024])).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let image = timeout(WAIT, frames.wait_for(|frame| frame.is_some())).await.unwrap().flatten().unwrap();
    assert_eq!(image.len(), 1024);
    timeout(WAIT, fps.wait_for(|value| *value > 0.0)).await.unwrap();

    assert_eq!(service.sensors().current().voltage, 4000);
    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 电机循环按周期发送当前设定，吸尘速度同时驱动吸尘与滚刷通道。
async fn test_motor_loop_sends_current_settings() {
    init_test_logger();
    let mut robot = Robot::start().await;
    let service = connected_service(&mut robot).await;

    service.set_motor_speed(MotorChannel::Left, 100);
    service.set_motor_speed(MotorChannel::Right, -50);
    service.set_vacuum_speed(30);
    service.start_sending_motor_data();

    let frame = robot
        .expect(|message| matches!(message, TungsteniteMessage::Binary(bytes) if bytes.len() == 5 && bytes[0] == 100))
        .await;
    let TungsteniteMessage::Binary(bytes) = frame else { unreachable!() };
    assert_eq!(bytes, vec![100, 50, 30, 30, 0b0000_0010]);
    let motors = decode_motor_frame(&bytes, CommandLayout::MagnitudeDirection).unwrap();
    assert_eq!(motors.right.speed(), -50);

    // 持续发送
    robot.expect(|message| matches!(message, TungsteniteMessage::Binary(_))).await;

    service.stop_sending_motor_data();
    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 文本指令以单键 JSON 发送；视频流开关发送纯文本并维护状态。
async fn test_text_commands_and_stream_control() {
    init_test_logger();
    let mut robot = Robot::start().await;
    let service = connected_service(&mut robot).await;

    service.full_mode().await.unwrap();
    robot.expect(|message| *message == TungsteniteMessage::Text(r#"{"mode":1}"#.to_string())).await;

    service.play_song().await.unwrap();
    robot.expect(|message| *message == TungsteniteMessage::Text(r#"{"playSong":true}"#.to_string())).await;

    service.update_display("ABCD").await.unwrap();
    robot.expect(|message| *message == TungsteniteMessage::Text(r#"{"display":"ABCD"}"#.to_string())).await;

    service.start_stream().await.unwrap();
    robot.expect(|message| *message == TungsteniteMessage::Text("start".to_string())).await;
    assert!(service.is_streaming().current());

    // 再次开启为空操作
    service.start_stream().await.unwrap();

    service.stop_stream().await.unwrap();
    robot.expect(|message| *message == TungsteniteMessage::Text("stop".to_string())).await;
    assert!(!service.is_streaming().current());

    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 断线后视频流标志被重置；重新连上后电机循环自动恢复，传感器数据继续更新。
async fn test_reconnect_resets_stream_and_resumes_motor_loop() {
    init_test_logger();
    let mut robot = Robot::start().await;
    let service = connected_service(&mut robot).await;

    service.start_stream().await.unwrap();
    service.start_sending_motor_data();
    robot.expect(|message| matches!(message, TungsteniteMessage::Binary(_))).await;

    let mut states = service.connection_state().subscribe();
    let mut streaming = service.is_streaming().subscribe();
    robot.drop_signal.send(()).unwrap();

    timeout(WAIT, states.wait_for(|state| *state == ConnectionState::Disconnected)).await.unwrap();
    timeout(WAIT, streaming.wait_for(|value| !*value)).await.unwrap();
    timeout(WAIT, states.wait_for(|state| state.is_connected())).await.unwrap();
    assert!(service.reconnect_attempts() >= 1);

    // 清空断线前收到的消息，确认新连接上仍有电机指令
    while robot.seen.try_recv().is_ok() {}
    robot.expect(|message| matches!(message, TungsteniteMessage::Binary(bytes) if bytes.len() == 5)).await;

    robot.wait_ready().await;
    robot.push.send(TungsteniteMessage::Binary(encode_frame(&[24, 0x1E]))).unwrap();
    let mut sensors = service.sensors().subscribe();
    timeout(WAIT, sensors.wait_for(|snapshot| snapshot.temperature == 30)).await.unwrap();

    service.shutdown().await;
    assert_eq!(service.connection_state().current(), ConnectionState::Disconnected);
}
