// roomba_remote/src/main.rs

//! 无界面的遥控客户端入口。
//!
//! 加载配置并连接机器人，连上后请求传感器推送，持续发送电机指令（无输入设备时即为静止指令），
//! 并把连接状态、传感器和帧率变化写入日志。按 Ctrl-C 主动断开并退出。
//!
//! 用法: `roomba-remote [ws://机器人地址/ws]`

use anyhow::Context;
use log::{debug, info, warn};
use roomba_models::ConnectionState;
use roomba_remote::config::{default_config_path, AppConfig};
use roomba_remote::RoombaService;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    info!("[主程序] 遥控客户端正在启动...");

    let config_path = default_config_path();
    let mut config = AppConfig::load_or_create(&config_path);
    config.apply_url_override(env::args().nth(1));
    info!("[主程序] 机器人地址: {}", config.connection.robot_url);

    let service = RoombaService::new(config);

    let mut sensors = service.sensors().subscribe();
    let sensor_task = tokio::spawn(async move {
        let mut hazard = false;
        while let Some(snapshot) = sensors.next().await {
            debug!("[主程序] 传感器数据:\n{}", snapshot);
            let detected = snapshot.any_cliff_detected() || snapshot.any_bumper_pressed();
            if detected && !hazard {
                warn!("[主程序] 检测到悬崖或碰撞:\n{}", snapshot);
            }
            hazard = detected;
        }
    });

    let mut fps = service.fps().subscribe();
    let fps_task = tokio::spawn(async move {
        while let Some(value) = fps.next().await {
            debug!("[主程序] 视频帧率: {:.1} fps", value);
        }
    });

    let mut states = service.start().await;
    service.start_sending_motor_data();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            state = states.next() => match state {
                Some(ConnectionState::Connected) => {
                    if let Err(e) = service.stream_sensors(true).await {
                        warn!("[主程序] 请求传感器推送失败: {}", e);
                    }
                }
                Some(other) => info!("[主程序] 连接状态: {}", other),
                None => break,
            },
            result = &mut shutdown => {
                result.context("监听 Ctrl-C 信号失败")?;
                info!("[主程序] 收到 Ctrl-C，正在退出...");
                break;
            }
        }
    }

    service.shutdown().await;
    sensor_task.abort();
    fps_task.abort();
    info!("[主程序] 已退出。");
    Ok(())
}
