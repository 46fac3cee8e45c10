// Full session against an in-process WebSocket broker

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rover_agent::session::{self, SessionEnd};
use rover_agent::CommandDispatcher;
use rover_core::SettingsStore;
use rover_library::drivers::serial::SerialTap;
use rover_library::{
    CameraPipeline, CameraPipelineConfig, CameraSource, DriveController, FrameLink, FrameMessage,
    OpenHandles, ProcessConfig, SerialDriver, SimulationCameraConfig, TurretConfig,
    TurretController,
};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

fn dispatcher(dir: &std::path::Path) -> (CommandDispatcher, SerialTap, OpenHandles) {
    let settings = Arc::new(SettingsStore::open(dir.join("settings.json")));

    let serial = SerialDriver::simulation();
    let tap = serial.tap().unwrap();
    let drive = DriveController::new(serial, Arc::clone(&settings));
    drive.init().unwrap();

    let idle = ProcessConfig::new("/nonexistent/actuator");
    let turret = TurretController::new(
        TurretConfig {
            pan: idle.clone(),
            tilt: idle.clone(),
            fire: idle,
        },
        Arc::clone(&settings),
    );

    let camera_config = SimulationCameraConfig {
        width: 64,
        height: 48,
        fps: 100.0,
        ..Default::default()
    };
    let handles = camera_config.handles.clone();
    let camera = CameraPipeline::new(
        CameraSource::simulation(camera_config),
        CameraPipelineConfig::default(),
        Arc::clone(&settings),
    );

    (
        CommandDispatcher::new(settings, drive, turret, camera, FrameLink::new(8)),
        tap,
        handles,
    )
}

#[tokio::test]
async fn test_commands_in_frames_out_until_close() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, tap, cameras) = dispatcher(dir.path());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        ws.send(Message::Text(r#"{"command":"left"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"command":"camera_on"}"#.to_string()))
            .await
            .unwrap();

        let mut frame = None;
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let parsed: FrameMessage = serde_json::from_str(&text).unwrap();
                if !parsed.is_cleared() {
                    frame = Some(parsed);
                    break;
                }
            }
        }
        ws.close(None).await.unwrap();
        frame
    });

    let url = format!("ws://{}/ws/control/", addr);
    let ws = session::connect(&url).await.unwrap();
    let end = tokio::time::timeout(
        Duration::from_secs(10),
        session::run(ws, &dispatcher, dispatcher.link()),
    )
    .await
    .expect("session did not end")
    .unwrap();

    assert_eq!(end, SessionEnd::Closed(None));
    assert_eq!(tap.lines(), vec!["0,250,0,250"]);

    let frame = broker.await.unwrap().expect("no frame received");
    assert!(!frame.image_front.is_empty());
    assert!(!frame.image_turret.is_empty());

    dispatcher.shutdown();
    assert_eq!(cameras.count(), 0);
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let err = session::connect(&format!("ws://{}/", addr)).await.unwrap_err();
    assert!(matches!(err, rover_core::RoverError::Communication(_)));
}
