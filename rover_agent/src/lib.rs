//! # ROVER Agent
//!
//! Wires the settings store, the drive and turret nodes and the camera
//! pipeline behind a [`CommandDispatcher`], and connects it to the broker.

pub mod config;
pub mod dispatcher;
pub mod session;

use std::sync::Arc;

use rover_core::{RoverResult, SettingsStore};
use rover_library::{
    CameraPipeline, CameraSource, DriveController, FrameLink, SerialDriver, SerialDriverBackend,
    SimulationCameraConfig, TurretController,
};
use tracing::{error, info};

pub use config::AgentConfig;
pub use dispatcher::{CommandDispatcher, Dispatch};
pub use session::SessionEnd;

/// The assembled agent
pub struct Agent {
    config: AgentConfig,
    dispatcher: CommandDispatcher,
}

impl Agent {
    /// Build every component from `config`.
    ///
    /// Hardware that fails to open is logged and left closed; commands that
    /// need it report the failure when they run.
    pub fn new(config: AgentConfig) -> RoverResult<Self> {
        let settings = Arc::new(SettingsStore::open(&config.settings.path));
        info!("settings loaded from {}", settings.path().display());

        let link = FrameLink::new(config.broker.outbound_capacity);

        let drive = DriveController::new(serial_driver(&config)?, Arc::clone(&settings));
        if let Err(e) = drive.init() {
            error!("serial link unavailable: {}", e);
        }

        let turret = TurretController::new(config.actuators.turret_config(), Arc::clone(&settings));
        let camera = CameraPipeline::new(
            camera_source(&config),
            config.camera.pipeline.clone(),
            Arc::clone(&settings),
        );

        let dispatcher = CommandDispatcher::new(settings, drive, turret, camera, link);
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Run one broker session to its end, then release the hardware
    pub async fn run(&self) -> RoverResult<SessionEnd> {
        let endpoint = self.config.broker.endpoint()?;
        let result = session::serve(&endpoint, &self.dispatcher).await;
        self.dispatcher.shutdown();
        result
    }
}

fn serial_driver(config: &AgentConfig) -> RoverResult<SerialDriver> {
    if config.simulate {
        return SerialDriver::new(SerialDriverBackend::Simulation, config.serial.clone());
    }
    #[cfg(feature = "serial-hardware")]
    {
        SerialDriver::new(SerialDriverBackend::System, config.serial.clone())
    }
    #[cfg(not(feature = "serial-hardware"))]
    {
        tracing::warn!("built without serial-hardware, using the simulated serial link");
        SerialDriver::new(SerialDriverBackend::Simulation, config.serial.clone())
    }
}

fn camera_source(config: &AgentConfig) -> CameraSource {
    let simulated = || {
        CameraSource::simulation(SimulationCameraConfig {
            width: config.camera.capture.width,
            height: config.camera.capture.height,
            fps: config.camera.capture.fps as f32,
            ..Default::default()
        })
    };
    if config.simulate {
        return simulated();
    }
    #[cfg(feature = "v4l2-backend")]
    {
        CameraSource::V4l2 {
            discovery: config.camera.discovery.clone(),
            capture: config.camera.capture.clone(),
        }
    }
    #[cfg(not(feature = "v4l2-backend"))]
    {
        tracing::warn!("built without v4l2-backend, using simulated cameras");
        simulated()
    }
}
