//! Inbound message dispatch
//!
//! Every text frame from the broker goes through [`CommandDispatcher::handle_text`].
//! A settings push replaces the stored settings and nothing else happens for
//! that message. Otherwise the `command` field selects exactly one action.
//! Anything unrecognized is dropped; the broker never gets a negative ack.

use std::sync::Arc;

use rover_core::{LogSummary, RoverError, Settings, SettingsStore};
use rover_library::{
    CameraPipeline, Command, DriveController, FrameLink, InboundMessage, TurretController,
};
use tracing::{debug, info, warn};

/// What a message turned into
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Settings were replaced
    Settings,
    /// A command was executed (or attempted)
    Command(Command),
    /// Malformed or unknown, dropped
    Ignored,
}

/// Routes inbound messages to the settings store and the actuator nodes
pub struct CommandDispatcher {
    settings: Arc<SettingsStore>,
    drive: DriveController,
    turret: TurretController,
    camera: CameraPipeline,
    link: FrameLink,
}

impl CommandDispatcher {
    pub fn new(
        settings: Arc<SettingsStore>,
        drive: DriveController,
        turret: TurretController,
        camera: CameraPipeline,
        link: FrameLink,
    ) -> Self {
        Self {
            settings,
            drive,
            turret,
            camera,
            link,
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn camera(&self) -> &CameraPipeline {
        &self.camera
    }

    pub fn turret(&self) -> &TurretController {
        &self.turret
    }

    pub fn drive(&self) -> &DriveController {
        &self.drive
    }

    /// The link the capture worker sends frames on
    pub fn link(&self) -> &FrameLink {
        &self.link
    }

    /// Handle one inbound text frame
    pub fn handle_text(&self, text: &str) -> Dispatch {
        match InboundMessage::parse(text) {
            Ok(msg) => {
                debug!("inbound {}", msg.log_summary());
                self.handle(msg)
            }
            Err(e) => {
                debug!("dropping inbound message: {}", e);
                Dispatch::Ignored
            }
        }
    }

    pub fn handle(&self, msg: InboundMessage) -> Dispatch {
        match msg {
            InboundMessage::SettingsUpdate(data) => {
                let settings = Settings::from_map(&data);
                match self.settings.replace(settings) {
                    Ok(()) => info!("settings updated"),
                    Err(e) => warn!("settings applied but not persisted: {}", e),
                }
                Dispatch::Settings
            }
            InboundMessage::Command(cmd) => {
                self.execute(cmd);
                Dispatch::Command(cmd)
            }
        }
    }

    fn execute(&self, cmd: Command) {
        match cmd {
            Command::CameraOn => match self.camera.start(&self.link) {
                Ok(true) => info!("camera streaming started"),
                Ok(false) => debug!("camera already streaming"),
                Err(e) => warn!("camera start failed: {}", e),
            },
            Command::CameraOff => self.camera.stop(Some(&self.link)),
            Command::Drive(drive) => {
                if let Err(e) = self.drive.execute(drive) {
                    warn!("drive '{}' failed: {}", drive.as_str(), e);
                }
            }
            Command::Turret(axis, direction) => {
                report_actuation(cmd, self.turret.step(axis, direction));
            }
            Command::Fire => report_actuation(cmd, self.turret.fire()),
        }
    }

    /// Stop streaming and release hardware
    pub fn shutdown(&self) {
        self.camera.stop(None);
        if let Err(e) = self.drive.shutdown() {
            warn!("serial shutdown failed: {}", e);
        }
    }
}

fn report_actuation(cmd: Command, result: Result<(), RoverError>) {
    match result {
        Ok(()) => debug!("{} launched", cmd.name()),
        Err(e) if e.is_busy() => info!("{} dropped: {}", cmd.name(), e),
        Err(e) => warn!("{} failed: {}", cmd.name(), e),
    }
}
