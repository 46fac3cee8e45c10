//! Nodes: the components that turn commands and frames into hardware action
//!
//! - `drive` - serial track drive
//! - `turret` - stepper axes and trigger via external programs
//! - `camera` - dual-camera capture and streaming

pub mod camera;
pub mod drive;
pub mod turret;

pub use camera::{
    CameraPipeline, CameraPipelineConfig, CameraSource, CaptureRig, FrameLink,
};
pub use drive::{drive_command, DriveController, DriveSignal};
pub use turret::{fire_command, turret_command, TurretConfig, TurretController};
