//! # ROVER Library
//!
//! Drivers, protocol messages and nodes for the ROVER remote-control agent.
//!
//! ## Structure
//!
//! ```text
//! rover_library/
//! ── messages/       # Inbound commands, outbound frame envelopes
//! ── drivers/        # Serial, camera and external-process drivers
//! ── nodes/          # Drive, turret and camera pipeline
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rover_library::{CameraPipeline, CameraSource, DriveController, InboundMessage};
//!
//! let msg = InboundMessage::parse(r#"{"command":"go"}"#)?;
//! ```

pub mod drivers;
pub mod messages;
pub mod nodes;

// Re-export core traits needed for message types
pub use rover_core::LogSummary;

// Re-export message types at the crate root for convenience
pub use messages::*;

// Serial
#[cfg(feature = "serial-hardware")]
pub use drivers::SystemSerialDriver;
pub use drivers::{SerialConfig, SerialDriver, SerialDriverBackend, SimulationSerialDriver};

// Camera
#[cfg(feature = "v4l2-backend")]
pub use drivers::V4l2CameraDriver;
pub use drivers::{
    CameraDriver, CaptureConfig, DiscoveryConfig, OpenHandles, SimulationCameraConfig,
    SimulationCameraDriver,
};

// External actuators
pub use drivers::{ProcessActuator, ProcessConfig};

// Nodes
pub use nodes::{
    CameraPipeline, CameraPipelineConfig, CameraSource, DriveController, DriveSignal, FrameLink,
    TurretConfig, TurretController,
};
