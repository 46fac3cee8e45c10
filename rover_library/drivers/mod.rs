//! Hardware drivers for the ROVER agent
//!
//! # Architecture
//!
//! ```text
//! Nodes (rover_library/nodes/)
//!   │
//!   └── Drivers (this module)
//!           ├── Simulation drivers (always available)
//!           └── Hardware drivers (feature-gated)
//! ```
//!
//! # Available Driver Categories
//!
//! - `camera` - USB cameras, discovered by USB topology
//! - `serial` - Serial port (UART) to the drive-train controller
//! - `process` - External single-shot actuator programs (turret, fire)

pub mod camera;
pub mod process;
pub mod serial;

// ============================================================================
// Camera Drivers
// ============================================================================
pub use camera::{
    CameraDriver, CaptureConfig, DiscoveryConfig, OpenHandles, SimulationCameraConfig,
    SimulationCameraDriver,
};

#[cfg(feature = "v4l2-backend")]
pub use camera::V4l2CameraDriver;

// ============================================================================
// Serial Drivers
// ============================================================================
pub use serial::{SerialConfig, SerialDriver, SerialDriverBackend, SimulationSerialDriver};

#[cfg(feature = "serial-hardware")]
pub use serial::SystemSerialDriver;

// ============================================================================
// Process Actuators
// ============================================================================
pub use process::{ProcessActuator, ProcessConfig};
