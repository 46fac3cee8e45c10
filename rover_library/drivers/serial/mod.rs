//! Serial port drivers
//!
//! The drive-train controller (an Arduino on the reference robot) listens on a
//! UART for newline-terminated ASCII lines. Nothing is ever read back.
//!
//! # Available Drivers
//!
//! - `SimulationSerialDriver` - Always available, records everything written
//! - `SystemSerialDriver` - System serial port (requires `serial-hardware` feature)

mod simulation;

#[cfg(feature = "serial-hardware")]
mod system;

pub use simulation::{SerialTap, SimulationSerialDriver};

#[cfg(feature = "serial-hardware")]
pub use system::SystemSerialDriver;

use rover_core::{DriverStatus, RoverResult};
use serde::{Deserialize, Serialize};

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0")
    pub port: String,
    pub baud_rate: u32,
    /// Write timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout_ms: 1000,
        }
    }
}

/// Serial driver backend selection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SerialDriverBackend {
    #[default]
    Simulation,
    #[cfg(feature = "serial-hardware")]
    System,
}

/// Link to the motor controller
pub enum SerialDriver {
    Simulation(SimulationSerialDriver),
    #[cfg(feature = "serial-hardware")]
    System(SystemSerialDriver),
}

impl SerialDriver {
    pub fn new(backend: SerialDriverBackend, config: SerialConfig) -> RoverResult<Self> {
        match backend {
            SerialDriverBackend::Simulation => {
                Ok(Self::Simulation(SimulationSerialDriver::new(config)))
            }
            #[cfg(feature = "serial-hardware")]
            SerialDriverBackend::System => Ok(Self::System(SystemSerialDriver::new(config))),
        }
    }

    /// Simulated link on the default port
    pub fn simulation() -> Self {
        Self::Simulation(SimulationSerialDriver::new(SerialConfig::default()))
    }

    /// What a simulated link has received; `None` for real hardware
    pub fn tap(&self) -> Option<SerialTap> {
        match self {
            Self::Simulation(d) => Some(d.tap()),
            #[cfg(feature = "serial-hardware")]
            Self::System(_) => None,
        }
    }

    pub fn port(&self) -> &str {
        match self {
            Self::Simulation(d) => d.port(),
            #[cfg(feature = "serial-hardware")]
            Self::System(d) => d.port(),
        }
    }

    pub fn init(&mut self) -> RoverResult<()> {
        match self {
            Self::Simulation(d) => d.init(),
            #[cfg(feature = "serial-hardware")]
            Self::System(d) => d.init(),
        }
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        match self {
            Self::Simulation(d) => d.shutdown(),
            #[cfg(feature = "serial-hardware")]
            Self::System(d) => d.shutdown(),
        }
    }

    pub fn status(&self) -> DriverStatus {
        match self {
            Self::Simulation(d) => d.status(),
            #[cfg(feature = "serial-hardware")]
            Self::System(d) => d.status(),
        }
    }

    /// Write one complete line and wait until it has left the buffer.
    ///
    /// `line` carries its own terminator.
    pub fn send_line(&mut self, line: &str) -> RoverResult<()> {
        match self {
            Self::Simulation(d) => d.send(line.as_bytes()),
            #[cfg(feature = "serial-hardware")]
            Self::System(d) => d.send(line.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_link_records_lines() {
        let mut serial = SerialDriver::simulation();
        let tap = serial.tap().unwrap();
        assert_eq!(serial.port(), "/dev/ttyUSB0");

        assert!(serial.send_line("0,0,0,0\n").is_err());
        serial.init().unwrap();
        serial.send_line("1,250,0,250\n").unwrap();

        assert_eq!(tap.bytes(), b"1,250,0,250\n".to_vec());
        assert_eq!(serial.status(), DriverStatus::Running);
    }

    #[test]
    fn test_backend_selection_keeps_config() {
        let config = SerialConfig {
            port: "/dev/ttyACM1".to_string(),
            ..Default::default()
        };
        let serial = SerialDriver::new(SerialDriverBackend::Simulation, config).unwrap();
        assert_eq!(serial.port(), "/dev/ttyACM1");
        assert_eq!(serial.status(), DriverStatus::Uninitialized);
    }
}
