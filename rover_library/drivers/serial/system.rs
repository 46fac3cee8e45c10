//! System serial port driver using serialport crate

use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;

use rover_core::{DriverStatus, RoverError, RoverResult};

use super::SerialConfig;

/// System serial port driver
///
/// 8N1, no flow control: the drive controller firmware expects exactly that.
pub struct SystemSerialDriver {
    config: SerialConfig,
    status: DriverStatus,
    port: Option<Box<dyn SerialPort + Send>>,
}

impl SystemSerialDriver {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            status: DriverStatus::Uninitialized,
            port: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.config.port
    }

    // ========================================================================
    // Lifecycle methods
    // ========================================================================

    pub fn init(&mut self) -> RoverResult<()> {
        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .open()
            .map_err(|e| {
                RoverError::driver(format!(
                    "Failed to open serial port {}: {}",
                    self.config.port, e
                ))
            })?;

        self.port = Some(port);
        self.status = DriverStatus::Ready;
        Ok(())
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        self.port = None;
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    // ========================================================================
    // Bus methods
    // ========================================================================

    /// Write `data` and flush it to the UART
    pub fn send(&mut self, data: &[u8]) -> RoverResult<()> {
        if !self.status.is_operational() {
            return Err(RoverError::driver("Driver not initialized"));
        }
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| RoverError::driver("Serial port not opened"))?;

        match port.write_all(data).and_then(|()| port.flush()) {
            Ok(()) => {
                self.status = DriverStatus::Running;
                Ok(())
            }
            Err(e) => {
                self.status = DriverStatus::Error(e.to_string());
                Err(RoverError::driver(format!(
                    "Write to {} failed: {}",
                    self.config.port, e
                )))
            }
        }
    }
}
