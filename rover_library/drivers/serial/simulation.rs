//! Simulation Serial driver

use std::sync::Arc;

use parking_lot::Mutex;
use rover_core::{DriverStatus, RoverError, RoverResult};

use super::SerialConfig;

/// Read side of a simulated port: everything written so far
#[derive(Debug, Clone, Default)]
pub struct SerialTap {
    tx: Arc<Mutex<Vec<u8>>>,
}

impl SerialTap {
    /// All bytes written since the driver was created
    pub fn bytes(&self) -> Vec<u8> {
        self.tx.lock().clone()
    }

    /// Written data as text lines (without the trailing newline)
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.tx.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.lock().is_empty()
    }
}

/// Simulation serial driver
///
/// Stands in for the motor controller link: writes are captured in a
/// [`SerialTap`] instead of reaching a UART.
pub struct SimulationSerialDriver {
    config: SerialConfig,
    status: DriverStatus,
    tap: SerialTap,
    /// Bytes transmitted (for statistics)
    bytes_tx: u64,
    fail_writes: bool,
}

impl SimulationSerialDriver {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            status: DriverStatus::Uninitialized,
            tap: SerialTap::default(),
            bytes_tx: 0,
            fail_writes: false,
        }
    }

    // ========================================================================
    // Lifecycle methods
    // ========================================================================

    pub fn init(&mut self) -> RoverResult<()> {
        self.bytes_tx = 0;
        self.status = DriverStatus::Ready;
        Ok(())
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    // ========================================================================
    // Bus methods
    // ========================================================================

    /// Record `data` as transmitted
    pub fn send(&mut self, data: &[u8]) -> RoverResult<()> {
        if !self.status.is_operational() {
            return Err(RoverError::driver("Driver not initialized"));
        }
        if self.fail_writes {
            self.status = DriverStatus::Error("write failed".to_string());
            return Err(RoverError::driver(format!(
                "Write to {} failed: simulated fault",
                self.config.port
            )));
        }
        self.status = DriverStatus::Running;
        self.tap.tx.lock().extend_from_slice(data);
        self.bytes_tx += data.len() as u64;
        Ok(())
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Get the configured port path
    pub fn port(&self) -> &str {
        &self.config.port
    }

    /// Get bytes transmitted
    pub fn bytes_transmitted(&self) -> u64 {
        self.bytes_tx
    }

    /// Handle for inspecting what was written
    pub fn tap(&self) -> SerialTap {
        self.tap.clone()
    }

    /// Make every following write fail (for testing)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl Default for SimulationSerialDriver {
    fn default() -> Self {
        Self::new(SerialConfig::default())
    }
}
