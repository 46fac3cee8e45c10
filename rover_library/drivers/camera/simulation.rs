//! Simulation Camera driver
//!
//! Always-available driver that generates synthetic RGB frames.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use rover_core::{DriverStatus, RoverError, RoverResult};

/// Count of simulated device handles currently open
///
/// Shared by every driver built from the same config, so a test can check
/// that a pipeline released its devices.
#[derive(Debug, Clone, Default)]
pub struct OpenHandles(Arc<AtomicUsize>);

impl OpenHandles {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Simulation camera configuration
#[derive(Debug, Clone)]
pub struct SimulationCameraConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Frame rate in Hz; reads are paced to it
    pub fps: f32,
    /// Fail `init` (device cannot be opened)
    pub fail_open: bool,
    /// Return a device error after this many frames
    pub fail_after: Option<u64>,
    /// Every Nth frame is delivered corrupt (`None`)
    pub corrupt_every: Option<u64>,
    /// Solid colour instead of the moving gradient
    pub fill: Option<[u8; 3]>,
    /// Open handle accounting
    pub handles: OpenHandles,
}

impl Default for SimulationCameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30.0,
            fail_open: false,
            fail_after: None,
            corrupt_every: None,
            fill: None,
            handles: OpenHandles::default(),
        }
    }
}

/// Simulation camera driver
pub struct SimulationCameraDriver {
    config: SimulationCameraConfig,
    status: DriverStatus,
    frame_count: u64,
    last_frame: Option<Instant>,
    open: bool,
}

impl SimulationCameraDriver {
    /// Create a new simulation camera driver
    pub fn new() -> Self {
        Self::with_config(SimulationCameraConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: SimulationCameraConfig) -> Self {
        Self {
            config,
            status: DriverStatus::Uninitialized,
            frame_count: 0,
            last_frame: None,
            open: false,
        }
    }

    /// Initialize the driver
    pub fn init(&mut self) -> RoverResult<()> {
        if self.config.fail_open {
            self.status = DriverStatus::Error("open failed".to_string());
            return Err(RoverError::driver("Simulated camera refused to open"));
        }
        if !self.open {
            self.config.handles.0.fetch_add(1, Ordering::SeqCst);
            self.open = true;
        }
        self.frame_count = 0;
        self.last_frame = None;
        self.status = DriverStatus::Ready;
        Ok(())
    }

    /// Shutdown the driver
    pub fn shutdown(&mut self) -> RoverResult<()> {
        if self.open {
            self.config.handles.0.fetch_sub(1, Ordering::SeqCst);
            self.open = false;
        }
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    /// Check if driver is available
    pub fn is_available(&self) -> bool {
        !self.config.fail_open
    }

    /// Get driver status
    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    /// Read the next frame; `None` for a corrupt frame
    pub fn read_latest(&mut self) -> RoverResult<Option<RgbImage>> {
        if !self.status.is_operational() {
            return Err(RoverError::driver("Driver not initialized"));
        }
        if let Some(limit) = self.config.fail_after {
            if self.frame_count >= limit {
                self.status = DriverStatus::Error("device lost".to_string());
                return Err(RoverError::driver("Simulated camera disconnected"));
            }
        }
        self.pace();
        self.status = DriverStatus::Running;
        self.frame_count += 1;

        if let Some(n) = self.config.corrupt_every {
            if n > 0 && self.frame_count % n == 0 {
                return Ok(None);
            }
        }
        Ok(Some(self.generate_image()))
    }

    /// Frames produced since `init`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn pace(&mut self) {
        if self.config.fps > 0.0 {
            let period = Duration::from_secs_f32(1.0 / self.config.fps);
            if let Some(last) = self.last_frame {
                let elapsed = last.elapsed();
                if elapsed < period {
                    thread::sleep(period - elapsed);
                }
            }
        }
        self.last_frame = Some(Instant::now());
    }

    fn generate_image(&self) -> RgbImage {
        if let Some(rgb) = self.config.fill {
            return RgbImage::from_pixel(self.config.width, self.config.height, Rgb(rgb));
        }
        // Moving diagonal gradient so consecutive frames differ
        let shift = (self.frame_count * 4) as u32;
        RgbImage::from_fn(self.config.width, self.config.height, |x, y| {
            let v = ((x + y + shift) % 256) as u8;
            Rgb([v, v.wrapping_add(85), v.wrapping_add(170)])
        })
    }
}

impl Default for SimulationCameraDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulationCameraDriver {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> SimulationCameraConfig {
        SimulationCameraConfig {
            width: 64,
            height: 48,
            fps: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_driver_lifecycle() {
        let config = fast();
        let handles = config.handles.clone();
        let mut driver = SimulationCameraDriver::with_config(config);

        assert_eq!(driver.status(), DriverStatus::Uninitialized);
        assert!(driver.read_latest().is_err());

        driver.init().unwrap();
        assert_eq!(handles.count(), 1);

        let frame = driver.read_latest().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(driver.status(), DriverStatus::Running);

        driver.shutdown().unwrap();
        assert_eq!(handles.count(), 0);
        assert_eq!(driver.status(), DriverStatus::Shutdown);
    }

    #[test]
    fn test_fault_injection() {
        let mut driver = SimulationCameraDriver::with_config(SimulationCameraConfig {
            fail_after: Some(3),
            corrupt_every: Some(2),
            ..fast()
        });
        driver.init().unwrap();

        assert!(driver.read_latest().unwrap().is_some());
        assert!(driver.read_latest().unwrap().is_none());
        assert!(driver.read_latest().unwrap().is_some());
        assert!(driver.read_latest().is_err());
    }

    #[test]
    fn test_fill_gives_uniform_frames() {
        let mut driver = SimulationCameraDriver::with_config(SimulationCameraConfig {
            fill: Some([10, 20, 30]),
            ..fast()
        });
        driver.init().unwrap();

        let frame = driver.read_latest().unwrap().unwrap();
        assert!(frame.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn test_drop_releases_handle() {
        let config = fast();
        let handles = config.handles.clone();
        {
            let mut driver = SimulationCameraDriver::with_config(config);
            driver.init().unwrap();
            assert_eq!(handles.count(), 1);
        }
        assert_eq!(handles.count(), 0);
    }
}
