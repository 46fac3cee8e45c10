//! Camera drivers
//!
//! # Available Drivers
//!
//! - `SimulationCameraDriver` - Always available, generates synthetic images
//! - `V4l2CameraDriver` - Video4Linux2 camera (requires `v4l2-backend` feature)
//!
//! Device selection by USB topology lives in [`discovery`], buffer decoding
//! in [`decode`].

pub mod decode;
pub mod discovery;
mod simulation;

#[cfg(feature = "v4l2-backend")]
mod v4l2;

pub use decode::PixelFormat;
pub use discovery::{DeviceGroup, DiscoveryConfig};
pub use simulation::{OpenHandles, SimulationCameraConfig, SimulationCameraDriver};

#[cfg(feature = "v4l2-backend")]
pub use v4l2::{probe as probe_v4l2, V4l2CameraDriver};

use std::io;

use image::RgbImage;
use rover_core::{DriverStatus, RoverResult};
use serde::{Deserialize, Serialize};

/// Requested capture geometry for hardware cameras
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second, 0 leaves the device default
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Type-erased camera driver for runtime backend selection
pub enum CameraDriver {
    Simulation(SimulationCameraDriver),
    #[cfg(feature = "v4l2-backend")]
    V4l2(V4l2CameraDriver),
}

impl CameraDriver {
    /// Create a simulation driver (always available)
    pub fn simulation(config: SimulationCameraConfig) -> Self {
        Self::Simulation(SimulationCameraDriver::with_config(config))
    }

    #[cfg(feature = "v4l2-backend")]
    pub fn v4l2<P: Into<std::path::PathBuf>>(path: P, config: CaptureConfig) -> Self {
        Self::V4l2(V4l2CameraDriver::new(path, config))
    }

    // ========================================================================
    // Lifecycle methods
    // ========================================================================

    pub fn init(&mut self) -> RoverResult<()> {
        match self {
            Self::Simulation(d) => d.init(),
            #[cfg(feature = "v4l2-backend")]
            Self::V4l2(d) => d.init(),
        }
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        match self {
            Self::Simulation(d) => d.shutdown(),
            #[cfg(feature = "v4l2-backend")]
            Self::V4l2(d) => d.shutdown(),
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::Simulation(d) => d.is_available(),
            #[cfg(feature = "v4l2-backend")]
            Self::V4l2(d) => d.is_available(),
        }
    }

    pub fn status(&self) -> DriverStatus {
        match self {
            Self::Simulation(d) => d.status(),
            #[cfg(feature = "v4l2-backend")]
            Self::V4l2(d) => d.status(),
        }
    }

    // ========================================================================
    // Sensor methods
    // ========================================================================

    /// Next frame as RGB. `Ok(None)` is a corrupt frame the caller should
    /// skip; `Err` means the device is gone.
    pub fn read_latest(&mut self) -> RoverResult<Option<RgbImage>> {
        match self {
            Self::Simulation(d) => d.read_latest(),
            #[cfg(feature = "v4l2-backend")]
            Self::V4l2(d) => d.read_latest(),
        }
    }
}

/// Throw away frames the device already has waiting, up to `limit`.
///
/// `poll` dequeues one ready frame and returns `Ok(false)` once none is
/// ready. The next blocking read then returns a frame captured after this.
#[cfg_attr(not(feature = "v4l2-backend"), allow(dead_code))]
pub(crate) fn discard_backlog<F>(limit: usize, mut poll: F) -> io::Result<usize>
where
    F: FnMut() -> io::Result<bool>,
{
    let mut discarded = 0;
    while discarded < limit && poll()? {
        discarded += 1;
    }
    Ok(discarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_backlog_stops_when_queue_is_empty() {
        let mut waiting = 3;
        let discarded = discard_backlog(8, || {
            if waiting == 0 {
                return Ok(false);
            }
            waiting -= 1;
            Ok(true)
        })
        .unwrap();
        assert_eq!(discarded, 3);
        assert_eq!(waiting, 0);
    }

    #[test]
    fn test_discard_backlog_is_bounded() {
        let mut polls = 0;
        let discarded = discard_backlog(4, || {
            polls += 1;
            Ok(true)
        })
        .unwrap();
        assert_eq!(discarded, 4);
        assert_eq!(polls, 4);
    }

    #[test]
    fn test_discard_backlog_propagates_device_errors() {
        let err = discard_backlog(4, || Err(io::Error::new(io::ErrorKind::Other, "unplugged")))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
