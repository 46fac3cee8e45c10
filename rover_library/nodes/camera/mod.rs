//! Camera Node - dual-camera capture and streaming
//!
//! A capture worker runs on its own thread and owns every opened camera
//! (the [`CaptureRig`]). Each iteration pulls one frame per camera; every
//! Nth complete pair is rendered to base64 JPEG and scheduled on the
//! session's [`FrameLink`]. The worker never touches the network.
//!
//! Lifecycle:
//!
//! - `start` opens the cameras and launches the worker. It does nothing while
//!   a worker is already running, and reaps a worker that died on its own.
//! - `stop` stops and joins the worker. Dropping the rig closes the devices.
//!   With a link it also schedules one cleared message so the panel blanks.

pub mod transform;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use image::RgbImage;
use parking_lot::Mutex;
use rover_core::{OutboundLink, RoverError, RoverResult, SettingsStore};
use serde::{Deserialize, Serialize};

use crate::drivers::camera::{CameraDriver, SimulationCameraConfig};
use crate::messages::{CameraRole, FrameMessage};

#[cfg(feature = "v4l2-backend")]
use crate::drivers::camera::{discovery, probe_v4l2, CaptureConfig, DiscoveryConfig};

/// Outbound queue the capture worker schedules frames on
pub type FrameLink = OutboundLink<FrameMessage>;

/// Throughput and quality knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPipelineConfig {
    /// Send one of every `frame_skip` decoded frame pairs
    pub frame_skip: u32,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
}

impl Default for CameraPipelineConfig {
    fn default() -> Self {
        Self {
            frame_skip: 3,
            jpeg_quality: 30,
        }
    }
}

/// Where cameras come from
#[derive(Debug, Clone)]
pub enum CameraSource {
    /// Synthetic cameras for the listed roles
    Simulation {
        roles: Vec<CameraRole>,
        config: SimulationCameraConfig,
    },
    /// V4L2 devices found by USB topology
    #[cfg(feature = "v4l2-backend")]
    V4l2 {
        discovery: DiscoveryConfig,
        capture: CaptureConfig,
    },
}

impl CameraSource {
    /// Both roles, simulated
    pub fn simulation(config: SimulationCameraConfig) -> Self {
        Self::Simulation {
            roles: CameraRole::ALL.to_vec(),
            config,
        }
    }

    /// Resolve and open a camera per role. Roles that cannot be resolved or
    /// opened are left out; having none at all is an error.
    pub fn open(&self) -> RoverResult<CaptureRig> {
        let mut rig = CaptureRig::default();

        match self {
            Self::Simulation { roles, config } => {
                for role in roles {
                    rig.attach(*role, CameraDriver::simulation(config.clone()));
                }
            }
            #[cfg(feature = "v4l2-backend")]
            Self::V4l2 { discovery: disc, capture } => {
                let groups = disc.list_devices()?;
                for role in CameraRole::ALL {
                    match discovery::resolve_device(&groups, disc.topology(role), probe_v4l2) {
                        Some(path) => {
                            log::info!("{} camera resolved to {}", role, path.display());
                            rig.attach(role, CameraDriver::v4l2(path, capture.clone()));
                        }
                        None => log::warn!(
                            "{} camera not found (topology '{}')",
                            role,
                            disc.topology(role)
                        ),
                    }
                }
            }
        }

        if rig.is_empty() {
            return Err(RoverError::camera("all", "no camera could be opened"));
        }
        Ok(rig)
    }
}

/// The set of opened cameras, one per resolved role
///
/// Dropping the rig shuts every driver down.
#[derive(Default)]
pub struct CaptureRig {
    cameras: Vec<(CameraRole, CameraDriver)>,
}

impl CaptureRig {
    fn attach(&mut self, role: CameraRole, mut driver: CameraDriver) {
        match driver.init() {
            Ok(()) => self.cameras.push((role, driver)),
            Err(e) => log::warn!("{} camera failed to open: {}", role, e),
        }
    }

    pub fn roles(&self) -> Vec<CameraRole> {
        self.cameras.iter().map(|(role, _)| *role).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Pull one frame from every camera.
    ///
    /// `Ok(None)` if any of them delivered a corrupt frame; every camera is
    /// still read so none of them falls behind.
    pub fn grab(&mut self) -> RoverResult<Option<Vec<(CameraRole, RgbImage)>>> {
        let mut frames = Vec::with_capacity(self.cameras.len());
        let mut complete = true;

        for (role, driver) in self.cameras.iter_mut() {
            match driver.read_latest() {
                Ok(Some(frame)) => frames.push((*role, frame)),
                Ok(None) => {
                    log::debug!("{} camera: corrupt frame", role);
                    complete = false;
                }
                Err(e) => return Err(RoverError::camera(role.as_str(), e.to_string())),
            }
        }

        Ok(complete.then_some(frames))
    }

    fn close(&mut self) {
        for (role, mut driver) in self.cameras.drain(..) {
            if let Err(e) = driver.shutdown() {
                log::warn!("{} camera: close failed: {}", role, e);
            }
        }
    }
}

impl Drop for CaptureRig {
    fn drop(&mut self) {
        self.close();
    }
}

/// Dual-camera streaming pipeline
pub struct CameraPipeline {
    source: CameraSource,
    config: CameraPipelineConfig,
    settings: Arc<SettingsStore>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CameraPipeline {
    pub fn new(source: CameraSource, config: CameraPipelineConfig, settings: Arc<SettingsStore>) -> Self {
        Self {
            source,
            config,
            settings,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CameraPipelineConfig {
        &self.config
    }

    /// True while a capture worker is alive
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Open the cameras and start streaming onto `link`.
    ///
    /// Returns `Ok(false)` if a worker is already running.
    pub fn start(&self, link: &FrameLink) -> RoverResult<bool> {
        let mut worker = self.worker.lock();

        if let Some(handle) = worker.take() {
            if !handle.is_finished() {
                *worker = Some(handle);
                log::debug!("camera pipeline already running");
                return Ok(false);
            }
            // Ended on its own after a device error
            if handle.join().is_err() {
                log::error!("camera worker panicked");
            }
        }

        let rig = self.source.open()?;
        log::info!("camera pipeline starting with {:?}", rig.roles());

        self.running.store(true, Ordering::Release);
        let job = CaptureJob {
            rig,
            link: link.clone(),
            settings: Arc::clone(&self.settings),
            config: self.config.clone(),
            running: Arc::clone(&self.running),
        };
        let handle = thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || job.run())
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                RoverError::Internal(format!("failed to spawn capture thread: {}", e))
            })?;

        *worker = Some(handle);
        Ok(true)
    }

    /// Stop streaming and release the cameras. Blocks until the worker exits.
    ///
    /// With a link, exactly one cleared message is scheduled afterwards.
    pub fn stop(&self, link: Option<&FrameLink>) {
        self.running.store(false, Ordering::Release);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("camera worker panicked");
            }
            log::info!("camera pipeline stopped");
        }

        if let Some(link) = link {
            link.schedule(FrameMessage::cleared());
        }
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        self.stop(None);
    }
}

/// Everything the worker thread owns
struct CaptureJob {
    rig: CaptureRig,
    link: FrameLink,
    settings: Arc<SettingsStore>,
    config: CameraPipelineConfig,
    running: Arc<AtomicBool>,
}

impl CaptureJob {
    fn run(mut self) {
        let skip = u64::from(self.config.frame_skip.max(1));
        let mut pairs: u64 = 0;

        while self.running.load(Ordering::Acquire) {
            let frames = match self.rig.grab() {
                Ok(Some(frames)) => frames,
                Ok(None) => continue,
                Err(e) => {
                    log::error!("capture stopped: {}", e);
                    break;
                }
            };

            pairs += 1;
            if pairs % skip != 0 {
                continue;
            }

            match self.render(&frames) {
                Ok(msg) => {
                    if self.link.schedule(msg) {
                        log::debug!("outbound queue full, oldest frame dropped");
                    }
                }
                Err(e) => log::warn!("frame dropped: {}", e),
            }
        }

        self.running.store(false, Ordering::Release);
        self.rig.close();
        log::debug!("capture worker exiting after {} frame pairs", pairs);
    }

    fn render(&self, frames: &[(CameraRole, RgbImage)]) -> RoverResult<FrameMessage> {
        let settings = self.settings.snapshot();
        let mut msg = FrameMessage::default();

        for (role, frame) in frames {
            let mark = match role {
                CameraRole::Turret => Some((settings.turret_mark_x, settings.turret_mark_y)),
                CameraRole::Front => None,
            };
            let encoded = transform::render(frame, mark, self.config.jpeg_quality)
                .map_err(|e| RoverError::camera(role.as_str(), e.to_string()))?;
            msg.set(*role, encoded);
        }
        Ok(msg)
    }
}
