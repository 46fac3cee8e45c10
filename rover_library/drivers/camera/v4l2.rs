//! Video4Linux2 Camera driver
//!
//! Requires the `v4l2-backend` feature.

use std::io;
use std::path::{Path, PathBuf};

use image::RgbImage;
use rover_core::{DriverStatus, RoverError, RoverResult};
use v4l::buffer::Type;
use v4l::device::Handle;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;

use super::decode::{decode_frame, PixelFormat};
use super::{discard_backlog, CaptureConfig};

const STREAM_BUFFERS: u32 = 2;

/// V4L2 camera driver
pub struct V4l2CameraDriver {
    path: PathBuf,
    config: CaptureConfig,
    status: DriverStatus,
    format: PixelFormat,
    width: u32,
    height: u32,
    // Declared before `device` so the stream is dropped first
    stream: Option<Stream<'static>>,
    device: Option<v4l::Device>,
    frame_count: u64,
}

impl V4l2CameraDriver {
    pub fn new<P: Into<PathBuf>>(path: P, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            status: DriverStatus::Uninitialized,
            format: PixelFormat::Mjpeg,
            width: 0,
            height: 0,
            stream: None,
            device: None,
            frame_count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Lifecycle methods
    // ========================================================================

    pub fn init(&mut self) -> RoverResult<()> {
        let dev = v4l::Device::with_path(&self.path).map_err(|e| {
            RoverError::driver(format!("Failed to open {}: {}", self.path.display(), e))
        })?;

        let mut fmt = dev
            .format()
            .map_err(|e| RoverError::driver(format!("Failed to get format: {}", e)))?;
        fmt.width = self.config.width;
        fmt.height = self.config.height;
        fmt.fourcc = v4l::FourCC::new(PixelFormat::Mjpeg.fourcc());

        // The device may substitute its own size or format
        let actual = dev
            .set_format(&fmt)
            .map_err(|e| RoverError::driver(format!("Failed to set format: {}", e)))?;
        self.format = PixelFormat::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
            RoverError::driver(format!(
                "{} offers unsupported pixel format {}",
                self.path.display(),
                actual.fourcc
            ))
        })?;
        self.width = actual.width;
        self.height = actual.height;

        if self.config.fps > 0 {
            if let Err(e) = dev.set_params(&Parameters::with_fps(self.config.fps)) {
                log::warn!("{}: cannot set frame rate: {}", self.path.display(), e);
            }
        }

        let stream = Stream::with_buffers(&dev, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| RoverError::driver(format!("Failed to start stream: {}", e)))?;

        log::info!(
            "{}: streaming {}x{} {:?}",
            self.path.display(),
            self.width,
            self.height,
            self.format
        );
        self.stream = Some(stream);
        self.device = Some(dev);
        self.frame_count = 0;
        self.status = DriverStatus::Ready;
        Ok(())
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        self.stream = None;
        self.device = None;
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        probe(&self.path)
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    // ========================================================================
    // Sensor methods
    // ========================================================================

    /// Drop queued frames, then wait for the next one; `None` if it does
    /// not decode
    pub fn read_latest(&mut self) -> RoverResult<Option<RgbImage>> {
        let (stream, device) = match (self.stream.as_mut(), self.device.as_ref()) {
            (Some(stream), Some(device)) => (stream, device),
            _ => return Err(RoverError::driver("Camera not initialized")),
        };

        match next_fresh(stream, &device.handle()) {
            Ok((data, stale)) => {
                if stale > 0 {
                    log::trace!("{}: skipped {} queued frames", self.path.display(), stale);
                }
                self.status = DriverStatus::Running;
                self.frame_count += 1;
                Ok(decode_frame(self.format, &data, self.width, self.height))
            }
            Err(e) => {
                self.status = DriverStatus::Error(e.to_string());
                Err(RoverError::driver(format!(
                    "{}: capture failed: {}",
                    self.path.display(),
                    e
                )))
            }
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Discard what is already captured, then block for a new frame
fn next_fresh(stream: &mut Stream<'static>, handle: &Handle) -> io::Result<(Vec<u8>, usize)> {
    // `next` requeues the previous buffer, so only call it when a frame is ready
    let stale = discard_backlog(STREAM_BUFFERS as usize * 2, || {
        if handle.poll(libc::POLLIN, 0)? == 0 {
            return Ok(false);
        }
        stream.next()?;
        Ok(true)
    })?;

    let (buf, meta) = stream.next()?;
    let used = (meta.bytesused as usize).min(buf.len());
    let data = if used > 0 { &buf[..used] } else { buf };
    Ok((data.to_vec(), stale))
}

/// Open `path` and check that it is a capture node, then close it again
pub fn probe(path: &Path) -> bool {
    match v4l::Device::with_path(path) {
        Ok(dev) => dev
            .query_caps()
            .map(|caps| {
                caps.capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            })
            .unwrap_or(false),
        Err(_) => false,
    }
}
