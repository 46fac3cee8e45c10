//! Camera discovery by USB topology
//!
//! Video node numbers are not stable across boots and one physical camera
//! usually exposes several `/dev/video*` nodes (capture + metadata). Cameras
//! are therefore identified by the USB port they hang off, as printed by
//! `v4l2-ctl --list-devices`:
//!
//! ```text
//! USB 2.0 Camera: USB Camera (usb-5311000.usb-1):
//!         /dev/video1
//!         /dev/video2
//!         /dev/media0
//! ```
//!
//! Each role is configured with a substring of that title. The first node in
//! the matching block that passes an open/close probe wins.

use std::path::{Path, PathBuf};
use std::process::Command;

use rover_core::{RoverError, RoverResult};
use serde::{Deserialize, Serialize};

use crate::messages::CameraRole;

/// One block of the device listing: a title line and its device nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGroup {
    pub title: String,
    pub devices: Vec<PathBuf>,
}

/// How cameras are discovered and which USB port belongs to which role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Device listing command and its arguments
    pub lister: Vec<String>,
    /// Topology substring identifying the front camera
    pub front: String,
    /// Topology substring identifying the turret camera
    pub turret: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            lister: vec!["v4l2-ctl".to_string(), "--list-devices".to_string()],
            front: "usb-5311000.usb-1".to_string(),
            turret: "usb-5310000.usb-1".to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn topology(&self, role: CameraRole) -> &str {
        match role {
            CameraRole::Front => &self.front,
            CameraRole::Turret => &self.turret,
        }
    }

    /// Run the listing command and parse its output
    pub fn list_devices(&self) -> RoverResult<Vec<DeviceGroup>> {
        let (program, args) = self
            .lister
            .split_first()
            .ok_or_else(|| RoverError::config("camera lister command is empty"))?;

        let output = Command::new(program).args(args).output().map_err(|e| {
            RoverError::CommandFailed(format!("{}: {}", self.lister.join(" "), e))
        })?;

        // v4l2-ctl exits non-zero when some nodes cannot be queried but still
        // prints the usable blocks, so only an empty listing is an error.
        let text = String::from_utf8_lossy(&output.stdout);
        let groups = parse_device_list(&text);
        if groups.is_empty() && !output.status.success() {
            return Err(RoverError::CommandFailed(format!(
                "{} exited with {}: {}",
                self.lister.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(groups)
    }
}

/// Parse grouped "title line, then indented device lines" output
pub fn parse_device_list(text: &str) -> Vec<DeviceGroup> {
    let mut groups: Vec<DeviceGroup> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            if let Some(group) = groups.last_mut() {
                group.devices.push(PathBuf::from(line.trim()));
            }
        } else {
            groups.push(DeviceGroup {
                title: line.trim().trim_end_matches(':').to_string(),
                devices: Vec::new(),
            });
        }
    }

    groups
}

/// Whether a node is a video node (as opposed to `/dev/media*` etc.)
pub fn is_video_node(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("video"))
        .unwrap_or(false)
}

/// First video node under a group whose title contains `topology` and that
/// passes `probe`
pub fn resolve_device<F>(groups: &[DeviceGroup], topology: &str, mut probe: F) -> Option<PathBuf>
where
    F: FnMut(&Path) -> bool,
{
    if topology.is_empty() {
        return None;
    }
    groups
        .iter()
        .filter(|g| g.title.contains(topology))
        .flat_map(|g| g.devices.iter())
        .filter(|path| is_video_node(path))
        .find(|path| probe(path))
        .cloned()
}
