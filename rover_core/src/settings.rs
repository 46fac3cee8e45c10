//! Operator-tunable settings and their on-disk store
//!
//! Settings are a flat key -> number blob pushed by the control panel
//! (`settings_update` messages) and persisted next to the agent. Readers
//! (drive dispatch, turret dispatch, the camera worker) take an immutable
//! `Arc<Settings>` snapshot; a replace swaps the whole snapshot, so a
//! reader never observes half of an update.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RoverError, RoverResult};

/// Default settings file name, relative to the agent working directory
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Numeric parameters shared by the actuator and camera components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Drive speed for `go`
    pub step_time_go: f64,
    /// Drive speed for `back`
    pub step_time_back: f64,
    /// Drive speed for `left` / `right`
    pub step_time_turn: f64,
    /// Left track calibration factor
    pub engine_left_calib: f64,
    /// Right track calibration factor
    pub engine_right_calib: f64,
    /// Turret axis 1 (pan) step period in microseconds
    pub step_time_turret: f64,
    /// Turret axis 1 step count per command
    pub steps_turret: u32,
    /// Turret axis 2 (tilt) step period in microseconds
    pub step_time_turret2: f64,
    /// Turret axis 2 step count per command
    pub steps_turret2: u32,
    /// Aim mark x, in downscaled turret image pixels
    pub turret_mark_x: i32,
    /// Aim mark y, in downscaled turret image pixels
    pub turret_mark_y: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step_time_go: 250.0,
            step_time_back: 250.0,
            step_time_turn: 250.0,
            engine_left_calib: 1.0,
            engine_right_calib: 1.0,
            step_time_turret: 500.0,
            steps_turret: 200,
            step_time_turret2: 500.0,
            steps_turret2: 200,
            turret_mark_x: 160,
            turret_mark_y: 120,
        }
    }
}

impl Settings {
    /// Every key of the settings blob, in file order
    pub const KEYS: [&'static str; 11] = [
        "step_time_go",
        "step_time_back",
        "step_time_turn",
        "engine_left_calib",
        "engine_right_calib",
        "step_time_turret",
        "steps_turret",
        "step_time_turret2",
        "steps_turret2",
        "turret_mark_x",
        "turret_mark_y",
    ];

    /// Build settings from a JSON object.
    ///
    /// Missing or non-numeric keys fall back to their default value, unknown
    /// keys are ignored. Integer keys accept float values and truncate them.
    /// A one-element array holding a number counts as that number.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let d = Self::default();
        let float = |key: &str, default: f64| number(map, key).unwrap_or(default);
        let count = |key: &str, default: u32| {
            number(map, key)
                .map(|v| v.max(0.0).min(u32::MAX as f64) as u32)
                .unwrap_or(default)
        };
        let coord = |key: &str, default: i32| {
            number(map, key)
                .map(|v| v.max(i32::MIN as f64).min(i32::MAX as f64) as i32)
                .unwrap_or(default)
        };

        Self {
            step_time_go: float("step_time_go", d.step_time_go),
            step_time_back: float("step_time_back", d.step_time_back),
            step_time_turn: float("step_time_turn", d.step_time_turn),
            engine_left_calib: float("engine_left_calib", d.engine_left_calib),
            engine_right_calib: float("engine_right_calib", d.engine_right_calib),
            step_time_turret: float("step_time_turret", d.step_time_turret),
            steps_turret: count("steps_turret", d.steps_turret),
            step_time_turret2: float("step_time_turret2", d.step_time_turret2),
            steps_turret2: count("steps_turret2", d.steps_turret2),
            turret_mark_x: coord("turret_mark_x", d.turret_mark_x),
            turret_mark_y: coord("turret_mark_y", d.turret_mark_y),
        }
    }

    /// Parse a settings blob; the top level must be a JSON object
    pub fn from_json(contents: &str) -> RoverResult<Self> {
        match serde_json::from_str::<Value>(contents)? {
            Value::Object(map) => Ok(Self::from_map(&map)),
            other => Err(RoverError::settings(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Serialize as the pretty-printed blob written to disk
    pub fn to_json_pretty(&self) -> RoverResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| RoverError::Serialization(e.to_string()))
    }
}

/// Numeric value of `key`, unwrapping a single-element array
fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = map.get(key)?;
    let found = match value {
        Value::Array(items) if items.len() == 1 => items[0].as_f64(),
        other => other.as_f64(),
    };
    if found.is_none() {
        log::warn!(
            "settings key {} has a non-numeric value ({}), using the default",
            key,
            json_kind(value)
        );
    }
    found
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// File-backed settings holder with atomic snapshot swap
///
/// Shared between the dispatcher (writer) and the actuator / camera
/// components (readers) as `Arc<SettingsStore>`.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Arc<Settings>>,
}

impl SettingsStore {
    /// Open the store at `path`, loading (or creating) the settings file
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let initial = read_or_default(&path);
        Self {
            path,
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Store backed by `path` holding defaults, without touching the disk
    pub fn with_defaults<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            current: RwLock::new(Arc::new(Settings::default())),
        }
    }

    /// Path of the backing settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored settings.
    ///
    /// A missing file is created with the defaults. A corrupt file yields the
    /// defaults and is left in place. Never fails.
    pub fn load(&self) -> Settings {
        read_or_default(&self.path)
    }

    /// Persist `settings` atomically (temp file in the same directory, then rename)
    pub fn save(&self, settings: &Settings) -> RoverResult<()> {
        write_atomic(&self.path, settings)
    }

    /// Save `settings` and make them the current snapshot.
    ///
    /// The in-memory snapshot is swapped even when the save fails, so the
    /// operator's values take effect for this run; the save error is returned
    /// for reporting.
    pub fn replace(&self, settings: Settings) -> RoverResult<()> {
        let saved = self.save(&settings);
        *self.current.write() = Arc::new(settings);
        saved
    }

    /// Re-read the file and swap the snapshot
    pub fn reload(&self) -> Arc<Settings> {
        let fresh = Arc::new(self.load());
        *self.current.write() = Arc::clone(&fresh);
        fresh
    }

    /// Current immutable snapshot
    pub fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&self.current.read())
    }
}

fn read_or_default(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(contents) => match Settings::from_json(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Settings file {} is unreadable ({}), using defaults",
                    path.display(),
                    e
                );
                Settings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = Settings::default();
            match write_atomic(path, &defaults) {
                Ok(()) => log::info!("Created default settings at {}", path.display()),
                Err(e) => log::warn!(
                    "Could not write default settings to {}: {}",
                    path.display(),
                    e
                ),
            }
            defaults
        }
        Err(e) => {
            log::warn!(
                "Failed to read settings {} ({}), using defaults",
                path.display(),
                e
            );
            Settings::default()
        }
    }
}

fn write_atomic(path: &Path, settings: &Settings) -> RoverResult<()> {
    let contents = settings.to_json_pretty()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_map_fills_missing_keys() {
        let value = json!({ "step_time_go": 300, "engine_right_calib": 0.9 });
        let settings = Settings::from_map(value.as_object().unwrap());

        assert_eq!(settings.step_time_go, 300.0);
        assert_eq!(settings.engine_right_calib, 0.9);
        assert_eq!(settings.step_time_back, 250.0);
        assert_eq!(settings.steps_turret, 200);
        assert_eq!(settings.turret_mark_y, 120);
    }

    #[test]
    fn test_from_map_ignores_bad_values() {
        let value = json!({
            "steps_turret": "lots",
            "steps_turret2": 150.7,
            "turret_mark_x": -4,
            "unknown": 1
        });
        let settings = Settings::from_map(value.as_object().unwrap());

        assert_eq!(settings.steps_turret, 200);
        assert_eq!(settings.steps_turret2, 150);
        assert_eq!(settings.turret_mark_x, -4);
    }

    #[test]
    fn test_from_map_unwraps_single_element_arrays() {
        // The control panel posts steps_turret2 wrapped in a list
        let value = json!({
            "steps_turret2": [40],
            "step_time_turret2": [750.5],
            "steps_turret": [1, 2],
            "step_time_turret": [],
            "turret_mark_x": ["7"]
        });
        let settings = Settings::from_map(value.as_object().unwrap());

        assert_eq!(settings.steps_turret2, 40);
        assert_eq!(settings.step_time_turret2, 750.5);
        assert_eq!(settings.steps_turret, 200);
        assert_eq!(settings.step_time_turret, 500.0);
        assert_eq!(settings.turret_mark_x, 160);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Settings::from_json("[1, 2]").is_err());
        assert!(Settings::from_json("not json").is_err());
    }

    #[test]
    fn test_pretty_blob_has_every_key() {
        let blob = Settings::default().to_json_pretty().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        let map = value.as_object().unwrap();

        assert_eq!(map.len(), Settings::KEYS.len());
        for key in Settings::KEYS {
            assert!(map.contains_key(key), "missing {}", key);
        }
        assert!(blob.contains("\n    \"step_time_go\""));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_defaults(dir.path().join("settings.json"));

        let before = store.snapshot();
        let mut next = Settings::default();
        next.step_time_turn = 120.0;
        store.replace(next).unwrap();

        assert_eq!(before.step_time_turn, 250.0);
        assert_eq!(store.snapshot().step_time_turn, 120.0);
    }
}
