//! Agent configuration
//!
//! Loaded from a TOML file. Every field has a default, so an absent file or
//! an absent section means "use the defaults":
//!
//! ```toml
//! [broker]
//! url = "ws://127.0.0.1:8005/ws/control/"
//! token = "secret"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [camera.discovery]
//! front = "usb-5311000.usb-1"
//! turret = "usb-5310000.usb-1"
//!
//! [camera.pipeline]
//! frame_skip = 3
//! jpeg_quality = 30
//!
//! [actuators]
//! turret_program = "python3"
//! pan_args = ["turret_axis1.py"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rover_core::{RoverError, RoverResult, DEFAULT_OUTBOUND_CAPACITY, DEFAULT_SETTINGS_FILE};
use rover_library::{
    CameraPipelineConfig, CaptureConfig, DiscoveryConfig, ProcessConfig, SerialConfig,
    TurretConfig,
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Config file name looked up in the working directory, then in `~/.rover/`
pub const CONFIG_FILE_NAME: &str = "rover.toml";

/// Top-level agent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub broker: BrokerConfig,
    pub serial: SerialConfig,
    pub settings: SettingsConfig,
    pub camera: CameraConfig,
    pub actuators: ActuatorsConfig,
    /// Use simulation serial and camera drivers
    pub simulate: bool,
}

/// Broker connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// WebSocket endpoint of the control broker
    pub url: String,
    /// Shared secret, sent as the `token` query parameter
    pub token: String,
    /// Pending outbound messages kept before the oldest is dropped
    pub outbound_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8005/ws/control/".to_string(),
            token: String::new(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl BrokerConfig {
    /// URL to connect to, token included
    pub fn endpoint(&self) -> RoverResult<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| RoverError::config(format!("broker url {:?}: {}", self.url, e)))?;
        if !self.token.is_empty() {
            url.query_pairs_mut().append_pair("token", &self.token);
        }
        Ok(url.into())
    }
}

/// Operator settings store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SETTINGS_FILE),
        }
    }
}

/// Camera discovery, capture and streaming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub discovery: DiscoveryConfig,
    pub capture: CaptureConfig,
    pub pipeline: CameraPipelineConfig,
}

/// External actuator programs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorsConfig {
    /// Program driving both turret steppers
    pub turret_program: PathBuf,
    /// Arguments selecting axis 1 (pan)
    pub pan_args: Vec<String>,
    /// Arguments selecting axis 2 (tilt)
    pub tilt_args: Vec<String>,
    /// Program pulsing the firing solenoid
    pub fire_program: PathBuf,
    pub fire_args: Vec<String>,
    /// Kill an actuator program running longer than this
    pub timeout_ms: u64,
}

impl Default for ActuatorsConfig {
    fn default() -> Self {
        Self {
            turret_program: PathBuf::from("python3"),
            pan_args: vec!["turret_axis1.py".to_string()],
            tilt_args: vec!["turret_axis2.py".to_string()],
            fire_program: PathBuf::from("python3"),
            fire_args: vec!["fire.py".to_string()],
            timeout_ms: 30_000,
        }
    }
}

impl ActuatorsConfig {
    pub fn turret_config(&self) -> TurretConfig {
        let program = |path: &PathBuf, args: &[String]| {
            ProcessConfig::new(path.clone())
                .with_args(args.iter().cloned())
                .with_timeout(std::time::Duration::from_millis(self.timeout_ms))
        };
        TurretConfig {
            pan: program(&self.turret_program, &self.pan_args),
            tilt: program(&self.turret_program, &self.tilt_args),
            fire: program(&self.fire_program, &self.fire_args),
        }
    }
}

impl AgentConfig {
    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RoverResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RoverError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> RoverResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> RoverResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load `explicit` if given (it must exist), otherwise the first config
    /// file found in the default locations, otherwise defaults.
    pub fn discover(explicit: Option<&Path>) -> RoverResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }
        for candidate in Self::search_paths() {
            if candidate.is_file() {
                let config = Self::from_file(&candidate)?;
                return Ok((config, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Default config locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rover").join(CONFIG_FILE_NAME));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = AgentConfig::from_toml("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.camera.pipeline.frame_skip, 3);
        assert!(!config.simulate);
    }

    #[test]
    fn test_partial_sections() {
        let config = AgentConfig::from_toml(
            r#"
            simulate = true

            [broker]
            token = "abc"

            [camera.discovery]
            front = "usb-1.2"

            [camera.pipeline]
            jpeg_quality = 50
            "#,
        )
        .unwrap();

        assert!(config.simulate);
        assert_eq!(config.broker.url, BrokerConfig::default().url);
        assert_eq!(config.camera.discovery.front, "usb-1.2");
        assert_eq!(config.camera.discovery.turret, "usb-5310000.usb-1");
        assert_eq!(config.camera.pipeline.jpeg_quality, 50);
        assert_eq!(config.camera.pipeline.frame_skip, 3);
    }

    #[test]
    fn test_endpoint_carries_token() {
        let mut broker = BrokerConfig::default();
        assert_eq!(broker.endpoint().unwrap(), "ws://127.0.0.1:8005/ws/control/");

        broker.token = "s3cret token&x=1".to_string();
        let endpoint = Url::parse(&broker.endpoint().unwrap()).unwrap();
        let pairs: Vec<(String, String)> = endpoint.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("token".to_string(), "s3cret token&x=1".to_string())]
        );

        broker.url = "ws://host/ws/?robot=1".to_string();
        broker.token = "t".to_string();
        assert_eq!(broker.endpoint().unwrap(), "ws://host/ws/?robot=1&token=t");
    }

    #[test]
    fn test_endpoint_token_goes_before_fragment() {
        let broker = BrokerConfig {
            url: "ws://host/ws/control/#panel".to_string(),
            token: "t".to_string(),
            ..Default::default()
        };
        assert_eq!(
            broker.endpoint().unwrap(),
            "ws://host/ws/control/?token=t#panel"
        );
    }

    #[test]
    fn test_endpoint_rejects_malformed_url() {
        let broker = BrokerConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        let err = broker.endpoint().unwrap_err();
        assert!(matches!(err, RoverError::Config(_)));
    }

    #[test]
    fn test_turret_config_prefixes_axis_script() {
        let actuators = ActuatorsConfig {
            timeout_ms: 5_000,
            ..Default::default()
        };
        let turret = actuators.turret_config();
        assert_eq!(turret.pan.args, vec!["turret_axis1.py"]);
        assert_eq!(turret.tilt.args, vec!["turret_axis2.py"]);
        assert_eq!(turret.fire.args, vec!["fire.py"]);
        assert_eq!(turret.fire.timeout_ms, 5_000);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AgentConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(AgentConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AgentConfig::discover(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
