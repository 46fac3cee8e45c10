//! Unified error handling for ROVER
//!
//! This module provides a centralized error type for the agent, its drivers
//! and its pipelines, ensuring consistent error handling across all components.

use thiserror::Error;

/// Main error type for ROVER operations
#[derive(Debug, Error)]
pub enum RoverError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings store errors (load/save of the settings blob)
    #[error("Settings error: {0}")]
    Settings(String),

    /// Network session errors
    #[error("Communication error: {0}")]
    Communication(String),

    /// Driver-related errors
    #[error("Driver error: {0}")]
    Driver(String),

    /// Camera device or frame decoding errors
    #[error("Camera '{role}' error: {message}")]
    Camera { role: String, message: String },

    /// Actuator invocation errors
    #[error("Actuator '{actuator}' error: {message}")]
    Actuator { actuator: String, message: String },

    /// Actuator still busy with a previous invocation
    #[error("Actuator '{0}' is busy")]
    Busy(String),

    /// Protocol errors (malformed inbound message)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// External command execution errors
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Generic internal errors (use sparingly)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using RoverError
pub type RoverResult<T> = Result<T, RoverError>;

impl From<serde_json::Error> for RoverError {
    fn from(err: serde_json::Error) -> Self {
        RoverError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RoverError {
    fn from(err: toml::de::Error) -> Self {
        RoverError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for RoverError {
    fn from(err: toml::ser::Error) -> Self {
        RoverError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl<T> From<std::sync::PoisonError<T>> for RoverError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        RoverError::Internal("Lock poisoned".to_string())
    }
}

impl From<tempfile::PersistError> for RoverError {
    fn from(err: tempfile::PersistError) -> Self {
        RoverError::Io(err.error)
    }
}

// Helper methods
impl RoverError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RoverError::Config(msg.into())
    }

    /// Create a settings store error
    pub fn settings<S: Into<String>>(msg: S) -> Self {
        RoverError::Settings(msg.into())
    }

    /// Create a communication error
    pub fn communication<S: Into<String>>(msg: S) -> Self {
        RoverError::Communication(msg.into())
    }

    /// Create a driver error
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        RoverError::Driver(msg.into())
    }

    /// Create a camera error with role name and message
    pub fn camera<S: Into<String>, T: Into<String>>(role: S, message: T) -> Self {
        RoverError::Camera {
            role: role.into(),
            message: message.into(),
        }
    }

    /// Create an actuator error with actuator name and message
    pub fn actuator<S: Into<String>, T: Into<String>>(actuator: S, message: T) -> Self {
        RoverError::Actuator {
            actuator: actuator.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        RoverError::Protocol(msg.into())
    }

    /// Check if the target actuator refused the call because it was busy
    pub fn is_busy(&self) -> bool {
        matches!(self, RoverError::Busy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoverError::camera("front", "probe failed");
        assert_eq!(err.to_string(), "Camera 'front' error: probe failed");

        let err = RoverError::Busy("turret_axis1".to_string());
        assert!(err.is_busy());
        assert_eq!(err.to_string(), "Actuator 'turret_axis1' is busy");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RoverError = io.into();
        assert!(matches!(err, RoverError::Io(_)));
    }

    #[test]
    fn test_config_conversions() {
        let err: RoverError = toml::from_str::<toml::Value>("= 1").unwrap_err().into();
        assert!(matches!(err, RoverError::Config(_)));

        let err: RoverError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, RoverError::Serialization(_)));
        assert!(!err.is_busy());
    }
}
