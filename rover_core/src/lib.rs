//! # ROVER Core
//!
//! Core building blocks of the ROVER on-board agent:
//!
//! - **Communication**: `OutboundLink`, the bounded queue between worker threads and the network loop
//! - **Errors**: `RoverError` / `RoverResult` used by every crate in the workspace
//! - **Drivers**: `DriverStatus` lifecycle tracking shared by all hardware drivers
//! - **Settings**: the operator-tunable parameter blob and its atomic, file-backed store

pub mod communication;
pub mod driver;
pub mod error;
pub mod settings;

pub use communication::{LogSummary, OutboundLink, DEFAULT_OUTBOUND_CAPACITY};
pub use driver::DriverStatus;
pub use error::{RoverError, RoverResult};
pub use settings::{Settings, SettingsStore, DEFAULT_SETTINGS_FILE};
