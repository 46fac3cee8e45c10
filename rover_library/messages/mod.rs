// Message types exchanged with the broker
//
// - Command: inbound operator commands and settings pushes
// - Frame: outbound camera envelopes, plus the camera role identity
//
// All message types are re-exported at the crate root for convenience.

pub mod command;
pub mod frame;

pub use command::{
    Command, DriveCommand, InboundMessage, StepDirection, TurretAxis, SETTINGS_UPDATE_TYPE,
};
pub use frame::{CameraRole, FrameMessage};
