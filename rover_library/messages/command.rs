use rover_core::{LogSummary, RoverError, RoverResult};
use serde_json::{Map, Value};

/// Drive-train command understood by the serial motor controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveCommand {
    Go,
    Back,
    Left,
    Right,
    Stop,
}

impl DriveCommand {
    pub const ALL: [DriveCommand; 5] = [
        DriveCommand::Go,
        DriveCommand::Back,
        DriveCommand::Left,
        DriveCommand::Right,
        DriveCommand::Stop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
            Self::Stop => "stop",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.as_str() == name)
    }
}

/// Turret stepper axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurretAxis {
    /// Axis 1, driven by `turret_left` / `turret_right`
    Pan,
    /// Axis 2, driven by `turret_up` / `turret_down`
    Tilt,
}

impl TurretAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pan => "turret_axis1",
            Self::Tilt => "turret_axis2",
        }
    }
}

/// Rotation direction passed to the stepper program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepDirection {
    Left,
    Right,
}

impl StepDirection {
    /// Positional argument understood by the stepper program
    pub fn as_arg(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Operator command carried in the `command` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CameraOn,
    CameraOff,
    Drive(DriveCommand),
    Turret(TurretAxis, StepDirection),
    Fire,
}

/// Wire name -> command. Lookup is a flat scan; order is irrelevant.
const COMMAND_TABLE: [(&str, Command); 12] = [
    ("camera_on", Command::CameraOn),
    ("camera_off", Command::CameraOff),
    ("go", Command::Drive(DriveCommand::Go)),
    ("back", Command::Drive(DriveCommand::Back)),
    ("left", Command::Drive(DriveCommand::Left)),
    ("right", Command::Drive(DriveCommand::Right)),
    ("stop", Command::Drive(DriveCommand::Stop)),
    ("turret_left", Command::Turret(TurretAxis::Pan, StepDirection::Left)),
    ("turret_right", Command::Turret(TurretAxis::Pan, StepDirection::Right)),
    ("turret_up", Command::Turret(TurretAxis::Tilt, StepDirection::Left)),
    ("turret_down", Command::Turret(TurretAxis::Tilt, StepDirection::Right)),
    ("fire", Command::Fire),
];

impl Command {
    /// Look up a wire command name
    pub fn parse(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(wire, _)| *wire == name)
            .map(|(_, cmd)| *cmd)
    }

    /// Wire name of this command
    pub fn name(&self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(_, cmd)| cmd == self)
            .map(|(wire, _)| *wire)
            .unwrap_or("unknown")
    }
}

impl LogSummary for Command {
    fn log_summary(&self) -> String {
        format!("Command({})", self.name())
    }
}

/// Discriminator value marking a settings push
pub const SETTINGS_UPDATE_TYPE: &str = "settings_update";

/// A classified inbound broker message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `{"type": "settings_update", "settings_data": {...}}`
    SettingsUpdate(Map<String, Value>),
    /// `{"command": "..."}`
    Command(Command),
}

impl InboundMessage {
    /// Classify one inbound text frame.
    ///
    /// A settings update wins over any `command` field present in the same
    /// object. Everything that is neither is a protocol error.
    pub fn parse(text: &str) -> RoverResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RoverError::protocol(format!("not JSON: {}", e)))?;
        let obj = value
            .as_object()
            .ok_or_else(|| RoverError::protocol("message is not a JSON object"))?;

        if obj.get("type").and_then(Value::as_str) == Some(SETTINGS_UPDATE_TYPE) {
            return match obj.get("settings_data") {
                Some(Value::Object(data)) => Ok(Self::SettingsUpdate(data.clone())),
                _ => Err(RoverError::protocol(
                    "settings_update without a settings_data object",
                )),
            };
        }

        let name = obj
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| RoverError::protocol("no command field"))?;
        Command::parse(name)
            .map(Self::Command)
            .ok_or_else(|| RoverError::protocol(format!("unknown command '{}'", name)))
    }
}

impl LogSummary for InboundMessage {
    fn log_summary(&self) -> String {
        match self {
            Self::SettingsUpdate(data) => format!("SettingsUpdate({} keys)", data.len()),
            Self::Command(cmd) => cmd.log_summary(),
        }
    }
}
