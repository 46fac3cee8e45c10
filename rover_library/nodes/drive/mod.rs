//! Drive Node - differential track drive over a serial motor controller
//!
//! Each drive command becomes one ASCII line `dir1,speed1,dir2,speed2\n`
//! for the controller firmware. Speeds come from the operator settings,
//! scaled by the per-track calibration factors.

use std::sync::Arc;

use parking_lot::Mutex;
use rover_core::{DriverStatus, RoverResult, Settings, SettingsStore};

use crate::drivers::serial::SerialDriver;
use crate::messages::DriveCommand;

/// Direction and speed for both tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSignal {
    pub dir1: u8,
    pub speed1: i64,
    pub dir2: u8,
    pub speed2: i64,
}

impl DriveSignal {
    /// Wire form understood by the motor controller
    pub fn to_line(&self) -> String {
        format!("{},{},{},{}\n", self.dir1, self.speed1, self.dir2, self.speed2)
    }
}

/// Which settings field feeds the track speed
#[derive(Debug, Clone, Copy)]
enum SpeedSource {
    Go,
    Back,
    Turn,
    Zero,
}

impl SpeedSource {
    fn value(self, settings: &Settings) -> f64 {
        match self {
            Self::Go => settings.step_time_go,
            Self::Back => settings.step_time_back,
            Self::Turn => settings.step_time_turn,
            Self::Zero => 0.0,
        }
    }
}

// (command, dir1, dir2, speed source)
const DRIVE_TABLE: [(DriveCommand, u8, u8, SpeedSource); 5] = [
    (DriveCommand::Go, 1, 0, SpeedSource::Go),
    (DriveCommand::Back, 0, 1, SpeedSource::Back),
    (DriveCommand::Left, 0, 0, SpeedSource::Turn),
    (DriveCommand::Right, 1, 1, SpeedSource::Turn),
    (DriveCommand::Stop, 0, 0, SpeedSource::Zero),
];

/// Compute the signal for a drive command name.
///
/// Returns `None` for anything outside `go|back|left|right|stop`.
pub fn drive_command(cmd: &str, settings: &Settings) -> Option<DriveSignal> {
    let cmd = DriveCommand::parse(cmd)?;
    Some(drive_signal(cmd, settings))
}

/// Compute the signal for a parsed drive command
pub fn drive_signal(cmd: DriveCommand, settings: &Settings) -> DriveSignal {
    let (_, dir1, dir2, source) = DRIVE_TABLE
        .iter()
        .copied()
        .find(|(c, ..)| *c == cmd)
        .unwrap_or((DriveCommand::Stop, 0, 0, SpeedSource::Zero));
    let base = source.value(settings);

    DriveSignal {
        dir1,
        speed1: (base * settings.engine_left_calib).trunc() as i64,
        dir2,
        speed2: (base * settings.engine_right_calib).trunc() as i64,
    }
}

/// Serial drive controller
///
/// Owns the serial link; writes are serialized by an internal lock so the
/// controller can be shared between the dispatcher and shutdown paths.
pub struct DriveController {
    serial: Mutex<SerialDriver>,
    settings: Arc<SettingsStore>,
}

impl DriveController {
    pub fn new(serial: SerialDriver, settings: Arc<SettingsStore>) -> Self {
        Self {
            serial: Mutex::new(serial),
            settings,
        }
    }

    /// Open the serial link
    pub fn init(&self) -> RoverResult<()> {
        self.serial.lock().init()
    }

    pub fn shutdown(&self) -> RoverResult<()> {
        self.serial.lock().shutdown()
    }

    pub fn status(&self) -> DriverStatus {
        self.serial.lock().status()
    }

    /// Compute and write the signal for `cmd` with the current settings.
    ///
    /// A failed write is returned to the caller and not retried.
    pub fn execute(&self, cmd: DriveCommand) -> RoverResult<DriveSignal> {
        let settings = self.settings.snapshot();
        let signal = drive_signal(cmd, &settings);
        let line = signal.to_line();

        self.serial.lock().send_line(&line)?;
        log::debug!("drive {}: {}", cmd.as_str(), line.trim_end());
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            step_time_go: 250.0,
            step_time_back: 200.0,
            step_time_turn: 150.0,
            engine_left_calib: 1.0,
            engine_right_calib: 0.9,
            ..Settings::default()
        }
    }

    #[test]
    fn test_drive_table() {
        let s = settings();
        let sig = |cmd| {
            let d = drive_command(cmd, &s).unwrap();
            (d.dir1, d.speed1, d.dir2, d.speed2)
        };

        assert_eq!(sig("go"), (1, 250, 0, 225));
        assert_eq!(sig("back"), (0, 200, 1, 180));
        assert_eq!(sig("left"), (0, 150, 0, 135));
        assert_eq!(sig("right"), (1, 150, 1, 135));
        assert_eq!(sig("stop"), (0, 0, 0, 0));
    }

    #[test]
    fn test_speeds_truncate() {
        let s = Settings {
            step_time_turn: 99.9,
            engine_left_calib: 1.0,
            engine_right_calib: 0.55,
            ..Settings::default()
        };
        let d = drive_command("left", &s).unwrap();
        assert_eq!(d.speed1, 99);
        assert_eq!(d.speed2, 54);
    }

    #[test]
    fn test_unknown_command_is_none() {
        let s = settings();
        assert!(drive_command("forward", &s).is_none());
        assert!(drive_command("", &s).is_none());
        assert!(drive_command("GO", &s).is_none());
    }

    #[test]
    fn test_line_format() {
        let d = drive_command("left", &Settings::default()).unwrap();
        assert_eq!(d.to_line(), "0,250,0,250\n");
    }

    #[test]
    fn test_controller_writes_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SettingsStore::with_defaults(dir.path().join("settings.json")));
        let serial = SerialDriver::simulation();
        let tap = serial.tap().unwrap();

        let drive = DriveController::new(serial, store);
        drive.init().unwrap();
        drive.execute(DriveCommand::Go).unwrap();
        drive.execute(DriveCommand::Stop).unwrap();

        assert_eq!(tap.lines(), vec!["1,250,0,250", "0,0,0,0"]);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SettingsStore::with_defaults(dir.path().join("settings.json")));
        let mut serial = SerialDriver::simulation();
        if let SerialDriver::Simulation(d) = &mut serial {
            d.set_fail_writes(true);
        }

        let drive = DriveController::new(serial, store);
        drive.init().unwrap();
        assert!(drive.execute(DriveCommand::Go).is_err());
    }
}
