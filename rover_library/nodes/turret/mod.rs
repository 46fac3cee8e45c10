//! Turret Node - two stepper axes and the firing solenoid
//!
//! Every actuation launches an external program. Axis programs get
//! `<direction> <step period us> <step count>` appended to their configured
//! arguments; the firing program gets nothing. Each axis and the trigger have
//! their own busy flag, so axis 1 can move while axis 2 is still stepping.

use std::sync::Arc;
use std::time::Duration;

use rover_core::{RoverResult, Settings, SettingsStore};

use crate::drivers::process::{ProcessActuator, ProcessConfig};
use crate::messages::{StepDirection, TurretAxis};

/// Arguments for one stepper invocation
pub fn turret_command(axis: TurretAxis, direction: StepDirection, settings: &Settings) -> Vec<String> {
    let (period, count) = match axis {
        TurretAxis::Pan => (settings.step_time_turret, settings.steps_turret),
        TurretAxis::Tilt => (settings.step_time_turret2, settings.steps_turret2),
    };
    vec![
        direction.as_arg().to_string(),
        format_period(period),
        count.to_string(),
    ]
}

/// Arguments for the firing program
pub fn fire_command() -> Vec<String> {
    Vec::new()
}

// Always carries a decimal point: the stepper program parses a float.
fn format_period(period: f64) -> String {
    if period.is_finite() && period.fract() == 0.0 {
        format!("{:.1}", period)
    } else {
        period.to_string()
    }
}

/// Programs backing the turret
#[derive(Debug, Clone)]
pub struct TurretConfig {
    pub pan: ProcessConfig,
    pub tilt: ProcessConfig,
    pub fire: ProcessConfig,
}

/// Turret controller
pub struct TurretController {
    pan: ProcessActuator,
    tilt: ProcessActuator,
    fire: ProcessActuator,
    settings: Arc<SettingsStore>,
}

impl TurretController {
    pub fn new(config: TurretConfig, settings: Arc<SettingsStore>) -> Self {
        Self {
            pan: ProcessActuator::new(TurretAxis::Pan.as_str(), config.pan),
            tilt: ProcessActuator::new(TurretAxis::Tilt.as_str(), config.tilt),
            fire: ProcessActuator::new("fire", config.fire),
            settings,
        }
    }

    pub fn actuator(&self, axis: TurretAxis) -> &ProcessActuator {
        match axis {
            TurretAxis::Pan => &self.pan,
            TurretAxis::Tilt => &self.tilt,
        }
    }

    pub fn trigger(&self) -> &ProcessActuator {
        &self.fire
    }

    /// Step one axis with the current settings.
    ///
    /// Returns a busy error if that axis is still moving.
    pub fn step(&self, axis: TurretAxis, direction: StepDirection) -> RoverResult<()> {
        let settings = self.settings.snapshot();
        let args = turret_command(axis, direction, &settings);
        self.actuator(axis).invoke(&args)
    }

    /// Fire once. Returns a busy error if the previous shot has not finished.
    pub fn fire(&self) -> RoverResult<()> {
        self.fire.invoke(&fire_command())
    }

    /// Wait for all outstanding invocations, up to `timeout` each
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        [&self.pan, &self.tilt, &self.fire]
            .iter()
            .all(|a| a.wait_idle(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_arguments() {
        let s = Settings {
            step_time_turret: 500.0,
            steps_turret: 200,
            step_time_turret2: 750.5,
            steps_turret2: 40,
            ..Settings::default()
        };

        assert_eq!(
            turret_command(TurretAxis::Pan, StepDirection::Left, &s),
            vec!["left", "500.0", "200"]
        );
        assert_eq!(
            turret_command(TurretAxis::Tilt, StepDirection::Right, &s),
            vec!["right", "750.5", "40"]
        );
    }

    #[test]
    fn test_fire_has_no_arguments() {
        assert!(fire_command().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_axes_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SettingsStore::with_defaults(dir.path().join("settings.json")));
        // `sh -c 'sleep 0.3' <dir> <period> <count>`: extra args land in $0..$2
        let slow = ProcessConfig::new("sh").with_args(["-c", "sleep 0.3"]);
        let turret = TurretController::new(
            TurretConfig {
                pan: slow.clone(),
                tilt: slow.clone(),
                fire: slow,
            },
            store,
        );

        turret.step(TurretAxis::Pan, StepDirection::Left).unwrap();
        assert!(turret
            .step(TurretAxis::Pan, StepDirection::Right)
            .unwrap_err()
            .is_busy());
        turret.step(TurretAxis::Tilt, StepDirection::Left).unwrap();
        turret.fire().unwrap();

        assert!(turret.wait_idle(Duration::from_secs(5)));
        assert_eq!(turret.actuator(TurretAxis::Pan).launched(), 1);
        assert_eq!(turret.actuator(TurretAxis::Tilt).launched(), 1);
        assert_eq!(turret.trigger().launched(), 1);
    }
}
