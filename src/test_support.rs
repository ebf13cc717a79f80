//! Test doubles for the hardware collaborators and the fixtures shared by the tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::ModuleConfig,
    geometry::{Angle, WheelLocation},
    hardware::{Actuator, ActuatorCommand, AzimuthActuator, Gyro, HardwareFault},
};

/// The drive gear ratio of the reference module, (22 / 48) * (15 / 45).
pub(crate) const DRIVE_GEAR_RATIO: f64 = (22.0 / 48.0) * (15.0 / 45.0);

/// The wheel diameter of the reference module, 3 inch.
pub(crate) const WHEEL_DIAMETER_METERS: f64 = 0.0762;

/// The maximum drive speed of the reference module.
pub(crate) const DRIVE_MAXIMUM_METERS_PER_SECOND: f64 = 3.84020432;

/// The offset of the wheels of the reference chassis from the rotation center.
pub(crate) const WHEEL_OFFSET_METERS: f64 = 0.27305;

pub(crate) fn module_config() -> ModuleConfig {
    ModuleConfig::new(
        DRIVE_GEAR_RATIO,
        WHEEL_DIAMETER_METERS,
        DRIVE_MAXIMUM_METERS_PER_SECOND,
    )
}

/// Returns the wheel locations of the reference chassis in the order front-left,
/// front-right, rear-left, rear-right.
pub(crate) fn wheel_locations() -> [WheelLocation; 4] {
    [
        WheelLocation::new(WHEEL_OFFSET_METERS, WHEEL_OFFSET_METERS),
        WheelLocation::new(WHEEL_OFFSET_METERS, -WHEEL_OFFSET_METERS),
        WheelLocation::new(-WHEEL_OFFSET_METERS, WHEEL_OFFSET_METERS),
        WheelLocation::new(-WHEEL_OFFSET_METERS, -WHEEL_OFFSET_METERS),
    ]
}

#[derive(Debug, Default)]
pub(crate) struct MockActuatorState {
    pub(crate) position: f64,
    pub(crate) velocity: f64,
    pub(crate) absolute_position: i32,
    pub(crate) commands: Vec<ActuatorCommand>,
    pub(crate) fault: Option<HardwareFault>,
}

/// An actuator that records the commands it receives. Clones share their state, so a test
/// can keep a handle after boxing the actuator into a module.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockActuator {
    state: Arc<Mutex<MockActuatorState>>,
}

impl MockActuator {
    pub(crate) fn clear_commands(&self) {
        self.state().commands.clear();
    }

    pub(crate) fn commands(&self) -> Vec<ActuatorCommand> {
        self.state().commands.clone()
    }

    pub(crate) fn fail_with(&self, fault: HardwareFault) {
        self.state().fault = Some(fault);
    }

    pub(crate) fn last_command(&self) -> Option<ActuatorCommand> {
        self.state().commands.last().copied()
    }

    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_absolute_position(&self, counts: i32) {
        self.state().absolute_position = counts;
    }

    pub(crate) fn set_position(&self, counts: f64) {
        self.state().position = counts;
    }

    pub(crate) fn set_velocity(&self, counts_per_100ms: f64) {
        self.state().velocity = counts_per_100ms;
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, MockActuatorState> {
        self.state.lock().unwrap()
    }
}

impl Actuator for MockActuator {
    fn command(&mut self, command: ActuatorCommand) -> Result<(), HardwareFault> {
        let mut state = self.state();
        if let Some(fault) = &state.fault {
            return Err(fault.clone());
        }

        if let ActuatorCommand::SeedPosition(counts) = command {
            state.position = counts;
        }
        state.commands.push(command);
        Ok(())
    }

    fn read_position(&self) -> Result<f64, HardwareFault> {
        let state = self.state();
        match &state.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(state.position),
        }
    }

    fn read_velocity(&self) -> Result<f64, HardwareFault> {
        let state = self.state();
        match &state.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(state.velocity),
        }
    }
}

impl AzimuthActuator for MockActuator {
    fn read_absolute_position(&self) -> Result<i32, HardwareFault> {
        let state = self.state();
        match &state.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(state.absolute_position),
        }
    }
}

/// A gyro whose heading is set by the test.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockGyro {
    heading: Arc<Mutex<Angle>>,
}

impl MockGyro {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_heading(&self, heading: Angle) {
        *self.heading.lock().unwrap() = heading;
    }
}

impl Gyro for MockGyro {
    fn heading(&self) -> Result<Angle, HardwareFault> {
        Ok(*self.heading.lock().unwrap())
    }
}
