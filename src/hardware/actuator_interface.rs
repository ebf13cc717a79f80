use std::fmt::Display;

use thiserror::Error;

#[cfg(test)]
#[path = "actuator_interface_tests.rs"]
mod actuator_interface_tests;

/// Describes a fault reported by the hardware interface of an actuator or sensor.
///
/// The fault carries the error code of the hardware interface unchanged. Retrying,
/// if desired, is up to the hardware interface itself.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("Hardware fault {code} on '{device}': {description}")]
pub struct HardwareFault {
    /// The name of the device that reported the fault.
    device: String,

    /// The error code reported by the hardware interface.
    code: i32,

    /// The human readable description of the fault.
    description: String,
}

impl HardwareFault {
    /// Returns the error code reported by the hardware interface.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the human readable description of the fault.
    pub fn description(&self) -> &str {
        self.description.as_ref()
    }

    /// Returns the name of the device that reported the fault.
    pub fn device(&self) -> &str {
        self.device.as_ref()
    }

    /// Creates a new [HardwareFault].
    ///
    /// ## Parameters
    ///
    /// * 'device' - The name of the device that reported the fault
    /// * 'code' - The error code reported by the hardware interface
    /// * 'description' - The description of the fault
    pub fn new(device: impl Into<String>, code: i32, description: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            code,
            description: description.into(),
        }
    }
}

/// Defines a single command for an actuator, in raw actuator units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActuatorCommand {
    /// Move to the given position setpoint, in encoder counts.
    Position(f64),

    /// Track the given velocity setpoint, in encoder counts per 100 ms.
    Velocity(f64),

    /// Apply the given fraction of the supply, in the range `[-1, 1]`.
    OpenLoop(f64),

    /// Overwrite the relative position counter with the given value, in encoder counts.
    SeedPosition(f64),
}

impl Display for ActuatorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuatorCommand::Position(counts) => write!(f, "Position [{:.1}]", counts),
            ActuatorCommand::Velocity(counts) => write!(f, "Velocity [{:.1}]", counts),
            ActuatorCommand::OpenLoop(fraction) => write!(f, "OpenLoop [{:.4}]", fraction),
            ActuatorCommand::SeedPosition(counts) => write!(f, "SeedPosition [{:.1}]", counts),
        }
    }
}

/// Defines the capabilities of a motor controller with a relative encoder.
///
/// All values are in raw actuator units: positions in encoder counts and velocities in
/// encoder counts per 100 ms. None of the methods may block.
pub trait Actuator: Send {
    /// Sends a command to the actuator.
    fn command(&mut self, command: ActuatorCommand) -> Result<(), HardwareFault>;

    /// Commands the actuator to the given position setpoint.
    fn command_position(&mut self, counts: f64) -> Result<(), HardwareFault> {
        self.command(ActuatorCommand::Position(counts))
    }

    /// Commands the actuator to the given velocity setpoint.
    fn command_velocity(&mut self, counts_per_100ms: f64) -> Result<(), HardwareFault> {
        self.command(ActuatorCommand::Velocity(counts_per_100ms))
    }

    /// Commands the actuator to apply the given fraction of the supply.
    fn command_open_loop(&mut self, fraction: f64) -> Result<(), HardwareFault> {
        self.command(ActuatorCommand::OpenLoop(fraction))
    }

    /// Returns the current value of the relative position counter.
    fn read_position(&self) -> Result<f64, HardwareFault>;

    /// Returns the current velocity measured by the relative encoder.
    fn read_velocity(&self) -> Result<f64, HardwareFault>;

    /// Overwrites the relative position counter.
    fn seed_position(&mut self, counts: f64) -> Result<(), HardwareFault> {
        self.command(ActuatorCommand::SeedPosition(counts))
    }
}

/// Defines the capabilities of the azimuth actuator of a wheel module, which in
/// addition to the relative encoder has an absolute position sensor.
pub trait AzimuthActuator: Actuator {
    /// Returns the reading of the absolute position sensor.
    ///
    /// The reading does not depend on the number of turns the azimuth has made and is
    /// masked to the physical resolution of the sensor.
    fn read_absolute_position(&self) -> Result<i32, HardwareFault>;
}
