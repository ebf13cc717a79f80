//! Defines the interface for sensors

use crate::geometry::Angle;

use super::actuator_interface::HardwareFault;

/// Defines the interface for the sensor that measures the heading of the robot.
pub trait Gyro: Send {
    /// Returns the current heading of the robot, counter-clockwise positive.
    fn heading(&self) -> Result<Angle, HardwareFault>;
}
