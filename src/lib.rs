#![warn(missing_docs)]

//! Motion control core for a four wheel swerve (4 wheel steering and 4 wheel drive) robot.
//!
//! Converts a desired chassis velocity into wheel speed and azimuth commands, drives the
//! azimuth and drive actuators of every wheel module towards those commands and fuses the
//! wheel feedback and the robot heading into an estimate of the robot pose on the field.

use thiserror::Error;

use crate::{geometry::WheelPosition, hardware::HardwareFault};

/// Defines periodic number spaces used for angle and encoder count wraparound.
pub mod number_space;

/// Provides the planar geometry types, i.e. angles, wheel locations and poses.
pub mod geometry;

/// Provides the interfaces and adapters for the actuators, sensors and persistent storage.
pub mod hardware;

/// Provides the configuration types for the wheel modules and the drive.
pub mod config;

/// Maps between chassis velocities and wheel module states.
pub mod kinematics;

/// Integrates wheel module feedback into a field relative pose.
pub mod odometry;

/// Controls a single wheel module.
pub mod wheel_module;

/// Owns the four wheel modules and exposes the drive API.
pub mod chassis_drive;

#[cfg(test)]
pub(crate) mod test_support;

/// Defines the different errors for the swerve drive crate.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A conversion constant, gear ratio or speed limit was zero or negative.
    #[error("The {name} must be greater than zero but was {value}.")]
    NonPositiveParameter {
        /// The name of the configuration parameter.
        name: String,
        /// The rejected value.
        value: f64,
    },

    /// A wheel module was configured without a wheel location.
    #[error("The wheel location must be set.")]
    MissingWheelLocation,

    /// A wheel location lies on one of the robot axes so no quadrant can be derived from it.
    #[error("The wheel location ({x}, {y}) lies on a robot axis and has no quadrant.")]
    WheelLocationOnAxis {
        /// The x-coordinate of the location in meters.
        x: f64,
        /// The y-coordinate of the location in meters.
        y: f64,
    },

    /// Two wheels were configured at the same location.
    #[error("More than one wheel is located at ({x}, {y}).")]
    DuplicateWheelLocation {
        /// The x-coordinate of the location in meters.
        x: f64,
        /// The y-coordinate of the location in meters.
        y: f64,
    },

    /// Two wheels were configured in the same quadrant.
    #[error("More than one wheel is located in the {position} quadrant.")]
    DuplicateWheelPosition {
        /// The quadrant that is used more than once.
        position: WheelPosition,
    },

    /// The wheel modules do not share the same maximum drive speed.
    #[error("The wheel modules must have the same maximum speed. Expected {expected} but found {found}.")]
    MismatchedMaximumSpeed {
        /// The maximum speed of the first module.
        expected: f64,
        /// The maximum speed that differs.
        found: f64,
    },

    /// The wheel locations do not allow the chassis velocity to be solved for.
    #[error("The wheel geometry is degenerate and cannot be used for kinematics.")]
    SingularWheelGeometry,

    /// The configuration could not be read or parsed.
    #[error("The configuration is invalid: {reason}")]
    InvalidConfiguration {
        /// The description of the problem.
        reason: String,
    },

    /// No azimuth zero reference has been stored for a wheel.
    #[error("No azimuth zero reference is stored for the {position} wheel under '{key}'.")]
    MissingZeroReference {
        /// The wheel that has no zero reference.
        position: WheelPosition,
        /// The key under which the zero reference was expected.
        key: String,
    },

    /// A command was issued to a wheel module that has not loaded its azimuth zero reference.
    #[error("The {position} wheel module is not calibrated.")]
    ModuleNotCalibrated {
        /// The wheel that is not calibrated.
        position: WheelPosition,
    },

    /// The hardware interface reported a fault.
    #[error(transparent)]
    Hardware(#[from] HardwareFault),

    /// The persistent store could not be read or written.
    #[error("Failed to access the persistent store: {reason}")]
    Persistence {
        /// The description of the problem.
        reason: String,
    },
}

impl Error {
    /// Returns a value indicating whether the error is an azimuth calibration problem.
    pub fn is_calibration_error(&self) -> bool {
        matches!(
            self,
            Error::MissingZeroReference { .. } | Error::ModuleNotCalibrated { .. }
        )
    }

    /// Returns a value indicating whether the error is a configuration problem that
    /// prevents the drive from being assembled.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::NonPositiveParameter { .. }
                | Error::MissingWheelLocation
                | Error::WheelLocationOnAxis { .. }
                | Error::DuplicateWheelLocation { .. }
                | Error::DuplicateWheelPosition { .. }
                | Error::MismatchedMaximumSpeed { .. }
                | Error::SingularWheelGeometry
                | Error::InvalidConfiguration { .. }
        )
    }

    /// Returns a value indicating whether the error originates from the hardware or
    /// storage collaborators.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, Error::Hardware(_) | Error::Persistence { .. })
    }
}
