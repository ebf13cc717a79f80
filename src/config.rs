//! Configuration for the wheel modules and the drive.
//!
//! The configuration can be built in code or loaded from JSON, for instance:
//!
//! ```json
//! {
//!   "control_period_ms": 20,
//!   "modules": [
//!     {
//!       "drive_gear_ratio": 0.1527777,
//!       "wheel_diameter_meters": 0.0762,
//!       "drive_maximum_meters_per_second": 3.84020432,
//!       "wheel_location": { "x": 0.27305, "y": 0.27305 }
//!     },
//!     ...
//!   ]
//! }
//! ```
//!
//! Tuning of the actuators themselves (gains, current limits, voltage compensation) is the
//! responsibility of the hardware interface and is not part of this configuration.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{geometry::WheelLocation, Error};

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

/// The default number of counts per revolution of the drive motor encoder.
pub const DEFAULT_DRIVE_COUNTS_PER_REVOLUTION: u32 = 2048;

/// The default number of counts per revolution of the azimuth encoder.
pub const DEFAULT_AZIMUTH_COUNTS_PER_REVOLUTION: u32 = 4096;

/// The number of velocity measurement intervals per second. Velocity feedback and
/// velocity setpoints are expressed in counts per 100 ms.
pub const VELOCITY_INTERVALS_PER_SECOND: f64 = 10.0;

/// The default length of one control cycle in milliseconds.
pub const DEFAULT_CONTROL_PERIOD_MS: u64 = 20;

fn default_drive_counts_per_revolution() -> u32 {
    DEFAULT_DRIVE_COUNTS_PER_REVOLUTION
}

fn default_azimuth_counts_per_revolution() -> u32 {
    DEFAULT_AZIMUTH_COUNTS_PER_REVOLUTION
}

fn default_control_period_ms() -> u64 {
    DEFAULT_CONTROL_PERIOD_MS
}

fn ensure_positive(name: &str, value: f64) -> Result<(), Error> {
    // Written so that NaN is rejected as well
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::NonPositiveParameter {
            name: name.to_string(),
            value,
        })
    }
}

/// Stores the physical constants of a single wheel module.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// The number of wheel revolutions per drive motor revolution.
    pub drive_gear_ratio: f64,

    /// The diameter of the wheel in meters.
    pub wheel_diameter_meters: f64,

    /// The number of drive encoder counts per motor revolution.
    #[serde(default = "default_drive_counts_per_revolution")]
    pub drive_counts_per_revolution: u32,

    /// The number of azimuth encoder counts per azimuth revolution.
    #[serde(default = "default_azimuth_counts_per_revolution")]
    pub azimuth_counts_per_revolution: u32,

    /// The speed, in meters per second, that corresponds to full open loop output.
    pub drive_maximum_meters_per_second: f64,

    /// The location of the wheel relative to the rotation center of the robot.
    #[serde(default)]
    pub wheel_location: Option<WheelLocation>,
}

impl ModuleConfig {
    /// Creates a new [ModuleConfig] with the default encoder resolutions and no wheel location.
    ///
    /// ## Parameters
    ///
    /// * 'drive_gear_ratio' - The number of wheel revolutions per drive motor revolution.
    /// * 'wheel_diameter_meters' - The diameter of the wheel in meters.
    /// * 'drive_maximum_meters_per_second' - The speed that corresponds to full open loop output.
    pub fn new(
        drive_gear_ratio: f64,
        wheel_diameter_meters: f64,
        drive_maximum_meters_per_second: f64,
    ) -> Self {
        Self {
            drive_gear_ratio,
            wheel_diameter_meters,
            drive_counts_per_revolution: DEFAULT_DRIVE_COUNTS_PER_REVOLUTION,
            azimuth_counts_per_revolution: DEFAULT_AZIMUTH_COUNTS_PER_REVOLUTION,
            drive_maximum_meters_per_second,
            wheel_location: None,
        }
    }

    /// Validates the configuration.
    ///
    /// ## Errors
    ///
    /// * [Error::NonPositiveParameter] - Returned when a ratio, diameter, resolution or speed
    ///   is not strictly positive.
    /// * [Error::MissingWheelLocation] - Returned when no wheel location is set.
    pub fn validate(&self) -> Result<WheelLocation, Error> {
        ensure_positive("drive gear ratio", self.drive_gear_ratio)?;
        ensure_positive("wheel diameter", self.wheel_diameter_meters)?;
        ensure_positive(
            "drive encoder counts per revolution",
            f64::from(self.drive_counts_per_revolution),
        )?;
        ensure_positive(
            "azimuth encoder counts per revolution",
            f64::from(self.azimuth_counts_per_revolution),
        )?;
        ensure_positive(
            "drive maximum speed",
            self.drive_maximum_meters_per_second,
        )?;

        self.wheel_location.ok_or(Error::MissingWheelLocation)
    }

    /// Returns a copy of the configuration placed at the given wheel location.
    pub fn with_wheel_location(&self, location: WheelLocation) -> Self {
        Self {
            wheel_location: Some(location),
            ..self.clone()
        }
    }
}

/// Stores the configuration of the complete drive.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    /// The length of one control cycle, i.e. the time between two calls to periodic.
    #[serde(default = "default_control_period_ms")]
    pub control_period_ms: u64,

    /// The configuration of the four wheel modules.
    pub modules: [ModuleConfig; 4],
}

impl DriveConfig {
    /// Returns the length of one control cycle.
    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }

    /// Reads the configuration from a JSON file.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidConfiguration] - Returned when the file cannot be read or parsed, or
    ///   when the parsed configuration is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::InvalidConfiguration {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;

        Self::from_json_str(&text)
    }

    /// Parses the configuration from a JSON string.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidConfiguration] - Returned when the text cannot be parsed or the
    ///   control period is zero.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let config: DriveConfig =
            serde_json::from_str(text).map_err(|e| Error::InvalidConfiguration {
                reason: e.to_string(),
            })?;

        if config.control_period_ms == 0 {
            return Err(Error::InvalidConfiguration {
                reason: "the control period must be greater than zero".to_string(),
            });
        }

        Ok(config)
    }

    /// Creates a new [DriveConfig] that uses the same module constants for every wheel.
    ///
    /// ## Parameters
    ///
    /// * 'module' - The constants shared by all modules.
    /// * 'locations' - The location of each wheel.
    pub fn uniform(module: &ModuleConfig, locations: [WheelLocation; 4]) -> Self {
        Self {
            control_period_ms: DEFAULT_CONTROL_PERIOD_MS,
            modules: locations.map(|location| module.with_wheel_location(location)),
        }
    }
}
