//! Defines the control of a single swerve wheel module.
//!
//! A wheel module consists of an azimuth actuator, which points the wheel, and a drive
//! actuator, which turns the wheel. Both actuators work in raw units. The module converts
//! between those units and meters per second and radians:
//!
//! ```text
//! angle = 2 PI * azimuth_counts / azimuth_counts_per_revolution
//! speed = drive_counts_per_100ms / drive_counts_per_revolution * gear_ratio * PI * wheel_diameter * 10
//! ```
//!
//! The azimuth encoder is a continuously accumulating counter. Its zero is aligned with the
//! physical zero of the wheel by seeding it from an absolute position sensor and a zero
//! reference that is stored in a [PreferenceStore] during calibration.

use std::{f64::consts::PI, fmt::Display, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::{
    config::{ModuleConfig, VELOCITY_INTERVALS_PER_SECOND},
    geometry::{Angle, WheelLocation, WheelPosition},
    hardware::{Actuator, AzimuthActuator, PreferenceStore},
    kinematics::ModuleState,
    number_space::PeriodicSpace,
    Error,
};

#[cfg(test)]
#[path = "wheel_module_tests.rs"]
mod wheel_module_tests;

/// Defines the calibration state of the azimuth of a wheel module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationState {
    /// The azimuth encoder has not been aligned with the physical zero of the wheel.
    Uncalibrated,

    /// The azimuth zero reference has been loaded and applied.
    Calibrated,
}

impl Display for CalibrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationState::Uncalibrated => write!(f, "uncalibrated"),
            CalibrationState::Calibrated => write!(f, "calibrated"),
        }
    }
}

/// Controls the azimuth and drive actuators of a single wheel.
pub struct WheelModule {
    /// The quadrant of the wheel, which also determines its calibration key.
    position: WheelPosition,

    /// The location of the wheel relative to the rotation center of the robot.
    location: WheelLocation,

    azimuth: Box<dyn AzimuthActuator>,
    drive: Box<dyn Actuator>,

    /// The store that holds the azimuth zero references of all wheels.
    store: Arc<dyn PreferenceStore>,

    drive_gear_ratio: f64,
    wheel_circumference: f64,
    drive_counts_per_revolution: f64,
    azimuth_space: PeriodicSpace,
    maximum_speed: f64,

    calibration_state: CalibrationState,

    /// The azimuth angle the wheel was last sent to. Kept while the module stands still.
    last_commanded_angle: Angle,
}

impl WheelModule {
    /// Converts an azimuth encoder position to an angle.
    fn angle_from_counts(&self, counts: f64) -> Angle {
        Angle::new(2.0 * PI * counts / self.azimuth_space.range_size())
    }

    /// Returns the current azimuth angle of the wheel.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the azimuth actuator cannot be read.
    pub fn azimuth_angle(&self) -> Result<Angle, Error> {
        let counts = self.azimuth.read_position()?;
        Ok(self.angle_from_counts(counts))
    }

    /// Returns the calibration state of the azimuth.
    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration_state
    }

    /// Converts an angle to the azimuth encoder position within the first revolution.
    fn counts_from_angle(&self, angle: Angle) -> f64 {
        angle.radians() / (2.0 * PI) * self.azimuth_space.range_size()
    }

    /// Converts a wheel speed to a drive velocity setpoint in counts per 100 ms.
    fn counts_per_interval_from_speed(&self, meters_per_second: f64) -> f64 {
        meters_per_second / self.wheel_circumference / self.drive_gear_ratio
            * self.drive_counts_per_revolution
            / VELOCITY_INTERVALS_PER_SECOND
    }

    /// Returns the current speed of the wheel in meters per second.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the drive actuator cannot be read.
    pub fn drive_speed(&self) -> Result<f64, Error> {
        let counts_per_interval = self.drive.read_velocity()?;
        Ok(self.speed_from_counts_per_interval(counts_per_interval))
    }

    /// Returns a value indicating whether the azimuth zero reference has been applied.
    pub fn is_calibrated(&self) -> bool {
        self.calibration_state == CalibrationState::Calibrated
    }

    /// Returns the azimuth angle the wheel was last commanded to.
    ///
    /// Before the first command this is the angle that calibration left the wheel at, or
    /// zero if the module has not been calibrated.
    pub fn last_commanded_angle(&self) -> Angle {
        self.last_commanded_angle
    }

    /// Loads the azimuth zero reference for this wheel and applies it.
    ///
    /// The azimuth encoder is seeded with the difference between the current reading of the
    /// absolute sensor and the stored reference, after which the azimuth is told to hold that
    /// position. On success the module is calibrated.
    ///
    /// Returns the position, in counts, that the encoder was seeded with.
    ///
    /// ## Errors
    ///
    /// * [Error::MissingZeroReference] - Returned when no reference is stored for this wheel.
    ///   The module stays uncalibrated.
    /// * [Error::Hardware] - Returned when the azimuth actuator fails.
    /// * [Error::Persistence] - Returned when the store cannot be read, or when the stored
    ///   reference is too far out of range to be subtracted from the sensor reading.
    pub fn load_and_set_azimuth_zero_reference(&mut self) -> Result<i64, Error> {
        let key = self.position.preference_key();
        let reference = match self.store.get_int(&key)? {
            Some(reference) => reference,
            None => {
                error!(
                    "No azimuth zero reference stored for the {} wheel under '{}'",
                    self.position, key
                );
                return Err(Error::MissingZeroReference {
                    position: self.position,
                    key,
                });
            }
        };

        let absolute = i64::from(self.azimuth.read_absolute_position()?);
        let seed = absolute.checked_sub(reference).ok_or_else(|| {
            error!(
                "The azimuth zero reference {} stored for the {} wheel under '{}' is out of range",
                reference, self.position, key
            );
            Error::Persistence {
                reason: format!(
                    "the zero reference {} stored under '{}' is out of range",
                    reference, key
                ),
            }
        })?;

        self.azimuth.seed_position(seed as f64)?;
        self.azimuth.command_position(seed as f64)?;

        self.calibration_state = CalibrationState::Calibrated;
        self.last_commanded_angle = self.angle_from_counts(seed as f64);

        info!(
            "Calibrated the {} wheel: absolute {} minus reference {} gives {} counts",
            self.position, absolute, reference, seed
        );

        Ok(seed)
    }

    /// Returns the location of the wheel relative to the rotation center of the robot.
    pub fn location(&self) -> WheelLocation {
        self.location
    }

    /// Returns the speed, in meters per second, that corresponds to full open loop output.
    pub fn maximum_speed(&self) -> f64 {
        self.maximum_speed
    }

    /// Creates a new, uncalibrated [WheelModule].
    ///
    /// ## Parameters
    ///
    /// * 'config' - The physical constants and location of the module.
    /// * 'azimuth' - The actuator that points the wheel.
    /// * 'drive' - The actuator that turns the wheel.
    /// * 'store' - The store that holds the azimuth zero references.
    ///
    /// ## Errors
    ///
    /// * [Error::NonPositiveParameter] - Returned when a conversion constant is not strictly
    ///   positive.
    /// * [Error::MissingWheelLocation] - Returned when the configuration has no wheel location.
    /// * [Error::WheelLocationOnAxis] - Returned when the wheel location has no quadrant.
    pub fn new(
        config: &ModuleConfig,
        azimuth: Box<dyn AzimuthActuator>,
        drive: Box<dyn Actuator>,
        store: Arc<dyn PreferenceStore>,
    ) -> Result<Self, Error> {
        let location = config.validate()?;
        let position = WheelPosition::from_location(&location)?;

        debug!(
            "Created the {} wheel module at ({}, {})",
            position, location.x, location.y
        );

        Ok(Self {
            position,
            location,
            azimuth,
            drive,
            store,
            drive_gear_ratio: config.drive_gear_ratio,
            wheel_circumference: PI * config.wheel_diameter_meters,
            drive_counts_per_revolution: f64::from(config.drive_counts_per_revolution),
            azimuth_space: PeriodicSpace::encoder_counts(f64::from(
                config.azimuth_counts_per_revolution,
            )),
            maximum_speed: config.drive_maximum_meters_per_second,
            calibration_state: CalibrationState::Uncalibrated,
            last_commanded_angle: Angle::zero(),
        })
    }

    /// Returns the quadrant of the wheel.
    pub fn position(&self) -> WheelPosition {
        self.position
    }

    /// Resets the position counter of the drive encoder to zero.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the drive actuator fails.
    pub fn reset_drive_encoder(&mut self) -> Result<(), Error> {
        self.drive.seed_position(0.0)?;
        Ok(())
    }

    /// Sends the wheel to the desired state.
    ///
    /// The state is first optimized against the current azimuth angle so that the wheel never
    /// turns more than 90 degrees. The azimuth is then commanded to the current encoder
    /// position plus the shortest wrapped distance to the target. The drive is commanded either
    /// with a fraction of the maximum speed or with a velocity setpoint.
    ///
    /// ## Parameters
    ///
    /// * 'desired' - The desired speed and azimuth angle.
    /// * 'open_loop' - `true` to drive with a fraction of the supply, `false` to use the
    ///   velocity control of the drive actuator.
    ///
    /// ## Errors
    ///
    /// * [Error::ModuleNotCalibrated] - Returned when the azimuth zero reference has not been
    ///   applied. Nothing is commanded.
    /// * [Error::Hardware] - Returned when one of the actuators fails.
    pub fn set_desired_state(&mut self, desired: ModuleState, open_loop: bool) -> Result<(), Error> {
        if !self.is_calibrated() {
            warn!(
                "Refusing to command the {} wheel before it is calibrated",
                self.position
            );
            return Err(Error::ModuleNotCalibrated {
                position: self.position,
            });
        }

        let current_counts = self.azimuth.read_position()?;
        let optimized = desired.optimize(self.angle_from_counts(current_counts));

        let target_counts = self.counts_from_angle(optimized.angle());
        let azimuth_setpoint = current_counts
            + self
                .azimuth_space
                .smallest_distance_between_values(current_counts, target_counts);
        self.azimuth.command_position(azimuth_setpoint)?;

        if open_loop {
            self.drive
                .command_open_loop(optimized.speed() / self.maximum_speed)?;
        } else {
            self.drive
                .command_velocity(self.counts_per_interval_from_speed(optimized.speed()))?;
        }

        self.last_commanded_angle = optimized.angle();

        debug!(
            "Commanded the {} wheel to {} (azimuth setpoint {:.1}, open loop {})",
            self.position, optimized, azimuth_setpoint, open_loop
        );

        Ok(())
    }

    /// Converts a drive velocity in counts per 100 ms to meters per second.
    fn speed_from_counts_per_interval(&self, counts_per_interval: f64) -> f64 {
        counts_per_interval / self.drive_counts_per_revolution
            * self.drive_gear_ratio
            * self.wheel_circumference
            * VELOCITY_INTERVALS_PER_SECOND
    }

    /// Returns the measured speed and azimuth angle of the wheel.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when one of the actuators cannot be read.
    pub fn state(&self) -> Result<ModuleState, Error> {
        Ok(ModuleState::new(self.drive_speed()?, self.azimuth_angle()?))
    }

    /// Reads the absolute azimuth sensor and stores the reading as the zero reference of
    /// this wheel.
    ///
    /// The wheel must be physically aligned to its zero azimuth when this is called. The
    /// reference only takes effect once it is loaded, so the module is uncalibrated
    /// afterwards.
    ///
    /// Returns the stored reference.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the absolute sensor cannot be read.
    /// * [Error::Persistence] - Returned when the store cannot be written.
    pub fn store_azimuth_zero_reference(&mut self) -> Result<i32, Error> {
        let key = self.position.preference_key();
        let absolute = self.azimuth.read_absolute_position()?;
        self.store.put_int(&key, i64::from(absolute))?;

        self.calibration_state = CalibrationState::Uncalibrated;

        info!(
            "Stored azimuth zero reference {} for the {} wheel under '{}'",
            absolute, self.position, key
        );

        Ok(absolute)
    }
}
